//! Helper logic for contract deployment

use alloy::{
    primitives::{Address, Bytes},
    sol_types::SolValue,
};
use lens_address_book::{AddressBookStore, ContractRecord, ContractType};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    artifacts::{Artifact, ArtifactStore},
    chain::Chain,
    error::DeployError,
    target::Target,
};

/// Artifact of the proxy placed in front of upgradeable contracts.
pub const TRANSPARENT_PROXY: &str = "TransparentUpgradeableProxy";

/// What the deployment and upgrade operations work with: a chain, the
/// compiled artifacts and the address book.
pub struct Deployer<'a, C: ?Sized> {
    chain: &'a C,
    artifacts: &'a ArtifactStore,
    book: &'a AddressBookStore,
}

impl<'a, C: Chain + ?Sized> Deployer<'a, C> {
    pub fn new(chain: &'a C, artifacts: &'a ArtifactStore, book: &'a AddressBookStore) -> Self {
        Self {
            chain,
            artifacts,
            book,
        }
    }

    pub fn chain(&self) -> &'a C {
        self.chain
    }

    pub fn artifacts(&self) -> &'a ArtifactStore {
        self.artifacts
    }

    pub fn book(&self) -> &'a AddressBookStore {
        self.book
    }

    /// Deploy a contract (with logging)
    pub(crate) async fn create(
        &self,
        name: &str,
        artifact: &Artifact,
        args: Bytes,
    ) -> Result<Address, DeployError> {
        info!(%name, contract = %artifact.contract_name, "deploying");
        let addr = self
            .chain
            .deploy(self.chain.sender(), artifact.bytecode.clone(), args)
            .await?;
        info!(%name, address = %addr, "deployed");
        Ok(addr)
    }

    /// Plain deployment, skipped when the record under the target's name
    /// already has an address and the artifact's fingerprint is unchanged,
    /// unless `force` is set.
    pub async fn deploy_contract(
        &self,
        target: &Target,
        force: bool,
    ) -> Result<ContractRecord, DeployError> {
        let name = target.logical_name();
        let artifact = self.artifacts.get(&target.contract_name)?;
        let hash = artifact.fingerprint()?;

        if let Some(existing) = self.book.record(name).await? {
            if !force && existing.is_deployed() && existing.bytecode_hash == Some(hash) {
                info!(%name, address = ?existing.address, "unchanged, skipping deployment");
                return Ok(existing);
            }
        }

        let args = artifact.encode_constructor(&target.constructor_arguments)?;
        for arg in &target.constructor_arguments {
            debug!(%name, %arg, "constructor argument");
        }
        let address = self.create(name, &artifact, args).await?;

        let mut record = ContractRecord::new(&target.contract_name, target.contract_type);
        record.address = Some(address);
        record.bytecode_hash = Some(hash);
        record.constructor_arguments = Some(target.constructor_arguments.clone());
        self.book.put(name, record.clone()).await?;
        Ok(record)
    }

    /// Deploy even if an identical contract is already recorded.
    pub async fn deploy_single(&self, target: &Target) -> Result<ContractRecord, DeployError> {
        self.deploy_contract(target, true).await
    }

    /// Deploy the target's implementation and record it as `<name>Impl`.
    pub(crate) async fn deploy_implementation(
        &self,
        target: &Target,
    ) -> Result<Address, DeployError> {
        let impl_name = target.impl_name();
        let artifact = self.artifacts.get(&target.contract_name)?;
        let args = artifact.encode_constructor(&target.constructor_arguments)?;
        let address = self.create(&impl_name, &artifact, args).await?;

        let mut record = ContractRecord::new(&target.contract_name, ContractType::Implementation);
        record.address = Some(address);
        record.bytecode_hash = Some(artifact.fingerprint()?);
        record.constructor_arguments = Some(target.constructor_arguments.clone());
        self.book.put(&impl_name, record).await?;
        Ok(address)
    }

    /// Address of an implementation matching the current artifact, deploying
    /// one only if `<name>Impl` is missing or was built from other bytecode.
    pub(crate) async fn ensure_implementation(
        &self,
        target: &Target,
    ) -> Result<Address, DeployError> {
        let impl_name = target.impl_name();
        let hash = self.artifacts.get(&target.contract_name)?.fingerprint()?;
        if let Some(rec) = self.book.record(&impl_name).await? {
            if let (Some(addr), Some(recorded)) = (rec.address, rec.bytecode_hash) {
                if recorded == hash {
                    info!(name = %impl_name, address = %addr, "implementation unchanged");
                    return Ok(addr);
                }
                info!(name = %impl_name, %recorded, current = %hash, "implementation bytecode changed");
            }
        }
        self.deploy_implementation(target).await
    }

    /// Deploy an implementation and a transparent proxy in front of it,
    /// owned by `proxy_owner` and initialized with the target's initializer.
    ///
    /// Skipped as soon as a record under the target's name exists, even if
    /// the artifact changed since: rolling out new bytecode is the upgrade's
    /// job.
    pub async fn deploy_as_proxy(
        &self,
        target: &Target,
        proxy_owner: Address,
    ) -> Result<ContractRecord, DeployError> {
        self.deploy_proxy(target, proxy_owner, false).await
    }

    /// Like [`Self::deploy_as_proxy`], but with `force` a new implementation
    /// and proxy are deployed and replace the recorded ones.
    pub async fn deploy_proxy(
        &self,
        target: &Target,
        proxy_owner: Address,
        force: bool,
    ) -> Result<ContractRecord, DeployError> {
        let name = target.logical_name();
        if let Some(existing) = self.book.record(name).await? {
            if !force && existing.is_deployed() {
                let hash = self.artifacts.get(&target.contract_name)?.fingerprint()?;
                let recorded = self
                    .book
                    .record(&target.impl_name())
                    .await?
                    .and_then(|r| r.bytecode_hash);
                if recorded.is_some_and(|r| r != hash) {
                    warn!(%name, current = %hash, "artifact changed since deployment, run the upgrade to roll it out");
                }
                info!(%name, address = ?existing.address, "proxy already deployed, skipping");
                return Ok(existing);
            }
        }

        let implementation = self.deploy_implementation(target).await?;

        let proxy = self.artifacts.get(TRANSPARENT_PROXY)?;
        let init = target.initializer.clone().unwrap_or_default();
        let args = (implementation, proxy_owner, init.clone()).abi_encode_params();
        let address = self.create(name, &proxy, args.into()).await?;

        let mut record = ContractRecord::new(TRANSPARENT_PROXY, target.contract_type);
        record.address = Some(address);
        record.bytecode_hash = Some(proxy.fingerprint()?);
        record.constructor_arguments = Some(vec![
            Value::String(implementation.to_string()),
            Value::String(proxy_owner.to_string()),
            Value::String(init.to_string()),
        ]);
        record.implementation = Some(implementation);
        record.proxy_admin = Some(proxy_owner);
        record.initializer_calldata = target.initializer.clone();
        self.book.put(name, record.clone()).await?;
        Ok(record)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{onchain, sol_types::initialize_with_metadata_call, testing::MemoryChain};
    use alloy::json_abi::JsonAbi;

    pub(crate) const PROXY_CODE: &[u8] = b"transparent upgradeable proxy code";

    pub(crate) fn artifact(name: &str, code: &str) -> Artifact {
        Artifact::new(name, JsonAbi::default(), Bytes::from(code.as_bytes().to_vec()))
    }

    /// Chain and artifact store knowing the proxy bytecode.
    pub(crate) fn setup() -> (MemoryChain, ArtifactStore) {
        let chain = MemoryChain::new();
        chain.set_proxy_bytecode(Bytes::from_static(PROXY_CODE));
        let artifacts = ArtifactStore::in_memory();
        artifacts.insert(Artifact::new(
            TRANSPARENT_PROXY,
            JsonAbi::default(),
            Bytes::from_static(PROXY_CODE),
        ));
        (chain, artifacts)
    }

    pub(crate) fn store(dir: &tempfile::TempDir) -> AddressBookStore {
        AddressBookStore::open(dir.path().join("addressBook.json")).unwrap()
    }

    #[tokio::test]
    async fn plain_deploy_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (chain, artifacts) = setup();
        let book = store(&dir);
        artifacts.insert(artifact("ActionHub", "hub v1"));
        let d = Deployer::new(&chain, &artifacts, &book);
        let target = Target::new("ActionHub", ContractType::Aux);

        let first = d.deploy_contract(&target, false).await.unwrap();
        let second = d.deploy_contract(&target, false).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(chain.deployments(), 1);

        let forced = d.deploy_single(&target).await.unwrap();
        assert_ne!(forced.address, first.address);
        assert_eq!(chain.deployments(), 2);

        artifacts.insert(artifact("ActionHub", "hub v2"));
        let changed = d.deploy_contract(&target, false).await.unwrap();
        assert_ne!(changed.bytecode_hash, first.bytecode_hash);
        assert_eq!(chain.deployments(), 3);
        assert_eq!(book.address_of("ActionHub").await.unwrap(), changed.address);
    }

    #[tokio::test]
    async fn proxy_deploy_records_both() {
        let dir = tempfile::tempdir().unwrap();
        let (chain, artifacts) = setup();
        let book = store(&dir);
        artifacts.insert(artifact("AccountBlockingRule", "rule v1"));
        let d = Deployer::new(&chain, &artifacts, &book);

        let owner = Address::with_last_byte(0x0e);
        let admin = Address::with_last_byte(0xad);
        let target = Target::builder()
            .contract_name("AccountBlockingRule")
            .contract_type(ContractType::Rule)
            .initializer(initialize_with_metadata_call(owner, ""))
            .build();
        let proxy = d.deploy_as_proxy(&target, admin).await.unwrap();
        let implementation = book
            .record("AccountBlockingRuleImpl")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(implementation.contract_type, ContractType::Implementation);
        assert_eq!(proxy.contract_type, ContractType::Rule);
        assert_eq!(proxy.contract_name, TRANSPARENT_PROXY);
        assert_eq!(proxy.implementation, implementation.address);
        assert_eq!(proxy.proxy_admin, Some(admin));

        let addr = proxy.address.unwrap();
        assert_eq!(
            onchain::proxy_implementation(&chain, addr).await.unwrap(),
            implementation.address.unwrap()
        );
        assert_eq!(onchain::owner_of(&chain, addr).await.unwrap(), owner);
        assert_eq!(chain.deployments(), 2);
    }

    #[tokio::test]
    async fn changed_bytecode_redeploys_plain_but_not_proxied() {
        let dir = tempfile::tempdir().unwrap();
        let (chain, artifacts) = setup();
        let book = store(&dir);
        artifacts.insert(artifact("TippingPostAction", "action v1"));
        artifacts.insert(artifact("LensFees", "fees v1"));
        let d = Deployer::new(&chain, &artifacts, &book);
        let action = Target::new("TippingPostAction", ContractType::Action);
        let fees = Target::new("LensFees", ContractType::Aux);
        let admin = Address::with_last_byte(0xad);

        let proxied = d.deploy_as_proxy(&action, admin).await.unwrap();
        let plain = d.deploy_contract(&fees, false).await.unwrap();
        assert_eq!(chain.deployments(), 3);

        artifacts.insert(artifact("TippingPostAction", "action v2"));
        artifacts.insert(artifact("LensFees", "fees v2"));

        let again = d.deploy_as_proxy(&action, admin).await.unwrap();
        assert_eq!(again, proxied);
        let redeployed = d.deploy_contract(&fees, false).await.unwrap();
        assert_ne!(redeployed.address, plain.address);
        assert_eq!(chain.deployments(), 4);

        let replaced = d.deploy_proxy(&action, admin, true).await.unwrap();
        assert_ne!(replaced.address, proxied.address);
        assert_eq!(chain.deployments(), 6);
    }

    #[tokio::test]
    async fn proxy_recorded_without_implementation_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (chain, artifacts) = setup();
        let book = store(&dir);
        artifacts.insert(artifact("TippingPostAction", "action v1"));
        let d = Deployer::new(&chain, &artifacts, &book);

        let mut existing = ContractRecord::new(TRANSPARENT_PROXY, ContractType::Action);
        existing.address = Some(Address::with_last_byte(0x77));
        book.put("TippingPostAction", existing.clone()).await.unwrap();

        let target = Target::new("TippingPostAction", ContractType::Action);
        let rec = d
            .deploy_as_proxy(&target, Address::with_last_byte(0xad))
            .await
            .unwrap();
        assert_eq!(rec, existing);
        assert_eq!(chain.transactions(), 0);
    }
}
