//! Deterministic deployments through the LensCreate2 factory.
//!
//! The factory creates a transparent proxy at an address derived from a
//! salt, so the same logical contract lands at the same address on every
//! chain the factory lives on. Only the factory owner may use it.

use alloy::{
    primitives::{Address, B256, U256, address, keccak256},
    sol_types::SolCall,
};
use lens_address_book::ContractRecord;
use tracing::{debug, info};

use crate::{
    chain::Chain,
    deployer::{Deployer, TRANSPARENT_PROXY},
    error::{DeployError, ensure_eq},
    onchain,
    sol_types::ILensCreate2,
    target::Target,
};

pub const LENS_CREATE2_ADDRESS: Address = address!("0x52AF9CF29976C310E3DE03C509E108edB6edb8c0");

const PRESALT_PREFIX: &str = "lens.contract.";

/// Human-readable salt source of a contract, `lens.contract.<name>`.
pub fn presalt(contract_name: &str) -> String {
    format!("{PRESALT_PREFIX}{contract_name}")
}

pub fn salt(presalt: &str) -> B256 {
    keccak256(presalt.as_bytes())
}

/// The factory and the account allowed to use it.
#[derive(Debug, Clone, Copy)]
pub struct Create2Factory {
    pub address: Address,
    pub owner: Address,
    /// Balance the owner must hold before anything is attempted.
    pub min_balance: U256,
}

impl<C: Chain + ?Sized> Deployer<'_, C> {
    /// The owner must hold enough funds and be the factory's on-chain owner.
    async fn check_create2_owner(&self, factory: &Create2Factory) -> Result<(), DeployError> {
        let chain = self.chain();
        let balance = chain.balance(factory.owner).await?;
        if balance < factory.min_balance {
            return Err(DeployError::InsufficientBalance {
                who: factory.owner,
                balance: balance.to_string(),
                required: factory.min_balance.to_string(),
            });
        }
        let onchain = onchain::view(chain, factory.address, ILensCreate2::ownerCall {}).await?;
        if onchain != factory.owner {
            return Err(DeployError::WrongSigner {
                role: "LensCreate2 owner".to_string(),
                onchain,
                local: factory.owner,
            });
        }
        Ok(())
    }

    /// Deploy the target behind a proxy created by the CREATE2 factory.
    ///
    /// The factory call is simulated first and only broadcast if it yields
    /// the predicted address. An already recorded proxy is not redeployed,
    /// but the postconditions are checked either way. Code fingerprints are
    /// only compared on zkSync, see [`onchain::code_matches_artifacts`].
    pub async fn deploy_with_create2(
        &self,
        factory: &Create2Factory,
        target: &Target,
        proxy_admin: Address,
    ) -> Result<ContractRecord, DeployError> {
        self.check_create2_owner(factory).await?;

        let chain = self.chain();
        let name = target.logical_name();
        let artifact = self.artifacts().get(&target.contract_name)?;
        let proxy_artifact = self.artifacts().get(TRANSPARENT_PROXY)?;
        let compare_code = onchain::code_matches_artifacts(chain);
        if !compare_code {
            debug!(%name, "evm chain, deployed code is not compared with artifacts");
        }

        let proxy = match self.book().record(name).await? {
            Some(existing) if existing.is_deployed() => {
                info!(%name, address = ?existing.address, "already deployed, checking it");
                existing
            }
            _ => {
                let implementation = self.ensure_implementation(target).await?;
                if compare_code {
                    ensure_eq(
                        "implementation code fingerprint",
                        artifact.runtime_fingerprint()?,
                        onchain::code_fingerprint(chain, implementation).await?,
                    )?;
                }

                let presalt = presalt(name);
                let salt = salt(&presalt);
                let predicted = onchain::view(chain, factory.address, ILensCreate2::getAddressCall { salt }).await?;
                info!(%name, %presalt, %salt, %predicted, "creating proxy through factory");

                let initializer = target.initializer.clone().unwrap_or_default();
                let call = ILensCreate2::createTransparentUpgradeableProxyCall {
                    salt,
                    implementation,
                    proxyAdmin: proxy_admin,
                    initializerCall: initializer,
                    expectedAddress: predicted,
                }
                .abi_encode();

                let simulated = chain
                    .call(factory.owner, factory.address, call.clone().into())
                    .await?;
                let simulated =
                    ILensCreate2::createTransparentUpgradeableProxyCall::abi_decode_returns(&simulated)?;
                ensure_eq("simulated proxy address", predicted, simulated)?;

                let tx_hash = chain.send(factory.owner, factory.address, call.into()).await?;
                info!(%name, %tx_hash, address = %predicted, "proxy created");

                let mut record = ContractRecord::new(&target.contract_name, target.contract_type);
                record.address = Some(predicted);
                record.bytecode_hash = Some(proxy_artifact.fingerprint()?);
                record.implementation = Some(implementation);
                record.proxy_admin = Some(proxy_admin);
                record.initializer_calldata = target.initializer.clone();
                record.lens_create2_pre_salt = Some(presalt);
                self.book().put(name, record.clone()).await?;
                record
            }
        };

        let address = proxy.address.ok_or_else(|| DeployError::MissingField {
            name: name.to_string(),
            field: "address",
        })?;
        let implementation = proxy.implementation.ok_or_else(|| DeployError::MissingField {
            name: name.to_string(),
            field: "implementation",
        })?;
        if compare_code {
            ensure_eq(
                "proxy code fingerprint",
                proxy_artifact.runtime_fingerprint()?,
                onchain::code_fingerprint(chain, address).await?,
            )?;
        }
        ensure_eq(
            "proxy implementation",
            implementation,
            onchain::proxy_implementation(chain, address).await?,
        )?;
        ensure_eq(
            "proxy admin",
            proxy_admin,
            onchain::proxy_admin(chain, address).await?,
        )?;
        Ok(proxy)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        deployer::tests::{artifact, setup, store},
        sol_types::initialize_with_metadata_call,
        testing::MemoryChain,
    };
    use crate::chain::AddressDerivation;
    use alloy::primitives::Bytes;
    use lens_address_book::ContractType;

    pub(crate) fn factory(chain: &MemoryChain) -> Create2Factory {
        let owner = Address::with_last_byte(0xc2);
        chain.install_create2_factory(LENS_CREATE2_ADDRESS, owner);
        chain.fund(owner, U256::from(10).pow(U256::from(17)));
        Create2Factory {
            address: LENS_CREATE2_ADDRESS,
            owner,
            min_balance: U256::from(10).pow(U256::from(16)),
        }
    }

    #[test]
    fn salt_from_presalt() {
        assert_eq!(presalt("ActionHub"), "lens.contract.ActionHub");
        assert_eq!(salt("lens.contract.ActionHub"), keccak256(b"lens.contract.ActionHub"));
    }

    #[tokio::test]
    async fn deploys_once_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let (chain, artifacts) = setup();
        let book = store(&dir);
        artifacts.insert(artifact("SimpleCollectAction", "collect v1"));
        let f = factory(&chain);
        let d = Deployer::new(&chain, &artifacts, &book);

        let admin = Address::with_last_byte(0xad);
        let owner = Address::with_last_byte(0x0e);
        let target = Target::builder()
            .contract_name("SimpleCollectAction")
            .contract_type(ContractType::Action)
            .initializer(initialize_with_metadata_call(owner, ""))
            .build();

        let rec = d.deploy_with_create2(&f, &target, admin).await.unwrap();
        let addr = rec.address.unwrap();
        assert_eq!(
            addr,
            LENS_CREATE2_ADDRESS.create2(
                salt("lens.contract.SimpleCollectAction"),
                keccak256(crate::deployer::tests::PROXY_CODE)
            )
        );
        assert_eq!(
            rec.lens_create2_pre_salt.as_deref(),
            Some("lens.contract.SimpleCollectAction")
        );
        assert_eq!(rec.proxy_admin, Some(admin));
        assert_eq!(onchain::owner_of(&chain, addr).await.unwrap(), owner);
        assert!(book.record("SimpleCollectActionImpl").await.unwrap().is_some());
        assert_eq!(chain.deployments(), 2);

        let again = d.deploy_with_create2(&f, &target, admin).await.unwrap();
        assert_eq!(again, rec);
        assert_eq!(chain.deployments(), 2);
    }

    #[tokio::test]
    async fn refuses_poor_or_foreign_owner() {
        let dir = tempfile::tempdir().unwrap();
        let (chain, artifacts) = setup();
        let book = store(&dir);
        artifacts.insert(artifact("ActionHub", "hub"));
        let mut f = factory(&chain);
        let d = Deployer::new(&chain, &artifacts, &book);
        let target = Target::new("ActionHub", ContractType::Aux);
        let admin = Address::with_last_byte(0xad);

        chain.fund(f.owner, U256::from(1));
        assert!(matches!(
            d.deploy_with_create2(&f, &target, admin).await,
            Err(DeployError::InsufficientBalance { .. })
        ));

        f.owner = Address::with_last_byte(0x99);
        chain.fund(f.owner, U256::from(10).pow(U256::from(18)));
        assert!(matches!(
            d.deploy_with_create2(&f, &target, admin).await,
            Err(DeployError::WrongSigner { .. })
        ));
        assert_eq!(chain.transactions(), 0);
    }

    #[tokio::test]
    async fn code_is_compared_on_zksync_only() {
        let dir = tempfile::tempdir().unwrap();
        let (chain, artifacts) = setup();
        let book = store(&dir);
        let action = artifact("TippingAccountAction", "tipping v1");
        let hash = action.fingerprint().unwrap();
        artifacts.insert(action);
        let f = factory(&chain);
        let d = Deployer::new(&chain, &artifacts, &book);
        let target = Target::new("TippingAccountAction", ContractType::Action);
        let admin = Address::with_last_byte(0xad);

        // runtime code with immutables filled in by the constructor
        let implementation = Address::with_last_byte(0x1e);
        chain.set_code(implementation, Bytes::from_static(b"tipping v1 with immutables"));
        let mut rec = ContractRecord::new("TippingAccountAction", ContractType::Implementation);
        rec.address = Some(implementation);
        rec.bytecode_hash = Some(hash);
        book.put("TippingAccountActionImpl", rec).await.unwrap();

        assert!(matches!(
            d.deploy_with_create2(&f, &target, admin).await,
            Err(DeployError::Mismatch { .. })
        ));
        assert_eq!(chain.transactions(), 0);

        chain.set_derivation(AddressDerivation::Evm);
        let proxy = d.deploy_with_create2(&f, &target, admin).await.unwrap();
        assert_eq!(proxy.implementation, Some(implementation));
        assert_eq!(chain.deployments(), 1);
    }
}
