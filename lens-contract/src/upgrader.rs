//! Upgrades of transparent proxies and versioned beacons.

use alloy::{
    primitives::{Address, U256},
    sol_types::SolCall,
};
use lens_address_book::ContractRecord;
use tracing::{info, warn};

use crate::{
    chain::Chain,
    deployer::Deployer,
    error::{DeployError, ensure_eq},
    onchain,
    sol_types::{IBeacon, ITransparentUpgradeableProxy},
    target::Target,
};

impl<C: Chain + ?Sized> Deployer<'_, C> {
    async fn deployed(&self, name: &str) -> Result<(ContractRecord, Address), DeployError> {
        let record = self
            .book()
            .record(name)
            .await?
            .ok_or_else(|| DeployError::MissingRecord(name.to_string()))?;
        let address = record.address.ok_or_else(|| DeployError::MissingField {
            name: name.to_string(),
            field: "address",
        })?;
        Ok((record, address))
    }

    /// Point the proxy recorded under the target's name at an implementation
    /// built from the current artifact.
    ///
    /// `admin` must be the proxy's admin on-chain; this is checked before
    /// anything is sent. A new implementation is deployed only if the
    /// artifact changed, and nothing is sent when the proxy already points
    /// at the right implementation.
    pub async fn upgrade_transparent_proxy(
        &self,
        admin: Address,
        target: &Target,
    ) -> Result<ContractRecord, DeployError> {
        let name = target.logical_name();
        let (proxy, address) = self.deployed(name).await?;
        self.check_proxy_admin(name, address, admin).await?;

        let implementation = self.ensure_implementation(target).await?;
        self.point_proxy_at(name, proxy, address, admin, implementation)
            .await
    }

    /// Point a proxy at the implementation already recorded under
    /// `<name>Impl`, without deploying anything.
    pub async fn upgrade_single(
        &self,
        admin: Address,
        name: &str,
        min_balance: U256,
    ) -> Result<ContractRecord, DeployError> {
        let balance = self.chain().balance(admin).await?;
        if balance < min_balance {
            return Err(DeployError::InsufficientBalance {
                who: admin,
                balance: balance.to_string(),
                required: min_balance.to_string(),
            });
        }
        let (proxy, address) = self.deployed(name).await?;
        self.check_proxy_admin(name, address, admin).await?;
        let (_, implementation) = self.deployed(&format!("{name}Impl")).await?;
        self.point_proxy_at(name, proxy, address, admin, implementation)
            .await
    }

    async fn check_proxy_admin(
        &self,
        name: &str,
        proxy: Address,
        admin: Address,
    ) -> Result<(), DeployError> {
        let onchain = onchain::proxy_admin(self.chain(), proxy).await?;
        if onchain != admin {
            return Err(DeployError::WrongSigner {
                role: format!("{name} proxy admin"),
                onchain,
                local: admin,
            });
        }
        Ok(())
    }

    async fn point_proxy_at(
        &self,
        name: &str,
        mut proxy: ContractRecord,
        address: Address,
        admin: Address,
        implementation: Address,
    ) -> Result<ContractRecord, DeployError> {
        let chain = self.chain();
        let current = onchain::proxy_implementation(chain, address).await?;
        if current == implementation {
            info!(%name, %implementation, "proxy already up to date");
            return Ok(proxy);
        }

        info!(%name, proxy = %address, from = %current, to = %implementation, "upgrading proxy");
        let call = ITransparentUpgradeableProxy::upgradeToCall {
            newImplementation: implementation,
        };
        chain.send(admin, address, call.abi_encode().into()).await?;

        ensure_eq(
            "proxy implementation",
            implementation,
            onchain::proxy_implementation(chain, address).await?,
        )?;
        proxy.implementation = Some(implementation);
        proxy.bytecode_hash = Some(onchain::code_fingerprint(chain, address).await?);
        self.book().put(name, proxy.clone()).await?;
        info!(%name, %implementation, "proxy upgraded");
        Ok(proxy)
    }

    /// Register an implementation built from the current artifact as
    /// `version` of the beacon `<name>Beacon` and make it the default.
    ///
    /// `owner` must be the beacon's owner on-chain. Nothing is sent when the
    /// beacon's default version already is `version` served by that
    /// implementation.
    pub async fn upgrade_beacon(
        &self,
        owner: Address,
        target: &Target,
        version: U256,
    ) -> Result<ContractRecord, DeployError> {
        let chain = self.chain();
        let name = target.beacon_name();
        let (mut beacon, address) = self.deployed(&name).await?;

        let onchain_owner = onchain::beacon_owner(chain, address).await?;
        if onchain_owner != owner {
            return Err(DeployError::WrongSigner {
                role: format!("{name} owner"),
                onchain: onchain_owner,
                local: owner,
            });
        }
        let default_version = onchain::beacon_default_version(chain, address).await?;

        let implementation = self.ensure_implementation(target).await?;
        let current = onchain::beacon_implementation(chain, address).await?;
        if current == implementation && default_version == version {
            info!(%name, %version, %implementation, "beacon already up to date");
            return Ok(beacon);
        }

        if default_version == version {
            warn!(%name, %version, replaced = %current, "overwriting the implementation of the default version");
        }
        info!(%name, %version, %implementation, "setting beacon implementation");
        let call = IBeacon::setImplementationForVersionCall {
            implementationVersion: version,
            implementation,
        };
        chain.send(owner, address, call.abi_encode().into()).await?;

        if default_version != version {
            info!(%name, from = %default_version, to = %version, "setting default version");
            let call = IBeacon::setDefaultVersionCall {
                implementationVersion: version,
            };
            chain.send(owner, address, call.abi_encode().into()).await?;
        }

        ensure_eq(
            "beacon default version",
            version,
            onchain::beacon_default_version(chain, address).await?,
        )?;
        ensure_eq(
            "beacon implementation",
            implementation,
            onchain::beacon_implementation(chain, address).await?,
        )?;
        beacon.implementation = Some(implementation);
        beacon.bytecode_hash = Some(onchain::code_fingerprint(chain, address).await?);
        self.book().put(&name, beacon.clone()).await?;
        Ok(beacon)
    }
}
