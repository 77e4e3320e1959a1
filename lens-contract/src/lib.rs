//! Deployment and upgrade tooling for the Lens contracts.
//!
//! Contracts are deployed plainly, behind transparent proxies or through the
//! LensCreate2 factory, and upgraded through their proxies or beacons. Every
//! operation records its outcome in the address book and is safe to re-run.

use std::path::Path;

use alloy::{
    primitives::Address,
    signers::{Signer, local::PrivateKeySigner},
};
use anyhow::{Context, Result};
use lens_address_book::{AddressBookStore, render_env};
use tracing::info;

pub mod artifacts;
pub mod chain;
pub mod config;
pub mod create2;
pub mod deployer;
pub mod error;
pub mod onchain;
pub mod provider;
pub mod scripts;
pub mod sol_types;
pub mod target;
mod upgrader;

#[cfg(any(test, feature = "test"))]
pub mod testing;

pub use artifacts::{Artifact, ArtifactError, ArtifactStore};
pub use chain::{AddressDerivation, Chain, ChainError, RpcChain};
pub use config::{ConfigError, DeployConfig};
pub use create2::Create2Factory;
pub use deployer::Deployer;
pub use error::DeployError;
pub use target::Target;

use provider::{HttpProviderWithWallet, build_provider, signer_from_env};

/// Key paying for deployments.
pub const DEPLOYER_KEY: &str = "WALLET_PRIVATE_KEY";
pub const PROXY_ADMIN_KEY: &str = "PROXY_ADMIN_PRIVATE_KEY";
pub const OWNER_KEY: &str = "OWNER_PRIVATE_KEY";
pub const BEACON_OWNER_KEY: &str = "BEACON_OWNER_PRIVATE_KEY";
pub const CREATE2_OWNER_KEY: &str = "LENS_CREATE2_OWNER_PRIVATE_KEY";

/// A connection to the configured chain with the artifacts and the (locked)
/// address book.
pub struct Session {
    pub config: DeployConfig,
    pub chain: RpcChain<HttpProviderWithWallet>,
    pub artifacts: ArtifactStore,
    pub book: AddressBookStore,
}

impl Session {
    /// Read the config and connect. Transactions are signed by the key in
    /// [`DEPLOYER_KEY`] unless sent from one of the `roles`.
    pub async fn open<P: AsRef<Path>>(config: P, roles: Vec<PrivateKeySigner>) -> Result<Self> {
        lens_utils::env::load_dotenv();
        let config = DeployConfig::read(config).await?;
        let deployer = signer_from_env(DEPLOYER_KEY)?;
        let sender = deployer.address();
        info!(%sender, url = %config.chain_url, "connecting");

        let provider = build_provider(deployer, roles, config.chain_url.clone());
        let chain = RpcChain::new(provider, sender, config.address_derivation);
        let artifacts = ArtifactStore::new(config.artifacts.clone());
        let book = AddressBookStore::open(&config.address_book)?;
        Ok(Self {
            config,
            chain,
            artifacts,
            book,
        })
    }

    pub fn deployer(&self) -> Deployer<'_, RpcChain<HttpProviderWithWallet>> {
        Deployer::new(&self.chain, &self.artifacts, &self.book)
    }

    pub fn create2_factory(&self, owner: Address) -> Result<Create2Factory> {
        let min_balance = self
            .config
            .create2
            .min_balance_wei()
            .context("invalid create2.min_balance")?;
        Ok(Create2Factory {
            address: self.config.create2.factory,
            owner,
            min_balance,
        })
    }

    /// Regenerate the env file from the address book.
    pub async fn write_env_file(&self) -> Result<()> {
        let book = self.book.load().await?;
        let path = &self.config.env_file;
        tokio::fs::write(path, render_env(&book))
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "env file written");
        Ok(())
    }
}

/// Signer for a role key, also returned as address.
pub fn role(var: &str) -> Result<(PrivateKeySigner, Address), DeployError> {
    let signer = signer_from_env(var)?;
    let address = signer.address();
    Ok((signer, address))
}
