use std::path::{Path, PathBuf};

use alloy::primitives::{Address, U256, utils::parse_ether};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{chain::AddressDerivation, create2::LENS_CREATE2_ADDRESS};

#[derive(Debug, thiserror::Error)]
#[error("config error {0}: {1}")]
pub struct ConfigError(PathBuf, #[source] Box<dyn std::error::Error + Send + Sync>);

pub(crate) async fn read_toml<T, P>(path: P) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let s = tokio::fs::read_to_string(path.as_ref())
        .await
        .map_err(|e| ConfigError(path.as_ref().into(), Box::new(e)))?;
    toml::from_str(&s).map_err(|e| ConfigError(path.as_ref().into(), Box::new(e)))
}

/// Where and how to deploy. See `deploy.toml` for an example.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    /// RPC endpoint of the target chain
    pub chain_url: Url,
    #[serde(default = "default_address_book")]
    pub address_book: PathBuf,
    /// Hardhat artifacts directory.
    #[serde(default = "default_artifacts")]
    pub artifacts: PathBuf,
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,
    #[serde(default)]
    pub address_derivation: AddressDerivation,
    #[serde(default)]
    pub create2: Create2Config,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Create2Config {
    #[serde(default = "default_factory")]
    pub factory: Address,
    /// Minimum balance of the factory owner, in ether.
    #[serde(default = "default_min_balance")]
    pub min_balance: String,
}

impl Default for Create2Config {
    fn default() -> Self {
        Self {
            factory: default_factory(),
            min_balance: default_min_balance(),
        }
    }
}

impl Create2Config {
    pub fn min_balance_wei(&self) -> Result<U256, alloy::primitives::utils::UnitsError> {
        parse_ether(&self.min_balance)
    }
}

impl DeployConfig {
    pub async fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        read_toml(path).await
    }
}

fn default_address_book() -> PathBuf {
    lens_address_book::DEFAULT_ADDRESS_BOOK.into()
}

fn default_artifacts() -> PathBuf {
    "artifacts-zk".into()
}

fn default_env_file() -> PathBuf {
    lens_address_book::DEFAULT_ENV_FILE.into()
}

fn default_factory() -> Address {
    LENS_CREATE2_ADDRESS
}

fn default_min_balance() -> String {
    "0.01".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.toml");
        tokio::fs::write(&path, "chain_url = \"http://localhost:8011\"\n")
            .await
            .unwrap();
        let cfg = DeployConfig::read(&path).await.unwrap();
        assert_eq!(cfg.address_book, PathBuf::from("addressBook.json"));
        assert_eq!(cfg.env_file, PathBuf::from("contracts.env"));
        assert_eq!(cfg.address_derivation, AddressDerivation::Evm);
        assert_eq!(cfg.create2.factory, LENS_CREATE2_ADDRESS);
        assert_eq!(
            cfg.create2.min_balance_wei().unwrap(),
            U256::from(10_000_000_000_000_000u64)
        );
    }

    #[tokio::test]
    async fn full() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.toml");
        let raw = r#"
chain_url = "https://rpc.testnet.lens.dev"
address_book = "books/testnet.json"
artifacts = "out"
address_derivation = "zksync"

[create2]
factory = "0x0000000000000000000000000000000000000c02"
min_balance = "0.5"
"#;
        tokio::fs::write(&path, raw).await.unwrap();
        let cfg = DeployConfig::read(&path).await.unwrap();
        assert_eq!(cfg.address_derivation, AddressDerivation::Zksync);
        assert_eq!(cfg.artifacts, PathBuf::from("out"));
        assert_eq!(
            cfg.create2.factory,
            alloy::primitives::address!("0x0000000000000000000000000000000000000c02")
        );
        assert!(DeployConfig::read(dir.path().join("missing.toml")).await.is_err());
    }
}
