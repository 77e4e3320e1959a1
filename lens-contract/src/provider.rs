//! Signers and the HTTP provider the deployment binaries send through.

use std::str::FromStr;

use alloy::{
    network::{Ethereum, EthereumWallet},
    providers::{
        ProviderBuilder, RootProvider,
        fillers::{FillProvider, JoinFill, WalletFiller},
        utils::JoinedRecommendedFillers,
    },
    signers::local::{LocalSignerError, PrivateKeySigner},
    transports::http::reqwest::Url,
};

use crate::error::DeployError;

/// HTTP provider filling gas, nonce and chain id, signing with its wallet.
pub type HttpProviderWithWallet = FillProvider<
    JoinFill<JoinedRecommendedFillers, WalletFiller<EthereumWallet>>,
    RootProvider,
    Ethereum,
>;

/// Build a local signer from a hex private key (with or without `0x`).
pub fn build_signer(private_key: &str) -> Result<PrivateKeySigner, LocalSignerError> {
    PrivateKeySigner::from_str(private_key.trim())
}

/// Signer for the private key held in the environment variable `var`.
pub fn signer_from_env(var: &str) -> Result<PrivateKeySigner, DeployError> {
    let key = lens_utils::env::require(var)?;
    build_signer(&key).map_err(|e| DeployError::InvalidParam {
        name: var.to_string(),
        reason: e.to_string(),
    })
}

/// Connect to `url` with a wallet holding every role's key.
///
/// `default` signs transactions without an explicit `from`; the `others`
/// sign the ones sent from their addresses.
pub fn build_provider<I>(default: PrivateKeySigner, others: I, url: Url) -> HttpProviderWithWallet
where
    I: IntoIterator<Item = PrivateKeySigner>,
{
    let mut wallet = EthereumWallet::from(default);
    for signer in others {
        wallet.register_signer(signer);
    }
    ProviderBuilder::new().wallet(wallet).connect_http(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signer_from_hex() {
        let k = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
        let a = build_signer(k).unwrap();
        let b = build_signer(&k[2..]).unwrap();
        assert_eq!(a.address(), b.address());
        assert!(build_signer("0x1234").is_err());
    }
}
