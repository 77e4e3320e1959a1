//! Deployment and upgrade runs over whole groups of contracts.
//!
//! Each run is a sequence of the idempotent primitives, so an interrupted run
//! can simply be started again.

pub mod actions;
pub mod beacons;
pub mod create2_batch;
pub mod factories;
pub mod rules;
pub mod upgrades;

use alloy::primitives::Address;
use lens_address_book::ContractType;
use serde_json::Value;
use tracing::info;

use crate::{
    chain::Chain,
    deployer::Deployer,
    error::{DeployError, ensure_eq},
    onchain,
    sol_types::initialize_with_metadata_call,
    target::Target,
};

/// JSON form of an address constructor argument.
pub(crate) fn addr_arg(a: Address) -> Value {
    Value::String(a.to_string())
}

/// Resolve recorded addresses into constructor arguments.
pub(crate) async fn book_args<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
    names: &[&str],
) -> Result<Vec<Value>, DeployError> {
    let mut args = Vec::with_capacity(names.len());
    for name in names {
        args.push(addr_arg(d.book().require_address(name).await?));
    }
    Ok(args)
}

/// An owned contract initialized with `initialize(owner, metadataURI)`.
pub(crate) fn owned_target(
    contract_name: &str,
    contract_type: ContractType,
    args: Vec<Value>,
    owner: Address,
    metadata_uri: &str,
) -> Target {
    Target::builder()
        .contract_name(contract_name)
        .contract_type(contract_type)
        .constructor_arguments(args)
        .initializer(initialize_with_metadata_call(owner, metadata_uri))
        .build()
}

/// Check that every target's proxy runs code matching its artifact.
pub async fn verify_proxies<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
    targets: &[Target],
) -> Result<(), DeployError> {
    for t in targets {
        let name = t.logical_name();
        let proxy = d.book().require_address(name).await?;
        let implementation = onchain::proxy_implementation(d.chain(), proxy).await?;
        verify_implementation(d, t, name, implementation).await?;
    }
    Ok(())
}

/// Check that every target's beacon serves code matching its artifact.
pub async fn verify_beacons<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
    targets: &[Target],
) -> Result<(), DeployError> {
    for t in targets {
        let name = t.beacon_name();
        let beacon = d.book().require_address(&name).await?;
        let implementation = onchain::beacon_implementation(d.chain(), beacon).await?;
        verify_implementation(d, t, &name, implementation).await?;
    }
    Ok(())
}

/// On zkSync the implementation's code must match the artifact. On EVM
/// chains it must be the recorded `<name>Impl`, which was deployed from the
/// artifact.
async fn verify_implementation<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
    t: &Target,
    name: &str,
    implementation: Address,
) -> Result<(), DeployError> {
    if onchain::code_matches_artifacts(d.chain()) {
        let onchain = onchain::code_fingerprint(d.chain(), implementation).await?;
        let expected = d.artifacts().get(&t.contract_name)?.runtime_fingerprint()?;
        ensure_eq(&format!("{name} implementation code fingerprint"), expected, onchain)?;
        info!(%name, %implementation, fingerprint = %onchain, "on-chain code matches artifact");
    } else {
        let recorded = d.book().require_address(&t.impl_name()).await?;
        ensure_eq(&format!("{name} implementation"), recorded, implementation)?;
        info!(%name, %implementation, "implementation matches address book");
    }
    Ok(())
}

/// Read `owner()` and `getMetadataURI()` of each contract and store them in
/// its record.
pub async fn record_owners<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
    names: &[&str],
) -> Result<(), DeployError> {
    let mut found = Vec::with_capacity(names.len());
    for name in names {
        let at = d.book().require_address(name).await?;
        let owner = onchain::owner_of(d.chain(), at).await?;
        let uri = onchain::metadata_uri_of(d.chain(), at).await?;
        info!(%name, %owner, metadata_uri = %uri, "ownership verified");
        found.push((*name, owner, uri));
    }
    d.book()
        .update(|book| {
            for (name, owner, uri) in found {
                if let Some(r) = book.get_mut(name) {
                    r.owner = Some(owner);
                    r.metadata_uri = Some(uri);
                }
            }
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chain::AddressDerivation,
        deployer::tests::{artifact, setup, store},
    };
    use alloy::primitives::Bytes;

    #[tokio::test]
    async fn proxy_verification_per_chain_kind() {
        let dir = tempfile::tempdir().unwrap();
        let (chain, artifacts) = setup();
        let book = store(&dir);
        artifacts.insert(artifact("AccountBlockingRule", "rule v1"));
        let d = Deployer::new(&chain, &artifacts, &book);
        let target = Target::new("AccountBlockingRule", ContractType::Rule);
        let targets = std::slice::from_ref(&target);

        let rec = d
            .deploy_as_proxy(&target, Address::with_last_byte(0xad))
            .await
            .unwrap();
        verify_proxies(&d, targets).await.unwrap();

        let implementation = rec.implementation.unwrap();
        chain.set_code(implementation, Bytes::from_static(b"rule v1 with immutables"));
        assert!(matches!(
            verify_proxies(&d, targets).await,
            Err(DeployError::Mismatch { .. })
        ));

        chain.set_derivation(AddressDerivation::Evm);
        verify_proxies(&d, targets).await.unwrap();

        book.update(|b| {
            if let Some(r) = b.get_mut("AccountBlockingRuleImpl") {
                r.address = Some(Address::with_last_byte(0x55));
            }
        })
        .await
        .unwrap();
        assert!(matches!(
            verify_proxies(&d, targets).await,
            Err(DeployError::Mismatch { .. })
        ));
    }
}
