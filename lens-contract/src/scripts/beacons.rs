//! Beacon upgrades of the primitive implementations.

use alloy::primitives::{Address, U256};
use lens_address_book::{ContractRecord, ContractType};

use super::verify_beacons;
use crate::{chain::Chain, deployer::Deployer, error::DeployError, target::Target};

/// Primitives served through `<Name>Beacon`.
pub const PRIMITIVES: [&str; 5] = ["Feed", "Namespace", "Graph", "Account", "App"];

/// Upgrade each named primitive's beacon to `version`, then verify them.
pub async fn upgrade_beacons<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
    owner: Address,
    names: &[String],
    version: U256,
) -> Result<Vec<ContractRecord>, DeployError> {
    let targets = names
        .iter()
        .map(|n| Target::new(n.as_str(), ContractType::Implementation))
        .collect::<Vec<_>>();
    let mut out = Vec::with_capacity(targets.len());
    for t in &targets {
        out.push(d.upgrade_beacon(owner, t, version).await?);
    }
    verify_beacons(d, &targets).await?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        deployer::tests::{artifact, setup, store},
        onchain,
    };

    #[tokio::test]
    async fn upgrades_all_named_beacons() {
        let dir = tempfile::tempdir().unwrap();
        let (chain, artifacts) = setup();
        let book = store(&dir);
        let d = Deployer::new(&chain, &artifacts, &book);
        let owner = Address::with_last_byte(0xb0);

        for (i, p) in PRIMITIVES.iter().enumerate() {
            artifacts.insert(artifact(p, &format!("{p} v2")));
            let beacon = Address::with_last_byte(0x80 + i as u8);
            chain.install_beacon(beacon, owner, U256::from(1), Address::with_last_byte(1));
            let mut rec = ContractRecord::new("Beacon", ContractType::Beacon);
            rec.address = Some(beacon);
            book.put(&format!("{p}Beacon"), rec).await.unwrap();
        }

        let names = PRIMITIVES.map(String::from);
        let out = upgrade_beacons(&d, owner, &names, U256::from(10000))
            .await
            .unwrap();
        assert_eq!(out.len(), PRIMITIVES.len());
        let account = book.require_address("AccountBeacon").await.unwrap();
        assert_eq!(
            onchain::beacon_default_version(&chain, account).await.unwrap(),
            U256::from(10000)
        );
        assert_eq!(chain.deployments(), PRIMITIVES.len());
    }
}
