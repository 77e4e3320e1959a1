//! Actions bound to the recorded `ActionHub`.

use alloy::primitives::Address;
use lens_address_book::{ContractRecord, ContractType};

use super::{addr_arg, owned_target, verify_proxies};
use crate::{chain::Chain, deployer::Deployer, error::DeployError, target::Target};

pub const ACTION_HUB: &str = "ActionHub";

pub const ACTIONS: [&str; 3] = ["TippingAccountAction", "TippingPostAction", "SimpleCollectAction"];

pub fn action_targets(action_hub: Address, owner: Address, metadata_uri: &str) -> Vec<Target> {
    ACTIONS
        .iter()
        .map(|a| {
            owned_target(
                a,
                ContractType::Action,
                vec![addr_arg(action_hub)],
                owner,
                metadata_uri,
            )
        })
        .collect()
}

/// Deploy every action without a record, owned by `owner`, behind proxies
/// administered by `proxy_admin`.
pub async fn deploy_actions<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
    proxy_admin: Address,
    owner: Address,
) -> Result<Vec<ContractRecord>, DeployError> {
    let hub = d.book().require_address(ACTION_HUB).await?;
    let mut out = Vec::with_capacity(ACTIONS.len());
    for t in action_targets(hub, owner, "") {
        out.push(d.deploy_as_proxy(&t, proxy_admin).await?);
    }
    Ok(out)
}

/// Roll out changed action bytecode, then verify every proxy.
pub async fn upgrade_actions<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
    proxy_admin: Address,
) -> Result<Vec<ContractRecord>, DeployError> {
    let hub = d.book().require_address(ACTION_HUB).await?;
    let targets = ACTIONS
        .iter()
        .map(|a| Target::new(*a, ContractType::Action).with_args(vec![addr_arg(hub)]))
        .collect::<Vec<_>>();
    let mut out = Vec::with_capacity(targets.len());
    for t in &targets {
        out.push(d.upgrade_transparent_proxy(proxy_admin, t).await?);
    }
    verify_proxies(d, &targets).await?;
    Ok(out)
}
