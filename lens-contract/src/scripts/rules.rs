//! Rules deployed behind transparent proxies owned by the rules owner.

use alloy::primitives::Address;
use lens_address_book::{ContractRecord, ContractType};

use super::{owned_target, verify_proxies};
use crate::{chain::Chain, deployer::Deployer, error::DeployError, target::Target};

pub const RULES: [&str; 14] = [
    "SimplePaymentFeedRule",
    "TokenGatedFeedRule",
    "FollowersOnlyPostRule",
    "GroupGatedGraphRule",
    "TokenGatedGraphRule",
    "SimplePaymentFollowRule",
    "TokenGatedFollowRule",
    "MembershipApprovalGroupRule",
    "SimplePaymentGroupRule",
    "TokenGatedGroupRule",
    "UsernameLengthNamespaceRule",
    "UsernameReservedNamespaceRule",
    "TokenGatedNamespaceRule",
    "UsernamePricePerLengthNamespaceRule",
];

pub fn rule_targets(owner: Address, metadata_uri: &str) -> Vec<Target> {
    RULES
        .iter()
        .map(|r| owned_target(r, ContractType::Rule, Vec::new(), owner, metadata_uri))
        .collect()
}

/// Deploy every rule that has no record yet. `rules_owner` owns both the
/// rule and its proxy.
pub async fn deploy_rules<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
    rules_owner: Address,
) -> Result<Vec<ContractRecord>, DeployError> {
    let mut out = Vec::with_capacity(RULES.len());
    for t in rule_targets(rules_owner, "") {
        out.push(d.deploy_as_proxy(&t, rules_owner).await?);
    }
    Ok(out)
}

/// Roll out changed rule bytecode, then verify every proxy.
pub async fn upgrade_rules<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
    proxy_admin: Address,
) -> Result<Vec<ContractRecord>, DeployError> {
    let targets = RULES
        .iter()
        .map(|r| Target::new(*r, ContractType::Rule))
        .collect::<Vec<_>>();
    let mut out = Vec::with_capacity(targets.len());
    for t in &targets {
        out.push(d.upgrade_transparent_proxy(proxy_admin, t).await?);
    }
    verify_proxies(d, &targets).await?;
    Ok(out)
}
