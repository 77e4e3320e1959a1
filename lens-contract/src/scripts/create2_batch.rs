//! Deterministic deployment of the auxiliary contracts, actions and rules
//! through the CREATE2 factory.

use alloy::primitives::Address;
use lens_address_book::ContractType;
use serde_json::Value;
use tracing::info;

use super::{actions::ACTION_HUB, actions::action_targets, addr_arg, owned_target, record_owners};
use crate::{
    chain::Chain,
    create2::Create2Factory,
    deployer::Deployer,
    error::DeployError,
    target::Target,
};

pub const LENS_FEES: &str = "LensFees";

/// Rules deployed through the factory.
pub const CREATE2_RULES: [&str; 19] = [
    "AccountBlockingRule",
    "AdditionRemovalPidGroupRule",
    "BanMemberGroupRule",
    "GroupGatedFeedRule",
    "UsernameLengthNamespaceRule",
    "UsernameReservedNamespaceRule",
    "UsernameSimpleCharsetNamespaceRule",
    "SimplePaymentFeedRule",
    "TokenGatedFeedRule",
    "TokenGatedGraphRule",
    "FollowersOnlyPostRule",
    "GroupGatedGraphRule",
    "SimplePaymentFollowRule",
    "TokenGatedFollowRule",
    "MembershipApprovalGroupRule",
    "SimplePaymentGroupRule",
    "TokenGatedGroupRule",
    "TokenGatedNamespaceRule",
    "UsernamePricePerLengthNamespaceRule",
];

#[derive(Debug, Clone)]
pub struct Create2BatchParams {
    pub proxy_admin: Address,
    /// Owner of the actions and rules.
    pub owner: Address,
    pub treasury: Address,
    /// Treasury fee in basis points, passed to `LensFees` as given.
    pub treasury_fee_bps: String,
}

/// Deploy `ActionHub`, `LensFees`, the actions and the rules, then record
/// each action's and rule's on-chain owner and metadata URI.
pub async fn deploy_many_with_create2<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
    factory: &Create2Factory,
    params: &Create2BatchParams,
) -> Result<(), DeployError> {
    let hub = d
        .deploy_with_create2(
            factory,
            &Target::new(ACTION_HUB, ContractType::Aux),
            params.proxy_admin,
        )
        .await?;
    let hub = hub.address.ok_or_else(|| DeployError::MissingField {
        name: ACTION_HUB.to_string(),
        field: "address",
    })?;

    let fees = Target::new(LENS_FEES, ContractType::Aux).with_args(vec![
        addr_arg(params.treasury),
        Value::String(params.treasury_fee_bps.clone()),
    ]);
    d.deploy_with_create2(factory, &fees, params.proxy_admin)
        .await?;

    let actions = action_targets(hub, params.owner, "");
    for t in &actions {
        d.deploy_with_create2(factory, t, params.proxy_admin).await?;
    }

    let rules = CREATE2_RULES
        .iter()
        .map(|r| owned_target(r, ContractType::Rule, Vec::new(), params.owner, ""))
        .collect::<Vec<_>>();
    for t in &rules {
        d.deploy_with_create2(factory, t, params.proxy_admin).await?;
    }

    info!("verifying owners and metadata of the deployed contracts");
    let names = actions
        .iter()
        .chain(&rules)
        .map(Target::logical_name)
        .collect::<Vec<_>>();
    record_owners(d, &names).await
}
