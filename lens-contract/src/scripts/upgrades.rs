//! Upgrade of the factories and `LensFactory`, with constructor arguments
//! rebuilt from the address book.

use std::collections::BTreeMap;

use alloy::primitives::Address;
use lens_address_book::{ContractRecord, ContractType};

use super::{
    addr_arg, book_args,
    factories::{DEFAULT_RULES, FACTORIES, LENS_FACTORY, lens_factory_args},
    verify_proxies,
};
use crate::{chain::Chain, deployer::Deployer, error::DeployError, target::Target};

/// Targets for every factory and `LensFactory`. Every address they need must
/// already be recorded.
pub async fn factory_targets<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
) -> Result<Vec<Target>, DeployError> {
    let book = d.book();
    let lens_factory = book.require_address(LENS_FACTORY).await?;

    let mut targets = Vec::with_capacity(FACTORIES.len() + 1);
    let mut factories = BTreeMap::new();
    for f in &FACTORIES {
        let mut args = book_args(d, f.deps).await?;
        if f.needs_lens_factory {
            args.push(addr_arg(lens_factory));
        }
        factories.insert(f.name, book.require_address(f.name).await?);
        targets.push(Target::new(f.name, ContractType::Factory).with_args(args));
    }
    let mut rules = BTreeMap::new();
    for (_, name) in DEFAULT_RULES {
        rules.insert(name, book.require_address(name).await?);
    }
    targets.push(
        Target::new(LENS_FACTORY, ContractType::Factory)
            .with_args(lens_factory_args(&factories, &rules)),
    );
    Ok(targets)
}

/// Upgrade every factory whose bytecode changed, then verify all of them.
pub async fn upgrade_factories<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
    proxy_admin: Address,
) -> Result<Vec<ContractRecord>, DeployError> {
    let targets = factory_targets(d).await?;
    let mut out = Vec::with_capacity(targets.len());
    for t in &targets {
        out.push(d.upgrade_transparent_proxy(proxy_admin, t).await?);
    }
    verify_proxies(d, &targets).await?;
    Ok(out)
}
