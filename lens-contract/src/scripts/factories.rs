//! The primitive factories, the rules they install by default and the
//! `LensFactory` tying them together.
//!
//! Four factories take the `LensFactory` address as a constructor argument
//! while `LensFactory` takes theirs, so the `LensFactory` proxy address is
//! predicted from the deployer's nonce before anything is deployed.

use std::collections::BTreeMap;

use alloy::primitives::Address;
use lens_address_book::ContractType;
use serde_json::{Map, Value};
use tracing::info;

use super::{addr_arg, book_args, owned_target};
use crate::{
    chain::Chain,
    deployer::Deployer,
    error::{DeployError, ensure_eq},
    target::Target,
};

pub const LENS_FACTORY: &str = "LensFactory";

pub(crate) struct FactoryDef {
    pub name: &'static str,
    pub migration_contract: &'static str,
    /// Address book entries passed to the constructor.
    pub deps: &'static [&'static str],
    pub needs_lens_factory: bool,
}

pub(crate) const FACTORIES: [FactoryDef; 7] = [
    FactoryDef {
        name: "AccessControlFactory",
        migration_contract: "MigrationAccessControlFactory",
        deps: &["AccessControlLock"],
        needs_lens_factory: false,
    },
    FactoryDef {
        name: "AccountFactory",
        migration_contract: "MigrationAccountFactory",
        deps: &["AccountBeacon", "AccountLock"],
        needs_lens_factory: false,
    },
    FactoryDef {
        name: "AppFactory",
        migration_contract: "MigrationAppFactory",
        deps: &["AppBeacon", "AppLock"],
        needs_lens_factory: false,
    },
    FactoryDef {
        name: "FeedFactory",
        migration_contract: "MigrationFeedFactory",
        deps: &["FeedBeacon", "FeedLock"],
        needs_lens_factory: true,
    },
    FactoryDef {
        name: "GraphFactory",
        migration_contract: "MigrationGraphFactory",
        deps: &["GraphBeacon", "GraphLock"],
        needs_lens_factory: true,
    },
    FactoryDef {
        name: "GroupFactory",
        migration_contract: "GroupFactory",
        deps: &["GroupBeacon", "GroupLock"],
        needs_lens_factory: true,
    },
    FactoryDef {
        name: "NamespaceFactory",
        migration_contract: "MigrationNamespaceFactory",
        deps: &["NamespaceBeacon", "NamespaceLock"],
        needs_lens_factory: true,
    },
];

/// Rules `LensFactory` installs by default, with the struct field naming
/// each one.
pub(crate) const DEFAULT_RULES: [(&str, &str); 6] = [
    ("accountBlockingRule", "AccountBlockingRule"),
    ("groupGatedFeedRule", "GroupGatedFeedRule"),
    ("usernameSimpleCharsetRule", "UsernameSimpleCharsetNamespaceRule"),
    ("banMemberGroupRule", "BanMemberGroupRule"),
    ("addRemovePidGroupRule", "AdditionRemovalPidGroupRule"),
    ("usernameReservedNamespaceRule", "UsernameReservedNamespaceRule"),
];

/// Rules deployed by this run; the last default rule comes with the rule set.
pub const PREREQUISITE_RULES: [&str; 5] = [
    "AccountBlockingRule",
    "GroupGatedFeedRule",
    "UsernameSimpleCharsetNamespaceRule",
    "BanMemberGroupRule",
    "AdditionRemovalPidGroupRule",
];

#[derive(Debug, Clone)]
pub struct FactoriesParams {
    /// Deploy the migration variants and no rules.
    pub migration: bool,
    pub rules_owner: Address,
    pub proxy_owner: Address,
    pub metadata_uri: String,
}

/// Lowercase the first letter: `AccessControlFactory` -> `accessControlFactory`.
pub(crate) fn field_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) => c.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// `LensFactory` constructor arguments: the factories struct and the default
/// rules struct, both keyed by field name.
pub(crate) fn lens_factory_args(
    factories: &BTreeMap<&str, Address>,
    rules: &BTreeMap<&str, Address>,
) -> Vec<Value> {
    let f = factories
        .iter()
        .map(|(name, a)| (field_name(name), addr_arg(*a)))
        .collect::<Map<_, _>>();
    let r = DEFAULT_RULES
        .iter()
        .map(|(field, name)| {
            let a = rules.get(name).copied().unwrap_or(Address::ZERO);
            (field.to_string(), addr_arg(a))
        })
        .collect::<Map<_, _>>();
    vec![Value::Object(f), Value::Object(r)]
}

/// Deploy the factories, the prerequisite rules and `LensFactory`, returning
/// the `LensFactory` address.
pub async fn deploy_factories<C: Chain + ?Sized>(
    d: &Deployer<'_, C>,
    params: &FactoriesParams,
) -> Result<Address, DeployError> {
    let book = d.book();
    let chain = d.chain();

    let rules: Vec<Target> = if params.migration {
        Vec::new()
    } else {
        PREREQUISITE_RULES
            .iter()
            .map(|r| {
                owned_target(
                    r,
                    ContractType::Rule,
                    Vec::new(),
                    params.rules_owner,
                    &params.metadata_uri,
                )
            })
            .collect()
    };

    let mut names: Vec<&str> = FACTORIES.iter().map(|f| f.name).collect();
    names.extend(rules.iter().map(Target::logical_name));
    let mut pending = 0;
    for name in names {
        if book.record(name).await?.is_none() {
            pending += 1;
        }
    }

    let (lens_factory, predicted) = match book.address_of(LENS_FACTORY).await? {
        Some(a) => (a, false),
        None => {
            let sender = chain.sender();
            // Every pending proxy deployment takes two transactions, then
            // comes the LensFactory implementation.
            let nonce = chain.nonce(sender).await? + 2 * pending + 1;
            let a = chain.predict_create_address(sender, nonce).await?;
            info!(%sender, nonce, pending, predicted = %a, "predicted LensFactory address");
            (a, true)
        }
    };

    let mut targets = Vec::with_capacity(FACTORIES.len());
    for f in &FACTORIES {
        let mut args = book_args(d, f.deps).await?;
        if f.needs_lens_factory {
            args.push(addr_arg(lens_factory));
        }
        let contract = if params.migration {
            f.migration_contract
        } else {
            f.name
        };
        targets.push(
            Target::builder()
                .contract_name(contract)
                .name(f.name)
                .contract_type(ContractType::Factory)
                .constructor_arguments(args)
                .build(),
        );
    }

    let mut factories = BTreeMap::new();
    for (f, t) in FACTORIES.iter().zip(&targets) {
        let rec = d.deploy_as_proxy(t, params.proxy_owner).await?;
        factories.insert(f.name, deployed_address(f.name, rec.address)?);
    }
    let mut deployed_rules = BTreeMap::new();
    for (name, t) in PREREQUISITE_RULES.iter().zip(&rules) {
        let rec = d.deploy_as_proxy(t, params.rules_owner).await?;
        deployed_rules.insert(*name, deployed_address(name, rec.address)?);
    }
    if !params.migration {
        for (_, name) in DEFAULT_RULES {
            if !deployed_rules.contains_key(name) {
                if let Some(a) = book.address_of(name).await? {
                    deployed_rules.insert(name, a);
                }
            }
        }
    }

    let target = Target::builder()
        .contract_name(if params.migration {
            "MigrationLensFactory"
        } else {
            LENS_FACTORY
        })
        .name(LENS_FACTORY)
        .contract_type(ContractType::Factory)
        .constructor_arguments(lens_factory_args(&factories, &deployed_rules))
        .build();
    let rec = d.deploy_as_proxy(&target, params.proxy_owner).await?;
    let actual = deployed_address(LENS_FACTORY, rec.address)?;
    if predicted {
        ensure_eq("LensFactory address", lens_factory, actual)?;
    }
    info!(address = %actual, "LensFactory deployed");
    Ok(actual)
}

fn deployed_address(name: &str, a: Option<Address>) -> Result<Address, DeployError> {
    a.ok_or_else(|| DeployError::MissingField {
        name: name.to_string(),
        field: "address",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        artifacts::{Artifact, ArtifactStore},
        deployer::tests::{artifact, setup, store},
        onchain,
    };
    use alloy::{json_abi::JsonAbi, primitives::Bytes};
    use lens_address_book::{AddressBookStore, ContractRecord};
    use serde_json::json;

    fn lens_factory_artifact(name: &str) -> Artifact {
        let component = |n: &str| json!({"name": n, "type": "address"});
        let factories = FACTORIES
            .iter()
            .map(|f| component(&field_name(f.name)))
            .collect::<Vec<_>>();
        let rules = DEFAULT_RULES
            .iter()
            .map(|(f, _)| component(f))
            .collect::<Vec<_>>();
        let abi: JsonAbi = serde_json::from_value(json!([{
            "type": "constructor",
            "stateMutability": "nonpayable",
            "inputs": [
                {"name": "factories", "type": "tuple", "components": factories},
                {"name": "rules", "type": "tuple", "components": rules},
            ],
        }]))
        .unwrap();
        Artifact::new(name, abi, Bytes::from(name.as_bytes().to_vec()))
    }

    fn factory_artifact(name: &str, args: usize) -> Artifact {
        let inputs = (0..args)
            .map(|i| json!({"name": format!("a{i}"), "type": "address"}))
            .collect::<Vec<_>>();
        let abi: JsonAbi = serde_json::from_value(json!([{
            "type": "constructor",
            "stateMutability": "nonpayable",
            "inputs": inputs,
        }]))
        .unwrap();
        Artifact::new(name, abi, Bytes::from(name.as_bytes().to_vec()))
    }

    async fn prepare(artifacts: &ArtifactStore, book: &AddressBookStore) {
        for (i, f) in FACTORIES.iter().enumerate() {
            let n = f.deps.len() + usize::from(f.needs_lens_factory);
            artifacts.insert(factory_artifact(f.name, n));
            artifacts.insert(factory_artifact(f.migration_contract, n));
            for (j, dep) in f.deps.iter().enumerate() {
                let mut r = ContractRecord::new(*dep, ContractType::Misc);
                r.address = Some(Address::with_last_byte((16 * i + j + 1) as u8));
                book.put(dep, r).await.unwrap();
            }
        }
        for r in PREREQUISITE_RULES {
            artifacts.insert(artifact(r, r));
        }
        artifacts.insert(lens_factory_artifact(LENS_FACTORY));
        artifacts.insert(lens_factory_artifact("MigrationLensFactory"));
    }

    fn params(migration: bool) -> FactoriesParams {
        FactoriesParams {
            migration,
            rules_owner: Address::with_last_byte(0x0e),
            proxy_owner: Address::with_last_byte(0xad),
            metadata_uri: String::new(),
        }
    }

    #[test]
    fn field_names() {
        assert_eq!(field_name("AccessControlFactory"), "accessControlFactory");
        assert_eq!(field_name(""), "");
    }

    #[tokio::test]
    async fn predicted_lens_factory_is_wired_in() {
        let dir = tempfile::tempdir().unwrap();
        let (chain, artifacts) = setup();
        let book = store(&dir);
        prepare(&artifacts, &book).await;
        let d = Deployer::new(&chain, &artifacts, &book);

        let lens = deploy_factories(&d, &params(false)).await.unwrap();
        assert_eq!(book.address_of(LENS_FACTORY).await.unwrap(), Some(lens));
        assert_eq!(chain.deployments(), 2 * (7 + 5 + 1));

        let feed = book.record("FeedFactoryImpl").await.unwrap().unwrap();
        assert_eq!(feed.constructor_arguments.unwrap()[2], json!(lens.to_string()));

        let lens_rec = book.record("LensFactoryImpl").await.unwrap().unwrap();
        let ctor = lens_rec.constructor_arguments.unwrap();
        assert_eq!(
            ctor[1]["accountBlockingRule"],
            json!(book.address_of("AccountBlockingRule").await.unwrap().unwrap().to_string())
        );
        assert_eq!(ctor[1]["usernameReservedNamespaceRule"], json!(Address::ZERO.to_string()));
        assert_eq!(
            onchain::proxy_admin(&chain, lens).await.unwrap(),
            params(false).proxy_owner
        );

        let again = deploy_factories(&d, &params(false)).await.unwrap();
        assert_eq!(again, lens);
        assert_eq!(chain.deployments(), 26);
    }

    #[tokio::test]
    async fn resumes_after_partial_run() {
        let dir = tempfile::tempdir().unwrap();
        let (chain, artifacts) = setup();
        let book = store(&dir);
        prepare(&artifacts, &book).await;
        let d = Deployer::new(&chain, &artifacts, &book);

        let t = Target::new("AccessControlFactory", ContractType::Factory)
            .with_args(book_args(&d, &["AccessControlLock"]).await.unwrap());
        d.deploy_as_proxy(&t, params(true).proxy_owner).await.unwrap();

        deploy_factories(&d, &params(true)).await.unwrap();
        assert_eq!(chain.deployments(), 2 * (7 + 1));
        assert!(book.record("AccountBlockingRule").await.unwrap().is_none());
        assert_eq!(
            book.record("LensFactoryImpl").await.unwrap().unwrap().contract_name,
            "MigrationLensFactory"
        );
    }

    #[tokio::test]
    async fn missing_dependency_fails_before_sending() {
        let dir = tempfile::tempdir().unwrap();
        let (chain, artifacts) = setup();
        let book = store(&dir);
        let d = Deployer::new(&chain, &artifacts, &book);
        assert!(matches!(
            deploy_factories(&d, &params(false)).await,
            Err(DeployError::Store(_))
        ));
        assert_eq!(chain.transactions(), 0);
    }
}
