use std::{
    collections::{BTreeMap, btree_map},
    fmt,
    str::FromStr,
};

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

use crate::BytecodeHash;

/// Classification used for reporting and env-file sections.
///
/// Persisted as its index to stay compatible with existing address books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ContractType {
    Implementation,
    Beacon,
    Factory,
    Primitive,
    Aux,
    Action,
    Rule,
    Misc,
    Address,
}

impl ContractType {
    pub const ALL: [ContractType; 9] = [
        Self::Implementation,
        Self::Beacon,
        Self::Factory,
        Self::Primitive,
        Self::Aux,
        Self::Action,
        Self::Rule,
        Self::Misc,
        Self::Address,
    ];
}

impl From<ContractType> for u8 {
    fn from(t: ContractType) -> Self {
        t as u8
    }
}

impl TryFrom<u8> for ContractType {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(n))
            .copied()
            .ok_or_else(|| format!("unknown contract type {n}"))
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for ContractType {
    type Err = String;

    /// Accepts the variant name (any case) or its index.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<u8>() {
            return Self::try_from(n);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown contract type {s:?}"))
    }
}

/// Deployment metadata of one logical contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRecord {
    /// Compiled artifact identifier.
    pub contract_name: String,
    pub contract_type: ContractType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor_arguments: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode_hash: Option<BytecodeHash>,
    /// Backing implementation, for proxies and beacons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_admin: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializer_calldata: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Address>,
    #[serde(
        default,
        rename = "metadataURI",
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens_create2_pre_salt: Option<String>,
}

impl ContractRecord {
    pub fn new<S: Into<String>>(contract_name: S, contract_type: ContractType) -> Self {
        Self {
            contract_name: contract_name.into(),
            contract_type,
            address: None,
            constructor_arguments: None,
            bytecode_hash: None,
            implementation: None,
            proxy_admin: None,
            initializer_calldata: None,
            owner: None,
            metadata_uri: None,
            lens_create2_pre_salt: None,
        }
    }

    pub fn is_deployed(&self) -> bool {
        self.address.is_some()
    }
}

/// Mapping from logical contract name to its record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressBook(BTreeMap<String, ContractRecord>);

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ContractRecord> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ContractRecord> {
        self.0.get_mut(name)
    }

    pub fn address_of(&self, name: &str) -> Option<Address> {
        self.0.get(name).and_then(|r| r.address)
    }

    /// Insert or replace the record stored under `name`.
    pub fn insert<S: Into<String>>(&mut self, name: S, record: ContractRecord) {
        self.0.insert(name.into(), record);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ContractRecord> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a AddressBook {
    type Item = (&'a String, &'a ContractRecord);
    type IntoIter = btree_map::Iter<'a, String, ContractRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, ContractRecord)> for AddressBook {
    fn from_iter<I: IntoIterator<Item = (String, ContractRecord)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;

    #[test]
    fn contract_type_is_persisted_as_index() {
        assert_eq!(serde_json::to_string(&ContractType::Rule).unwrap(), "6");
        assert_eq!(
            serde_json::from_str::<ContractType>("2").unwrap(),
            ContractType::Factory
        );
        assert!(serde_json::from_str::<ContractType>("9").is_err());
    }

    #[test]
    fn contract_type_from_cli() {
        assert_eq!("rule".parse::<ContractType>(), Ok(ContractType::Rule));
        assert_eq!("Aux".parse::<ContractType>(), Ok(ContractType::Aux));
        assert_eq!("8".parse::<ContractType>(), Ok(ContractType::Address));
        assert!("proxy".parse::<ContractType>().is_err());
    }

    #[test]
    fn record_json_shape() {
        let mut r = ContractRecord::new("TransparentUpgradeableProxy", ContractType::Action);
        r.address = Some(address!("0x1000000000000000000000000000000000000001"));
        r.implementation = Some(address!("0x2000000000000000000000000000000000000002"));
        r.constructor_arguments = Some(vec![json!("0xabc"), json!({"a": 1})]);
        r.metadata_uri = Some(String::new());
        r.lens_create2_pre_salt = Some("lens.contract.Foo".into());

        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["contractName"], "TransparentUpgradeableProxy");
        assert_eq!(v["contractType"], 5);
        assert_eq!(v["metadataURI"], "");
        assert_eq!(v["lensCreate2PreSalt"], "lens.contract.Foo");
        assert!(v.get("proxyAdmin").is_none());
        assert!(v.get("bytecodeHash").is_none());

        let back: ContractRecord = serde_json::from_value(v).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn reads_existing_file_format() {
        let raw = r#"{
          "AccountBlockingRule": {
            "contractName": "AccountBlockingRule",
            "contractType": 6,
            "address": "0xf3de16e99679243E36BB449CADEA247Cf61450e1",
            "bytecodeHash": "0100008f54c1a1bb8f1cd1b0d3c5c5aa2f4a1f6e1fa55e8e8b1a4dd4e27b0d11",
            "constructorArguments": []
          }
        }"#;
        let book: AddressBook = serde_json::from_str(raw).unwrap();
        let rec = book.get("AccountBlockingRule").unwrap();
        assert_eq!(rec.contract_type, ContractType::Rule);
        assert_eq!(rec.bytecode_hash.unwrap().words(), 0x8f);
        assert!(book.address_of("AccountBlockingRule").is_some());
        assert!(book.address_of("Missing").is_none());
    }
}
