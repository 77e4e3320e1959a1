use alloy::primitives::Bytes;
use bon::Builder;
use lens_address_book::ContractType;
use serde_json::Value;

/// A contract to deploy or upgrade.
#[derive(Debug, Clone, Builder)]
pub struct Target {
    /// Artifact to deploy.
    #[builder(into)]
    pub contract_name: String,

    pub contract_type: ContractType,

    /// Address book key, if it differs from the artifact name.
    #[builder(into)]
    pub name: Option<String>,

    #[builder(default)]
    pub constructor_arguments: Vec<Value>,

    /// Calldata executed by a proxy during its construction.
    #[builder(into)]
    pub initializer: Option<Bytes>,
}

impl Target {
    pub fn new<S: Into<String>>(contract_name: S, contract_type: ContractType) -> Self {
        Self::builder()
            .contract_name(contract_name)
            .contract_type(contract_type)
            .build()
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.constructor_arguments = args;
        self
    }

    /// Key of the record in the address book.
    pub fn logical_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.contract_name)
    }

    /// Key of the implementation record of a proxied or beacon-backed
    /// contract.
    pub fn impl_name(&self) -> String {
        format!("{}Impl", self.logical_name())
    }

    pub fn beacon_name(&self) -> String {
        format!("{}Beacon", self.logical_name())
    }
}
