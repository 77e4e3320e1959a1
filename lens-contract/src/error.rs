use std::fmt::Display;

use alloy::primitives::Address;
use lens_address_book::{FingerprintError, StoreError};
use lens_utils::env::MissingVar;

use crate::{artifacts::ArtifactError, chain::ChainError};

/// Failures of the deployment and upgrade operations.
///
/// Configuration problems are reported before anything is sent, failed
/// preconditions before the first transaction, and failed postconditions
/// after the transactions they check.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    MissingEnv(#[from] MissingVar),

    #[error("{0} not found in address book")]
    MissingRecord(String),

    #[error("address book entry {name} has no {field}")]
    MissingField { name: String, field: &'static str },

    #[error("invalid {name}: {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("{role} on-chain is {onchain}, but the configured signer is {local}")]
    WrongSigner {
        role: String,
        onchain: Address,
        local: Address,
    },

    #[error("balance of {who} is {balance} wei, at least {required} wei required")]
    InsufficientBalance {
        who: Address,
        balance: String,
        required: String,
    },

    #[error("{what} mismatch: expected {expected}, got {actual}")]
    Mismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error("abi error: {0}")]
    Abi(#[from] alloy::sol_types::Error),
}

/// Fail with [`DeployError::Mismatch`] unless `expected == actual`.
pub(crate) fn ensure_eq<T>(what: &str, expected: T, actual: T) -> Result<(), DeployError>
where
    T: PartialEq + Display,
{
    if expected == actual {
        return Ok(());
    }
    Err(DeployError::Mismatch {
        what: what.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}
