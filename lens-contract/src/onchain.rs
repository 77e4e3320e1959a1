//! Read-only views of deployed contracts.

use alloy::{
    primitives::{Address, B256, U256, b256},
    sol_types::SolCall,
};
use lens_address_book::BytecodeHash;
use tracing::debug;

use crate::{
    chain::{AddressDerivation, Chain, ChainError},
    error::DeployError,
    sol_types::{IBeacon, IMetadataBased},
};

/// `bytes32(uint256(keccak256("eip1967.proxy.admin")) - 1)`
pub const EIP1967_ADMIN_SLOT: B256 =
    b256!("0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// `bytes32(uint256(keccak256("eip1967.proxy.implementation")) - 1)`
pub const EIP1967_IMPLEMENTATION_SLOT: B256 =
    b256!("0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// Storage slot of the beacon's default version.
///
/// The beacon exposes no getter for it, so this depends on the contract's
/// storage layout and must follow any change to it.
pub const BEACON_DEFAULT_VERSION_SLOT: B256 = B256::with_last_byte(1);

/// Call a view function from the default sender and decode its return.
pub async fn view<C, T>(chain: &C, to: Address, call: T) -> Result<T::Return, ChainError>
where
    C: Chain + ?Sized,
    T: SolCall + Send,
{
    let out = chain
        .call(chain.sender(), to, call.abi_encode().into())
        .await?;
    Ok(T::abi_decode_returns(&out)?)
}

pub async fn proxy_admin<C: Chain + ?Sized>(chain: &C, proxy: Address) -> Result<Address, ChainError> {
    let word = chain.storage_at(proxy, EIP1967_ADMIN_SLOT).await?;
    Ok(Address::from_word(word))
}

pub async fn proxy_implementation<C: Chain + ?Sized>(
    chain: &C,
    proxy: Address,
) -> Result<Address, ChainError> {
    let word = chain.storage_at(proxy, EIP1967_IMPLEMENTATION_SLOT).await?;
    Ok(Address::from_word(word))
}

pub async fn beacon_owner<C: Chain + ?Sized>(chain: &C, beacon: Address) -> Result<Address, ChainError> {
    view(chain, beacon, IBeacon::ownerCall {}).await
}

/// Implementation of the beacon's default version.
pub async fn beacon_implementation<C: Chain + ?Sized>(
    chain: &C,
    beacon: Address,
) -> Result<Address, ChainError> {
    view(chain, beacon, IBeacon::implementationCall {}).await
}

pub async fn beacon_default_version<C: Chain + ?Sized>(
    chain: &C,
    beacon: Address,
) -> Result<U256, ChainError> {
    let word = chain.storage_at(beacon, BEACON_DEFAULT_VERSION_SLOT).await?;
    let version = U256::from_be_bytes(word.0);
    debug!(%beacon, %version, slot = %BEACON_DEFAULT_VERSION_SLOT, "beacon default version read from storage");
    Ok(version)
}

pub async fn owner_of<C: Chain + ?Sized>(chain: &C, at: Address) -> Result<Address, ChainError> {
    view(chain, at, IMetadataBased::ownerCall {}).await
}

pub async fn metadata_uri_of<C: Chain + ?Sized>(chain: &C, at: Address) -> Result<String, ChainError> {
    view(chain, at, IMetadataBased::getMetadataURICall {}).await
}

/// Whether deployed code equals the artifact bytecode. On EVM chains the
/// constructor patches immutables into the runtime code, so only zkSync
/// code can be compared with an artifact.
pub fn code_matches_artifacts<C: Chain + ?Sized>(chain: &C) -> bool {
    chain.derivation() == AddressDerivation::Zksync
}

/// Fingerprint of the code currently deployed at `at`.
pub async fn code_fingerprint<C: Chain + ?Sized>(
    chain: &C,
    at: Address,
) -> Result<BytecodeHash, DeployError> {
    let code = chain.code_at(at).await?;
    let hash = BytecodeHash::of(&code)?;
    debug!(%at, words = hash.words(), fingerprint = %hash, "on-chain code fingerprint");
    Ok(hash)
}
