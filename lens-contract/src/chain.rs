//! The boundary between the tooling and a blockchain node.

use alloy::{
    network::{ReceiptResponse, TransactionBuilder},
    primitives::{Address, B256, Bytes, TxHash, U256},
    providers::{PendingTransactionError, Provider},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
    transports::TransportError,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::sol_types::IContractDeployer;

/// Address of the zkSync `ContractDeployer` system contract.
pub const ZKSYNC_CONTRACT_DEPLOYER: Address =
    alloy::primitives::address!("0x0000000000000000000000000000000000008006");

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("rpc error: {0}")]
    Rpc(#[from] TransportError),

    #[error("pending transaction error: {0}")]
    Pending(#[from] PendingTransactionError),

    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error("transaction {0} did not create a contract")]
    NotDeployed(TxHash),

    #[error("call reverted: {0}")]
    CallReverted(String),

    #[error("abi error: {0}")]
    Abi(#[from] alloy::sol_types::Error),
}

/// How nonce-based contract addresses are derived on the target chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressDerivation {
    #[default]
    Evm,
    /// Ask the `ContractDeployer` system contract.
    Zksync,
}

/// Everything the deployment tooling needs from a node.
///
/// Writes wait for inclusion and fail if the transaction reverted.
#[async_trait]
pub trait Chain: Send + Sync {
    /// Account paying for plain deployments.
    fn sender(&self) -> Address;

    fn derivation(&self) -> AddressDerivation;

    async fn balance(&self, who: Address) -> Result<U256, ChainError>;

    async fn nonce(&self, who: Address) -> Result<u64, ChainError>;

    async fn code_at(&self, at: Address) -> Result<Bytes, ChainError>;

    async fn storage_at(&self, at: Address, slot: B256) -> Result<B256, ChainError>;

    /// Execute `input` against `to` without committing anything.
    async fn call(&self, from: Address, to: Address, input: Bytes) -> Result<Bytes, ChainError>;

    /// Create a contract from `bytecode` followed by the encoded constructor
    /// arguments and return its address.
    async fn deploy(&self, from: Address, bytecode: Bytes, args: Bytes)
    -> Result<Address, ChainError>;

    async fn send(&self, from: Address, to: Address, input: Bytes) -> Result<TxHash, ChainError>;

    /// Address a contract created by `deployer` at `nonce` will get.
    async fn predict_create_address(
        &self,
        deployer: Address,
        nonce: u64,
    ) -> Result<Address, ChainError>;
}

/// [`Chain`] over an alloy provider whose wallet holds every signer the
/// tooling sends from.
#[derive(Debug, Clone)]
pub struct RpcChain<P> {
    provider: P,
    sender: Address,
    derivation: AddressDerivation,
}

impl<P: Provider> RpcChain<P> {
    pub fn new(provider: P, sender: Address, derivation: AddressDerivation) -> Self {
        Self {
            provider,
            sender,
            derivation,
        }
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<(TxHash, Option<Address>), ChainError> {
        let pending = self.provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();
        info!(%tx_hash, "waiting for tx to be mined");

        let receipt = pending.get_receipt().await?;
        info!(gas_used = %receipt.gas_used, %tx_hash, "tx mined");
        if !receipt.status() {
            return Err(ChainError::Reverted(tx_hash));
        }
        Ok((tx_hash, receipt.contract_address))
    }
}

#[async_trait]
impl<P: Provider> Chain for RpcChain<P> {
    fn sender(&self) -> Address {
        self.sender
    }

    fn derivation(&self) -> AddressDerivation {
        self.derivation
    }

    async fn balance(&self, who: Address) -> Result<U256, ChainError> {
        Ok(self.provider.get_balance(who).await?)
    }

    async fn nonce(&self, who: Address) -> Result<u64, ChainError> {
        Ok(self.provider.get_transaction_count(who).await?)
    }

    async fn code_at(&self, at: Address) -> Result<Bytes, ChainError> {
        Ok(self.provider.get_code_at(at).await?)
    }

    async fn storage_at(&self, at: Address, slot: B256) -> Result<B256, ChainError> {
        let word = self.provider.get_storage_at(at, slot.into()).await?;
        Ok(B256::from(word))
    }

    async fn call(&self, from: Address, to: Address, input: Bytes) -> Result<Bytes, ChainError> {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(input);
        Ok(self.provider.call(tx).await?)
    }

    async fn deploy(
        &self,
        from: Address,
        bytecode: Bytes,
        args: Bytes,
    ) -> Result<Address, ChainError> {
        let mut code = bytecode.to_vec();
        code.extend_from_slice(&args);
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_deploy_code(code);
        let (tx_hash, addr) = self.submit(tx).await?;
        addr.ok_or(ChainError::NotDeployed(tx_hash))
    }

    async fn send(&self, from: Address, to: Address, input: Bytes) -> Result<TxHash, ChainError> {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(input);
        let (tx_hash, _) = self.submit(tx).await?;
        Ok(tx_hash)
    }

    async fn predict_create_address(
        &self,
        deployer: Address,
        nonce: u64,
    ) -> Result<Address, ChainError> {
        match self.derivation {
            AddressDerivation::Evm => Ok(deployer.create(nonce)),
            AddressDerivation::Zksync => {
                let call = IContractDeployer::getNewAddressCreateCall {
                    sender: deployer,
                    senderNonce: U256::from(nonce),
                };
                let out = self
                    .call(deployer, ZKSYNC_CONTRACT_DEPLOYER, call.abi_encode().into())
                    .await?;
                let addr = IContractDeployer::getNewAddressCreateCall::abi_decode_returns(&out)?;
                debug!(%deployer, nonce, %addr, "zksync address derivation");
                Ok(addr)
            }
        }
    }
}
