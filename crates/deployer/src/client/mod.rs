//! The chain client seam.
//!
//! Everything the deployer needs from the chain goes through [`ChainClient`]. The production
//! implementation is [`StarknetClient`], which signs with a single-owner account over JSON-RPC.

use async_trait::async_trait;
use cofi_primitives::fee::TxVersion;
use cofi_primitives::Felt;
use starknet::providers::ProviderError;

use crate::artifact::ContractArtifact;
use crate::batch::DeployCall;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
mod rpc;
mod waiter;

pub use rpc::StarknetClient;
pub use waiter::{TxWaiter, TxWaitingError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("account error: {0}")]
    Account(String),

    #[error("{kind} transactions cannot be sent as {version}")]
    UnsupportedVersion { kind: &'static str, version: TxVersion },

    #[error("invalid entrypoint name '{0}'")]
    InvalidEntrypoint(String),

    #[error(transparent)]
    Waiting(#[from] TxWaitingError),
}

/// Result of a submitted declare transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclareResult {
    pub transaction_hash: Felt,
    pub class_hash: Felt,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the account signing the transactions.
    fn account_address(&self) -> Felt;

    /// Returns whether a class with the given hash is declared.
    async fn is_declared(&self, class_hash: Felt) -> Result<bool, ClientError>;

    /// Submits a declare transaction for the artifact's class.
    async fn declare(
        &self,
        artifact: &ContractArtifact,
        version: TxVersion,
    ) -> Result<DeclareResult, ClientError>;

    /// Submits all `calls` as a single multicall transaction and returns its hash.
    async fn execute(&self, calls: &[DeployCall], version: TxVersion) -> Result<Felt, ClientError>;

    /// Blocks until the transaction is accepted. Reverted transactions are errors.
    async fn wait_for_transaction(&self, transaction_hash: Felt) -> Result<(), ClientError>;

    /// Calls a view entrypoint.
    async fn call(
        &self,
        contract_address: Felt,
        entrypoint: &str,
        calldata: &[Felt],
    ) -> Result<Vec<Felt>, ClientError>;
}
