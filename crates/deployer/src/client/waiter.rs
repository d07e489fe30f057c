use std::time::Duration;

use cofi_primitives::Felt;
use starknet::core::types::{
    ExecutionResult, ReceiptBlock, StarknetError, TransactionFinalityStatus,
    TransactionReceiptWithBlockInfo,
};
use starknet::providers::{Provider, ProviderError};
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, thiserror::Error)]
pub enum TxWaitingError {
    #[error("transaction {0:#x} timed out")]
    Timeout(Felt),

    #[error("transaction {hash:#x} reverted with reason: {reason}")]
    TransactionReverted { hash: Felt, reason: String },

    #[error(transparent)]
    Provider(ProviderError),
}

/// Utility for waiting on a transaction.
///
/// The waiter polls for the transaction receipt every `interval` until it achieves the desired
/// status or until `timeout` is reached.
///
/// The waiter can be configured to wait for a specific finality status (e.g, `ACCEPTED_ON_L2`),
/// by default, it only waits until the transaction is included in the _pending_ block. Unless
/// [`TxWaiter::allow_reverted`] is used, a reverted transaction is reported as an error.
///
/// # Examples
///
/// ```ignore
/// let receipt = TxWaiter::new(tx_hash, &provider)
///     .with_tx_status(TransactionFinalityStatus::AcceptedOnL2)
///     .wait()
///     .await?;
/// ```
#[must_use = "TxWaiter does nothing unless waited on"]
pub struct TxWaiter<'a, P> {
    /// The hash of the transaction to wait for.
    tx_hash: Felt,
    /// The transaction finality status to wait for.
    ///
    /// If not set, then it will wait until the transaction is included in a block, pending or
    /// not.
    tx_finality_status: Option<TransactionFinalityStatus>,
    /// Whether a `REVERTED` execution result is an error.
    must_succeed: bool,
    /// Delay between two receipt requests.
    interval: Duration,
    /// The maximum amount of time to wait for the transaction to achieve the desired status.
    timeout: Duration,
    provider: &'a P,
}

impl<'a, P> TxWaiter<'a, P>
where
    P: Provider + Sync,
{
    /// The inclusion (which can be accepted or reverted) is ~5 seconds in ideal cases. Public
    /// networks under load can take considerably longer.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
    /// Interval for use with 3rd party provider without burning the API rate limit.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2500);

    pub fn new(tx_hash: Felt, provider: &'a P) -> Self {
        Self {
            tx_hash,
            provider,
            must_succeed: true,
            tx_finality_status: None,
            timeout: Self::DEFAULT_TIMEOUT,
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    pub fn with_tx_status(self, status: TransactionFinalityStatus) -> Self {
        Self { tx_finality_status: Some(status), ..self }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn allow_reverted(self) -> Self {
        Self { must_succeed: false, ..self }
    }

    pub async fn wait(self) -> Result<TransactionReceiptWithBlockInfo, TxWaitingError> {
        let started_at = Instant::now();

        loop {
            match self.provider.get_transaction_receipt(self.tx_hash).await {
                Ok(receipt) => {
                    let status = self.tx_finality_status;
                    if let Some(result) = evaluate_receipt(receipt, status, self.must_succeed) {
                        return result;
                    }
                }

                Err(ProviderError::StarknetError(StarknetError::TransactionHashNotFound)) => {
                    trace!(
                        target: "rpc",
                        tx_hash = format!("{:#x}", self.tx_hash),
                        "Transaction not found yet."
                    );
                }

                Err(e) => return Err(TxWaitingError::Provider(e)),
            }

            if started_at.elapsed() > self.timeout {
                return Err(TxWaitingError::Timeout(self.tx_hash));
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

// Decides whether the receipt satisfies the waiter's parameters. `None` means keep polling.
fn evaluate_receipt(
    receipt: TransactionReceiptWithBlockInfo,
    expected_status: Option<TransactionFinalityStatus>,
    must_succeed: bool,
) -> Option<Result<TransactionReceiptWithBlockInfo, TxWaitingError>> {
    if let Some(expected) = expected_status {
        // pending receipts can't be checked against a finality status.
        if matches!(receipt.block, ReceiptBlock::Pending) {
            return None;
        }

        let reached = match receipt.receipt.finality_status() {
            TransactionFinalityStatus::AcceptedOnL1 => true,
            TransactionFinalityStatus::AcceptedOnL2 => {
                expected == TransactionFinalityStatus::AcceptedOnL2
            }
        };

        if !reached {
            return None;
        }
    }

    if !must_succeed {
        return Some(Ok(receipt));
    }

    match receipt.receipt.execution_result() {
        ExecutionResult::Succeeded => Some(Ok(receipt)),
        ExecutionResult::Reverted { reason } => Some(Err(TxWaitingError::TransactionReverted {
            hash: *receipt.receipt.transaction_hash(),
            reason: reason.clone(),
        })),
    }
}
