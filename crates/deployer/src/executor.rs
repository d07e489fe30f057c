//! Submission of deploy call batches.
//!
//! All calls are first sent together as a single multicall. Because a multicall is atomic, a
//! single failing call makes the whole transaction fail. When that happens the batch is split in
//! two halves, the first one holding `ceil(n / 2)` calls, and each half is retried on its own.
//! Splitting stops at single calls: a call that still fails on its own is reported in the
//! [`BatchReport`] as a permanent failure.
//!
//! Halves are retried sequentially, first half first, and without any backoff. For `n` calls the
//! recursion is at most `ceil(log2(n))` levels deep.
//!
//! Only definite failures are bisected: a transaction rejected on submission or one whose receipt
//! says it reverted. A transaction that was sent but could not be confirmed, because waiting timed
//! out or the node errored, may still be included. Its calls are not resent and execution stops
//! there, see [`BatchReport::unconfirmed`].

use cofi_primitives::fee::TxVersion;
use cofi_primitives::Felt;
use tracing::{debug, error, info, warn};

use crate::batch::DeployCall;
use crate::client::{ChainClient, ClientError, TxWaitingError};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct ExecutorOptions {
    pub version: TxVersion,
    /// Wait for every transaction to be accepted. A reverted transaction counts as a failure.
    pub wait: bool,
}

/// A call that failed even when sent on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    /// Index of the call in the executed batch.
    pub index: usize,
    pub reason: String,
}

/// A transaction that was sent but whose outcome is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnconfirmedTransaction {
    pub transaction_hash: Felt,
    /// Indices of the calls the transaction carries.
    pub calls: Vec<usize>,
    pub reason: String,
}

/// Outcome of executing a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Indices of the calls that were included in a successful transaction, in ascending order.
    pub succeeded: Vec<usize>,
    /// Calls that permanently failed, in ascending index order.
    pub failed: Vec<CallFailure>,
    /// Hashes of the successful transactions, in submission order.
    pub transactions: Vec<Felt>,
    /// Number of transactions attempted, including the failed ones.
    pub attempts: usize,
    /// Deepest bisection level reached. `0` if the whole batch went through at once.
    pub max_depth: usize,
    /// The transaction execution stopped at, if one couldn't be confirmed.
    pub unconfirmed: Option<UnconfirmedTransaction>,
    /// Calls never sent because execution stopped at an unconfirmed transaction, in ascending
    /// order.
    pub not_sent: Vec<usize>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.unconfirmed.is_none()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed.iter().map(|failure| failure.index).collect()
    }

    /// Returns an error describing the unconfirmed transaction or listing the failed calls, if
    /// any.
    pub fn ensure_success(&self) -> Result<()> {
        if let Some(unconfirmed) = &self.unconfirmed {
            return Err(Error::TransactionUnconfirmed {
                transaction_hash: unconfirmed.transaction_hash,
                calls: unconfirmed.calls.clone(),
                not_sent: self.not_sent.clone(),
                reason: unconfirmed.reason.clone(),
            });
        }

        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(Error::CallsFailed { failed: self.failed_indices() })
        }
    }
}

/// Result of sending one sub-batch.
enum Attempt {
    Accepted(Felt),
    /// None of the calls took effect.
    Failed(ClientError),
    /// The transaction was sent but its outcome is unknown.
    Unconfirmed { transaction_hash: Felt, error: ClientError },
}

pub struct BatchExecutor<'a, C: ?Sized> {
    client: &'a C,
    options: ExecutorOptions,
}

impl<'a, C> BatchExecutor<'a, C>
where
    C: ChainClient + ?Sized,
{
    pub fn new(client: &'a C, options: ExecutorOptions) -> Self {
        Self { client, options }
    }

    /// Executes all `calls`, bisecting on failure.
    ///
    /// Fails with [`Error::EmptyBatch`] without touching the chain if `calls` is empty. Failing
    /// calls and unconfirmed transactions are not an error of this function; check the returned
    /// report.
    pub async fn execute_all(&self, calls: &[DeployCall]) -> Result<BatchReport> {
        if calls.is_empty() {
            return Err(Error::EmptyBatch);
        }

        info!(
            target: "executor",
            calls = calls.len(),
            version = %self.options.version,
            "Executing batch."
        );

        let mut report = BatchReport::default();
        // (start, end, depth), popped in order so that the first half is always tried first.
        let mut pending = vec![(0, calls.len(), 0)];

        while let Some((start, end, depth)) = pending.pop() {
            report.attempts += 1;
            report.max_depth = report.max_depth.max(depth);

            match self.submit(&calls[start..end]).await {
                Attempt::Accepted(tx_hash) => {
                    debug!(
                        target: "executor",
                        start,
                        end,
                        depth,
                        tx_hash = format!("{tx_hash:#x}"),
                        "Sub-batch succeeded."
                    );
                    report.succeeded.extend(start..end);
                    report.transactions.push(tx_hash);
                }

                Attempt::Failed(error) if end - start == 1 => {
                    warn!(target: "executor", index = start, %error, "Call failed permanently.");
                    report.failed.push(CallFailure { index: start, reason: error.to_string() });
                }

                Attempt::Failed(error) => {
                    let mid = start + (end - start).div_ceil(2);
                    debug!(
                        target: "executor",
                        start,
                        end,
                        depth,
                        %error,
                        "Sub-batch failed, splitting."
                    );
                    pending.push((mid, end, depth + 1));
                    pending.push((start, mid, depth + 1));
                }

                Attempt::Unconfirmed { transaction_hash, error } => {
                    error!(
                        target: "executor",
                        start,
                        end,
                        tx_hash = format!("{transaction_hash:#x}"),
                        %error,
                        "Transaction could not be confirmed, stopping."
                    );
                    report.unconfirmed = Some(UnconfirmedTransaction {
                        transaction_hash,
                        calls: (start..end).collect(),
                        reason: error.to_string(),
                    });
                    report.not_sent =
                        pending.drain(..).flat_map(|(from, to, _)| from..to).collect();
                    report.not_sent.sort_unstable();
                    break;
                }
            }
        }

        if report.is_success() {
            info!(target: "executor", transactions = report.transactions.len(), "Batch executed.");
        } else {
            warn!(
                target: "executor",
                succeeded = report.succeeded.len(),
                failed = ?report.failed_indices(),
                not_sent = report.not_sent.len(),
                "Batch executed with failures."
            );
        }

        Ok(report)
    }

    async fn submit(&self, calls: &[DeployCall]) -> Attempt {
        let transaction_hash = match self.client.execute(calls, self.options.version).await {
            Ok(hash) => hash,
            Err(error) => return Attempt::Failed(error),
        };

        if !self.options.wait {
            return Attempt::Accepted(transaction_hash);
        }

        match self.client.wait_for_transaction(transaction_hash).await {
            Ok(()) => Attempt::Accepted(transaction_hash),
            Err(error @ ClientError::Waiting(TxWaitingError::TransactionReverted { .. })) => {
                Attempt::Failed(error)
            }
            Err(error) => Attempt::Unconfirmed { transaction_hash, error },
        }
    }
}
