use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::types::{Contract, ContractSource, CorrelationId, Credential, Payload};

pub mod memory;
pub mod policy;
pub mod pool;

pub use memory::{MemoryLedger, MemoryLedgerConfig};
pub use policy::{BlockRange, LedgerKind, LedgerPolicy, RetryPolicy, StatisticsMode, VerifyMode};
pub use pool::ConnectionPool;


#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger unreachable: {0}")]
    Unreachable(String),
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(CorrelationId),
    #[error("Block not found at height {0}")]
    BlockNotFound(u64),
    #[error("Failed to decode return value of {label}: {reason}")]
    Decode { label: String, reason: String },
    #[error("Invalid contract: {0}")]
    InvalidContract(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Final record of an accepted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub correlation_id: CorrelationId,
    /// Raw return data, decoded through `LedgerAdapter::decode_return`
    pub ret: Vec<u8>,
    pub block_height: u64,
}

/// Ledger-side view of a transaction returned by `query_by_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInfo {
    pub correlation_id: CorrelationId,
    pub block_height: u64,
    /// Commit time of the including block, when the ledger reports one
    pub block_write_time: Option<i64>,
}

/// Narrow contract between the benchmark core and one ledger SDK.
///
/// Implementations own transport, encoding and signing, and must be safe to share
/// between every client instance of a worker (`Arc<dyn LedgerAdapter>`).
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Conventions this ledger follows (sequence offsets, block ranges, retries)
    fn policy(&self) -> LedgerPolicy;

    /// Build, sign and submit one transaction tagged with `sequence`.
    /// `None` lets the ledger order the transaction itself.
    async fn build_and_submit(&self, sequence: Option<u64>, payload: &Payload) -> Result<CorrelationId, LedgerError>;

    /// Receipt of a submitted transaction; `Ok(None)` while it is not (yet) found
    async fn poll_receipt(&self, id: &CorrelationId) -> Result<Option<Receipt>, LedgerError>;

    /// Look a transaction up by id
    async fn query_by_id(&self, id: &CorrelationId) -> Result<TxInfo, LedgerError>;

    /// Current ledger height
    async fn query_height(&self) -> Result<u64, LedgerError>;

    /// Number of transactions in the block at `height`
    async fn block_tx_count(&self, height: u64) -> Result<u64, LedgerError>;

    /// Cumulative transaction counter, for ledgers that keep one
    async fn query_tx_count(&self) -> Result<Option<u64>, LedgerError> {
        Ok(None)
    }

    /// Next usable sequence of `signer`, observed once when an instance starts
    async fn pending_nonce(&self, signer: &Credential) -> Result<u64, LedgerError>;

    /// Deploy a contract and return its handle
    async fn deploy(&self, source: &ContractSource, deployer: &Credential) -> Result<Contract, LedgerError>;

    /// Check a contract received from another instance before it is used
    fn prepare_contract(&self, contract: &Contract) -> Result<(), LedgerError>;

    /// Create a fresh signing credential
    fn new_credential(&self) -> Result<Credential, LedgerError>;

    /// Decode the raw return data of the function `label`
    fn decode_return(&self, label: &str, raw: &[u8]) -> Result<Vec<Value>, LedgerError>;
}

/// Polls `attempt` until it yields a value or the retry budget runs out.
///
/// Sleeps `policy.backoff` between attempts and never more than `max_attempts` times.
/// Errors and `None` both count as a miss; the last error is returned if every
/// attempt failed.
pub(crate) async fn poll_with_retry<T, F, Fut>(policy: RetryPolicy, mut attempt: F) -> Result<Option<T>, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>, LedgerError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;
    for i in 0..attempts {
        match attempt().await {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => last_error = None,
            Err(e) => last_error = Some(e),
        }
        if i + 1 < attempts && policy.backoff > Duration::ZERO {
            tokio::time::sleep(policy.backoff).await;
        }
    }
    match last_error {
        Some(e) => Err(e),
        None => Ok(None),
    }
}
