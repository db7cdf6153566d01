use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which heights a statistics window scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockRange {
    /// `[from, to)`
    HalfOpen,
    /// `[from, to]`
    Inclusive,
}

/// How a statistics window counts transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatisticsMode {
    /// Sum the transaction count of every block in range
    BlockScan,
    /// Subtract the cumulative counters carried by the two samples
    ChainCounter,
}

/// Bounded retry loop: at most `max_attempts` tries, `backoff` apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self { max_attempts, backoff }
    }
}

/// What `verify` does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// No separate verification phase, verify behaves like confirm
    SameAsConfirm,
    /// Light verification: look the transaction up by id with its own retry budget
    Lookup(RetryPolicy),
}

/// Conventions a ledger declares instead of the core guessing them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Added to allocated sequences of contract invocations
    pub invoke_offset: u64,
    /// Added to allocated sequences of transfers
    pub transfer_offset: u64,
    /// Whether the ledger takes client-side sequences at all
    pub uses_client_sequence: bool,
    pub block_range: BlockRange,
    pub statistics: StatisticsMode,
    pub confirm_retry: RetryPolicy,
    pub verify: VerifyMode,
}

/// Ledger families the benchmark knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    Ethereum,
    FiscoBcos,
    Fabric,
    Hyperchain,
    Xuperchain,
}

const DEFAULT_CONFIRM_RETRY: RetryPolicy = RetryPolicy::new(10, Duration::from_millis(100));

impl LedgerKind {
    pub fn policy(self) -> LedgerPolicy {
        let base = LedgerPolicy {
            invoke_offset: 0,
            transfer_offset: 0,
            uses_client_sequence: true,
            block_range: BlockRange::HalfOpen,
            statistics: StatisticsMode::BlockScan,
            confirm_retry: DEFAULT_CONFIRM_RETRY,
            verify: VerifyMode::SameAsConfirm,
        };
        match self {
            // the deploy transaction consumes the observed nonce
            LedgerKind::Ethereum => LedgerPolicy {
                invoke_offset: 1,
                ..base
            },
            LedgerKind::FiscoBcos | LedgerKind::Fabric => base,
            LedgerKind::Hyperchain => LedgerPolicy {
                uses_client_sequence: false,
                statistics: StatisticsMode::ChainCounter,
                verify: VerifyMode::Lookup(RetryPolicy::new(5, Duration::from_millis(200))),
                ..base
            },
            LedgerKind::Xuperchain => LedgerPolicy {
                uses_client_sequence: false,
                block_range: BlockRange::Inclusive,
                ..base
            },
        }
    }
}
