use serde::{Deserialize, Serialize};

/// Ledger height and local time captured at one instant of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticSample {
    pub height: u64,
    /// Nanoseconds on the process-wide monotonic clock
    pub timestamp: i64,
    /// Cumulative transaction counter, for ledgers that report one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_count: Option<u64>,
}

impl StatisticSample {
    pub fn new(height: u64, timestamp: i64) -> Self {
        Self {
            height,
            timestamp,
            tx_count: None,
        }
    }

    pub fn with_tx_count(mut self, tx_count: u64) -> Self {
        self.tx_count = Some(tx_count);
        self
    }
}

/// Throughput report for one measured window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    pub start: i64,
    pub end: i64,
    pub block_count: u64,
    pub tx_count: u64,
    pub tx_per_sec: f64,
    pub blocks_per_sec: f64,
}
