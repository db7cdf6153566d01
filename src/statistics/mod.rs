//! Throughput of a measured window between two ledger samples.

use futures::stream::{self, StreamExt, TryStreamExt};
use thiserror::Error;

use crate::ledger::{BlockRange, LedgerAdapter, LedgerError, StatisticsMode};
use crate::types::{StatisticSample, Throughput};
use crate::utils::clock;


/// Per-block queries kept in flight while scanning a window
const SCAN_CONCURRENCY: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatisticsError {
    /// Throughput over a zero or negative duration is undefined
    #[error("Degenerate statistics window: start {start}ns, end {end}ns")]
    DegenerateWindow { start: i64, end: i64 },
    #[error("Sample at height {height} carries no transaction counter")]
    MissingCounter { height: u64 },
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Captures the current height and time (and the tx counter when the ledger keeps one).
pub async fn sample(adapter: &dyn LedgerAdapter) -> Result<StatisticSample, LedgerError> {
    let height = adapter.query_height().await?;
    let timestamp = clock::now_nanos();
    let sample = StatisticSample::new(height, timestamp);
    Ok(match adapter.query_tx_count().await? {
        Some(count) => sample.with_tx_count(count),
        None => sample,
    })
}

/// Block count, transaction count and rates for a pair of counts over a duration.
pub fn throughput(
    from: &StatisticSample,
    to: &StatisticSample,
    block_count: u64,
    tx_count: u64,
) -> Result<Throughput, StatisticsError> {
    let duration = to.timestamp.saturating_sub(from.timestamp);
    if duration <= 0 {
        return Err(StatisticsError::DegenerateWindow {
            start: from.timestamp,
            end: to.timestamp,
        });
    }
    let duration = duration as f64;
    Ok(Throughput {
        start: from.timestamp,
        end: to.timestamp,
        block_count,
        tx_count,
        tx_per_sec: tx_count as f64 * 1e9 / duration,
        blocks_per_sec: block_count as f64 * 1e9 / duration,
    })
}

/// Window between two samples, measured under the adapter's declared conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsWindow {
    pub from: StatisticSample,
    pub to: StatisticSample,
}

impl StatisticsWindow {
    pub fn new(from: StatisticSample, to: StatisticSample) -> Self {
        Self { from, to }
    }

    /// Heights covered by the window. Empty when `from` is above `to`.
    pub fn heights(&self, range: BlockRange) -> std::ops::Range<u64> {
        let (from, to) = (self.from.height, self.to.height);
        match range {
            BlockRange::HalfOpen if from < to => from..to,
            BlockRange::Inclusive if from <= to => from..to.saturating_add(1),
            _ => from..from,
        }
    }

    pub fn duration_nanos(&self) -> i64 {
        self.to.timestamp.saturating_sub(self.from.timestamp)
    }

    /// Queries the adapter and reduces the window to a throughput report.
    pub async fn compute(&self, adapter: &dyn LedgerAdapter) -> Result<Throughput, StatisticsError> {
        if self.duration_nanos() <= 0 {
            return Err(StatisticsError::DegenerateWindow {
                start: self.from.timestamp,
                end: self.to.timestamp,
            });
        }
        let policy = adapter.policy();
        let heights = self.heights(policy.block_range);
        let block_count = heights.end - heights.start;

        let tx_count = match policy.statistics {
            StatisticsMode::BlockScan => {
                stream::iter(heights)
                    .map(|height| adapter.block_tx_count(height))
                    .buffered(SCAN_CONCURRENCY)
                    .try_fold(0u64, |total, count| async move { Ok(total.saturating_add(count)) })
                    .await?
            }
            StatisticsMode::ChainCounter => {
                let start = self
                    .from
                    .tx_count
                    .ok_or(StatisticsError::MissingCounter { height: self.from.height })?;
                let end = self
                    .to
                    .tx_count
                    .ok_or(StatisticsError::MissingCounter { height: self.to.height })?;
                end.saturating_sub(start)
            }
        };

        let report = throughput(&self.from, &self.to, block_count, tx_count)?;
        tracing::debug!(
            "Window {}..{}: {} blocks, {} txs, {:.2} tx/s",
            self.from.height, self.to.height, report.block_count, report.tx_count, report.tx_per_sec
        );
        Ok(report)
    }
}
