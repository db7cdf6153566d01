//! Per-run outcome counts and latencies.

use ledgerbench::types::{TxResult, TxStatus};
use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// Statistics Tracking
// ------------------------------------------------------------------------------------------------

/// Outcome counts and mean latencies over every `TxResult` of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulatorStats {
    pub total: u64,
    pub success: u64,
    pub failure: u64,
    pub unknown: u64,
    pub confirmed: u64,
    pub transfers: u64,
    pub invocations: u64,
    /// Sum of `send_time - build_time` over all sent operations, in nanoseconds
    send_latency_total: i64,
    sent: u64,
    /// Sum of `confirm_time - send_time` over confirmed operations, in nanoseconds
    confirm_latency_total: i64,
}

impl SimulatorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &TxResult) {
        self.total += 1;
        match result.status {
            TxStatus::Success => self.success += 1,
            TxStatus::Failure => self.failure += 1,
            TxStatus::Unknown => self.unknown += 1,
            TxStatus::Confirm => self.confirmed += 1,
        }
        if result.label == ledgerbench::types::BUILTIN_TRANSFER_LABEL {
            self.transfers += 1;
        } else {
            self.invocations += 1;
        }
        if result.status != TxStatus::Failure && result.send_time >= result.build_time {
            self.send_latency_total += result.send_time - result.build_time;
            self.sent += 1;
        }
        if result.status == TxStatus::Confirm && result.confirm_time >= result.send_time {
            self.confirm_latency_total += result.confirm_time - result.send_time;
        }
    }

    pub fn merge(&mut self, other: &SimulatorStats) {
        self.total += other.total;
        self.success += other.success;
        self.failure += other.failure;
        self.unknown += other.unknown;
        self.confirmed += other.confirmed;
        self.transfers += other.transfers;
        self.invocations += other.invocations;
        self.send_latency_total += other.send_latency_total;
        self.sent += other.sent;
        self.confirm_latency_total += other.confirm_latency_total;
    }

    /// Mean submit latency in milliseconds
    pub fn mean_send_latency_ms(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        self.send_latency_total as f64 / self.sent as f64 / 1e6
    }

    /// Mean confirmation latency in milliseconds
    pub fn mean_confirm_latency_ms(&self) -> f64 {
        if self.confirmed == 0 {
            return 0.0;
        }
        self.confirm_latency_total as f64 / self.confirmed as f64 / 1e6
    }

    /// Percentage of operations the ledger did not accept
    pub fn failure_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.failure as f64 / self.total as f64 * 100.0
    }

    pub fn print_final_stats(&self) {
        println!("SIMULATOR: === Final Statistics ===");
        println!("SIMULATOR: Total Operations: {}", self.total);
        println!("SIMULATOR: Invocations: {}, Transfers: {}", self.invocations, self.transfers);
        println!(
            "SIMULATOR: Success: {}, Confirm: {}, Unknown: {}, Failure: {} ({:.1}%)",
            self.success,
            self.confirmed,
            self.unknown,
            self.failure,
            self.failure_rate()
        );
        println!("SIMULATOR: Mean Send Latency: {:.3}ms", self.mean_send_latency_ms());
        println!("SIMULATOR: Mean Confirm Latency: {:.3}ms", self.mean_confirm_latency_ms());
    }
}
