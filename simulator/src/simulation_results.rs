use chrono::{DateTime, Local};
use ledgerbench::ledger::LedgerKind;
use ledgerbench::types::{StatisticSample, Throughput};
use ledgerbench::utils::logging;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::stats::SimulatorStats;
use crate::SimulationError;

/// Parameters the run was started with
#[derive(Debug, Clone, Serialize)]
pub struct RunParameters {
    pub ledger: LedgerKind,
    pub worker_count: u64,
    pub vms_per_worker: u64,
    pub engine_capacity: u64,
    pub ops_per_vm: u64,
    pub ratio_transfers: f64,
    pub confirm: bool,
    pub block_interval: f64,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResults {
    pub parameters: RunParameters,
    pub started_at: DateTime<Local>,
    pub start: StatisticSample,
    pub end: StatisticSample,
    pub throughput: Throughput,
    pub stats: SimulatorStats,
    /// Ledger connections opened across all workers
    pub connections: usize,
}

impl SimulationResults {
    pub fn print(&self) {
        self.stats.print_final_stats();
        println!("SIMULATOR: === Throughput ===");
        println!("SIMULATOR: Heights {} -> {}", self.start.height, self.end.height);
        println!(
            "SIMULATOR: Blocks: {}, Transactions: {}",
            self.throughput.block_count, self.throughput.tx_count
        );
        println!(
            "SIMULATOR: TPS: {:.2}, BPS: {:.2}",
            self.throughput.tx_per_sec, self.throughput.blocks_per_sec
        );
        println!("SIMULATOR: Connections: {}", self.connections);
    }

    /// Writes the results as pretty JSON into `dir` and returns the file path.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf, SimulationError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let file = dir.join(format!("simulation_{}.json", self.started_at.format("%Y%m%d_%H%M%S")));
        fs::write(&file, serde_json::to_string_pretty(self)?)?;
        logging::log("SIMULATOR", &format!("Saved simulation results to {}", file.display()));
        Ok(file)
    }
}
