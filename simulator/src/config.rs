//! Configuration loader and validator for the benchmark simulator.

use ledgerbench::ledger::{LedgerKind, MemoryLedgerConfig};
use ledgerbench::ClientOptions;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// Configuration Structs
// ------------------------------------------------------------------------------------------------

/// Everything one benchmark run needs
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub topology_config: TopologyConfig,
    pub ledger_config: LedgerConfig,
    pub transaction_config: TransactionConfig,
}

/// Placement of workers and VMs
#[derive(Debug, Deserialize, Clone)]
pub struct TopologyConfig {
    /// Number of worker tasks
    pub worker_count: u64,
    /// VMs started by every worker
    pub vms_per_worker: u64,
    /// Sequence budget of the whole run, split evenly between workers
    pub engine_capacity: u64,
}

/// The in-process ledger the run drives
#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    pub kind: LedgerKind,
    /// Seconds between sealed blocks
    pub block_interval: f64,
    /// Transactions per block, 0 for unbounded
    #[serde(default)]
    pub max_block_size: usize,
    /// Accounts in the key store, named "0", "1", ...
    pub num_accounts: usize,
    /// VMs sharing one ledger connection
    #[serde(default = "default_vms_per_connection")]
    pub vms_per_connection: u64,
}

fn default_vms_per_connection() -> u64 {
    100
}

/// What every VM sends
#[derive(Debug, Deserialize, Clone)]
pub struct TransactionConfig {
    /// Operations issued by each VM
    pub ops_per_vm: u64,
    /// Share of operations that are transfers instead of contract calls (0.0 - 1.0)
    pub ratio_transfers: f64,
    /// Confirm every operation right after sending it
    #[serde(default)]
    pub confirm: bool,
    #[serde(default = "default_transfer_amount")]
    pub transfer_amount: i64,
}

fn default_transfer_amount() -> i64 {
    1
}

// ------------------------------------------------------------------------------------------------
// Error Types and Validation
// ------------------------------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

fn validate_topology(topology: &TopologyConfig) -> Result<(), ConfigError> {
    if topology.worker_count == 0 {
        return Err(ConfigError::ValidationError("Worker count must be positive".into()));
    }
    if topology.vms_per_worker == 0 {
        return Err(ConfigError::ValidationError("VMs per worker must be positive".into()));
    }
    if topology.engine_capacity % topology.worker_count != 0 {
        return Err(ConfigError::ValidationError(format!(
            "Engine capacity {} must be a multiple of the worker count {}",
            topology.engine_capacity, topology.worker_count
        )));
    }
    let per_worker = topology.engine_capacity / topology.worker_count;
    if topology.vms_per_worker > per_worker {
        return Err(ConfigError::ValidationError(format!(
            "{} VMs per worker exceed the per-worker capacity {}",
            topology.vms_per_worker, per_worker
        )));
    }
    Ok(())
}

fn validate_ledger(ledger: &LedgerConfig) -> Result<(), ConfigError> {
    if !ledger.block_interval.is_finite() || ledger.block_interval <= 0.0 {
        return Err(ConfigError::ValidationError("Block interval must be a positive number".into()));
    }
    if ledger.num_accounts == 0 {
        return Err(ConfigError::ValidationError("Number of accounts must be positive".into()));
    }
    Ok(())
}

fn validate_transactions(transactions: &TransactionConfig) -> Result<(), ConfigError> {
    if transactions.ops_per_vm == 0 {
        return Err(ConfigError::ValidationError("Operations per VM must be positive".into()));
    }
    if !(0.0..=1.0).contains(&transactions.ratio_transfers) {
        return Err(ConfigError::ValidationError("Ratio transfers must be between 0 and 1".into()));
    }
    if transactions.transfer_amount < 0 {
        return Err(ConfigError::ValidationError("Transfer amount must not be negative".into()));
    }
    Ok(())
}

// ------------------------------------------------------------------------------------------------
// Configuration Implementation Methods
// ------------------------------------------------------------------------------------------------

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(path)?;
        Self::parse(&config_str)
    }

    pub fn parse(config_str: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_topology(&self.topology_config)?;
        validate_ledger(&self.ledger_config)?;
        validate_transactions(&self.transaction_config)?;
        // account "0" signs invocations, transfers need a sender of their own
        if self.transaction_config.ratio_transfers > 0.0 && self.ledger_config.num_accounts < 2 {
            return Err(ConfigError::ValidationError("Transfers need at least 2 accounts".into()));
        }
        Ok(())
    }

    pub fn block_interval(&self) -> Duration {
        Duration::from_secs_f64(self.ledger_config.block_interval)
    }

    pub fn memory_ledger_config(&self) -> MemoryLedgerConfig {
        MemoryLedgerConfig {
            kind: self.ledger_config.kind,
            block_interval: self.block_interval(),
            max_block_size: self.ledger_config.max_block_size,
            policy_override: None,
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            confirm: self.transaction_config.confirm,
            ..ClientOptions::default()
        }
    }

    /// Total operations of the run
    pub fn total_operations(&self) -> u64 {
        self.topology_config.worker_count
            * self.topology_config.vms_per_worker
            * self.transaction_config.ops_per_vm
    }
}
