use ledgerbench::utils::logging;
use ledgerbench::MemoryLedger;
use simulator::{run_simulation, Config, SimulationError};
use std::env;
use std::sync::Arc;

const DEFAULT_CONFIG: &str = "simulator/config.toml";
const RESULTS_DIR: &str = "simulator/results";

// ------------------------------------------------------------------------------------------------
// Main
// ------------------------------------------------------------------------------------------------

/// Loads the configuration, runs one benchmark and saves its results.
///
/// Usage: `simulator [config.toml]`
#[tokio::main]
async fn main() -> Result<(), SimulationError> {
    setup_logging();

    let path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = Config::load(&path)?;
    logging::log("SIMULATOR", &format!("Loaded configuration from {}", path));

    let ledger = Arc::new(MemoryLedger::new(config.memory_ledger_config()));
    let results = run_simulation(&config, ledger).await?;
    results.print();
    results.save(RESULTS_DIR)?;
    Ok(())
}

/// Turns on logging when ENABLE_LOGS is set
fn setup_logging() {
    if env::var("ENABLE_LOGS").is_ok() {
        env::set_var("LEDGERBENCH_LOGGING", "true");
    }
    logging::init_logging();
}
