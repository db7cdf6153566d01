pub mod config;
pub mod simulation;
pub mod simulation_results;
pub mod stats;

pub use config::{Config, ConfigError};
pub use simulation::{run_simulation, SimulationError};
pub use simulation_results::SimulationResults;
pub use stats::SimulatorStats;
