//! Orchestrator - configuration, worker threads and run validation
//!
//! See `engine.rs` for the threading model and `validator.rs` for how a
//! concurrent run is checked against its sequential replay.

pub mod config;
pub mod driver;
pub mod engine;
pub mod validator;

// Re-export main types for convenience
pub use config::{
    ConfigError, RunPlan, Scenario, ScenarioParams, SimulationConfig, DEFAULT_YIELD_PERCENT,
    REDUCED_NUM_COMMANDS,
};
pub use driver::{Worker, WorkerSummary};
pub use engine::{RunOutcome, Simulation, SimulationError};
pub use validator::{
    compare_runs, run_and_validate, run_and_validate_with, RunSummary, Validated, ValidationReport,
};
