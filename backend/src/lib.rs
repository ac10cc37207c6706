//! Bank Simulator Core - Rust Engine
//!
//! Concurrent bank ledger simulator with deterministic workloads and
//! replay-based validation.
//!
//! # Architecture
//!
//! - **models**: Ledger types (Bank, Branch, Account) and the report engine
//! - **teller**: Deposit, withdraw and transfer under fine-grained locks
//! - **workload**: Deterministic per-worker action generation
//! - **orchestrator**: Configuration, worker threads and run validation
//! - **sync**: Cyclic barrier and yield injection
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All money values are i64
//! 2. All randomness is deterministic (seeded RNG)
//! 3. Locks are always taken account → branch, same-kind pairs ascending

// Module declarations
pub mod models;
pub mod orchestrator;
pub mod rng;
pub mod sync;
pub mod teller;
pub mod workload;

// Re-exports for convenience
pub use models::{
    AccountNumber, Amount, Bank, BranchId, LedgerConfig, LedgerError, LedgerSnapshot, Mismatch,
    ReportConfig, ReportEntry, ReportError, TransferRecord,
};
pub use orchestrator::{
    RunOutcome, RunSummary, Scenario, Simulation, SimulationConfig, SimulationError,
};
pub use rng::RngManager;
pub use teller::TellerError;
pub use workload::{Action, WorkloadConfig, WorkloadGenerator};
