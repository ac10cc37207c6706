//! Workload generation
//!
//! Turns a [`WorkloadConfig`] into one deterministic action stream per
//! worker. All generation is deterministic based on the run seed.
//!
//! # Key Principles
//!
//! 1. **Determinism**: same seed + same config → same actions per stream
//! 2. **Replayability**: the one-worker schedule executes the same multiset
//!    of actions, period by period, as any supported worker count
//! 3. **No shared state**: each generator owns its streams outright

pub mod action;
pub mod config;
pub mod generator;

pub use action::{Action, ActionKind};
pub use config::{ActionControl, AmountDistribution, WorkloadConfig, COMMANDS_PER_REPORT, MAX_WORKERS};
pub use generator::{stream_seed, WorkerState, WorkloadGenerator};
