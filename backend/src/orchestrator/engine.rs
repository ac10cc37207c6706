//! Simulation engine
//!
//! Builds a bank from a resolved [`RunPlan`] and drives it with one worker
//! per OS thread.
//!
//! # Architecture
//!
//! ```text
//! SimulationConfig ──resolve──► RunPlan ──► Bank (shared, borrowed)
//!                                   │
//!                                   └──► WorkloadGenerator × N ──► Worker × N (scoped threads)
//!                                                                     │
//!                                            join ◄───────────────────┘
//!                                              │
//!                                         RunOutcome
//! ```
//!
//! Workers borrow the bank through `std::thread::scope`, so nothing is
//! reference counted and the bank is handed back intact once every thread
//! has joined.
//!
//! # Example
//!
//! ```
//! use bank_simulator_core::orchestrator::{Scenario, Simulation, SimulationConfig};
//!
//! let config = SimulationConfig::new(Scenario::HighContention)
//!     .with_reduced_workload(true)
//!     .with_workers(2)
//!     .with_seed(42);
//! let simulation = Simulation::new(&config).unwrap();
//! let outcome = simulation.run().unwrap();
//! assert_eq!(outcome.summaries.len(), 2);
//! assert!(outcome.bank.validate().is_ok());
//! ```

use crate::models::{Amount, Bank, LedgerError, ReportError};
use crate::orchestrator::config::{ConfigError, RunPlan, SimulationConfig};
use crate::orchestrator::driver::{Worker, WorkerSummary};
use crate::sync::{BarrierBroken, YieldInjector};
use crate::teller::TellerError;
use crate::workload::WorkloadGenerator;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Teller operation failed: {0}")]
    Teller(#[from] TellerError),

    #[error("Report engine failed: {0}")]
    Report(#[from] ReportError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),

    #[error("Failed to spawn worker thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

impl SimulationError {
    /// True if this worker only failed because another one broke the barrier
    pub fn is_secondary(&self) -> bool {
        matches!(self, SimulationError::Report(ReportError::BarrierBroken(BarrierBroken)))
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Everything a finished run leaves behind
#[derive(Debug)]
pub struct RunOutcome {
    pub bank: Bank,
    /// One per worker, in worker order
    pub summaries: Vec<WorkerSummary>,
    pub elapsed: Duration,
    pub fingerprint: String,
    /// Bank balance right after initialization
    pub initial_balance: Amount,
}

impl RunOutcome {
    pub fn num_workers(&self) -> usize {
        self.summaries.len()
    }

    /// Bank balance queries that disagreed with the fixed balance
    pub fn balance_errors(&self) -> usize {
        self.summaries.iter().map(|s| s.balance_errors).sum()
    }

    pub fn total_actions(&self) -> u64 {
        self.summaries.iter().map(WorkerSummary::total_actions).sum()
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// A validated run plan, ready to execute any number of times
#[derive(Debug, Clone)]
pub struct Simulation {
    plan: RunPlan,
    fingerprint: String,
}

impl Simulation {
    pub fn new(config: &SimulationConfig) -> Result<Self, SimulationError> {
        Self::from_plan(config.resolve()?)
    }

    pub fn from_plan(plan: RunPlan) -> Result<Self, SimulationError> {
        let fingerprint = plan.fingerprint()?;
        Ok(Self { plan, fingerprint })
    }

    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Fresh bank for this plan, with the report barrier sized for `num_workers`
    fn build_bank(plan: &RunPlan) -> Bank {
        let bank = Bank::new(plan.ledger, plan.report, plan.num_workers());
        if plan.yield_percent > 0 {
            bank.with_yield_injection(YieldInjector::new(plan.yield_percent, plan.workload.seed))
        } else {
            bank
        }
    }

    /// Run with the configured number of workers
    pub fn run(&self) -> Result<RunOutcome, SimulationError> {
        self.execute(&self.plan)
    }

    /// Replay the same workload with a single worker and no yield injection
    pub fn run_sequential(&self) -> Result<RunOutcome, SimulationError> {
        let mut plan = self.plan.sequential();
        plan.yield_percent = 0;
        self.execute(&plan)
    }

    fn execute(&self, plan: &RunPlan) -> Result<RunOutcome, SimulationError> {
        let bank = Self::build_bank(plan);
        let initial_balance = bank.balance();
        let expected_balance = plan.check_bank_balance.then_some(initial_balance);
        let generators = WorkloadGenerator::all(&plan.workload);

        info!(
            workers = plan.num_workers(),
            branches = plan.ledger.num_branches,
            accounts = plan.ledger.num_accounts(),
            commands = plan.workload.num_commands,
            seed = plan.workload.seed,
            yield_percent = plan.yield_percent,
            "starting run"
        );

        let start = Instant::now();
        let results: Vec<Result<WorkerSummary, SimulationError>> = if generators.len() == 1 {
            generators
                .into_iter()
                .map(|generator| Worker::new(&bank, generator, expected_balance).run())
                .collect()
        } else {
            run_threads(&bank, generators, expected_balance)?
        };
        let elapsed = start.elapsed();

        let summaries = collect_results(results)?;
        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            reports = bank.report().num_reports(),
            balance = bank.balance(),
            "run complete"
        );

        Ok(RunOutcome {
            bank,
            summaries,
            elapsed,
            fingerprint: self.fingerprint.clone(),
            initial_balance,
        })
    }
}

/// One scoped thread per generator; results come back in worker order
fn run_threads(
    bank: &Bank,
    generators: Vec<WorkloadGenerator>,
    expected_balance: Option<Amount>,
) -> Result<Vec<Result<WorkerSummary, SimulationError>>, SimulationError> {
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(generators.len());
        for generator in generators {
            let worker = generator.worker();
            let driver = Worker::new(bank, generator, expected_balance);
            let spawned = thread::Builder::new()
                .name(format!("worker-{}", worker))
                .spawn_scoped(scope, move || driver.run());

            match spawned {
                Ok(handle) => handles.push((worker, handle)),
                Err(err) => {
                    error!(worker, error = %err, "failed to spawn worker thread");
                    // Release any worker already parked at the barrier
                    bank.report().abandon();
                    for (_, handle) in handles {
                        let _ = handle.join();
                    }
                    return Err(SimulationError::ThreadSpawn(err));
                }
            }
        }

        Ok(handles
            .into_iter()
            .map(|(worker, handle)| {
                handle
                    .join()
                    .unwrap_or(Err(SimulationError::WorkerPanicked(worker)))
            })
            .collect())
    })
}

/// Unwrap per-worker results, surfacing the root cause if any worker failed
fn collect_results(
    results: Vec<Result<WorkerSummary, SimulationError>>,
) -> Result<Vec<WorkerSummary>, SimulationError> {
    let mut summaries = Vec::with_capacity(results.len());
    let mut first_error: Option<SimulationError> = None;

    for result in results {
        match result {
            Ok(summary) => summaries.push(summary),
            Err(err) => {
                let replace = match &first_error {
                    None => true,
                    Some(current) => current.is_secondary() && !err.is_secondary(),
                };
                if replace {
                    first_error = Some(err);
                }
            }
        }
    }

    match first_error {
        Some(err) => {
            warn!(error = %err, "run aborted");
            Err(err)
        }
        None => Ok(summaries),
    }
}
