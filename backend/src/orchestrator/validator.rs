//! Run validation
//!
//! A concurrent run is checked by replaying the same workload with a single
//! worker and comparing the two banks: structure, balances, report history
//! and the cached-vs-computed branch invariant on both sides.

use crate::models::{Amount, Mismatch};
use crate::orchestrator::config::RunPlan;
use crate::orchestrator::driver::WorkerSummary;
use crate::orchestrator::engine::{RunOutcome, Simulation, SimulationError};
use serde::Serialize;
use tracing::{info, warn};

/// Findings from comparing a run against its replay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub mismatches: Vec<Mismatch>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Compare a concurrent run with its sequential replay
pub fn compare_runs(run: &RunOutcome, replay: &RunOutcome) -> ValidationReport {
    if run.fingerprint != replay.fingerprint {
        return ValidationReport {
            mismatches: vec![Mismatch::ConfigFingerprint {
                left: run.fingerprint.clone(),
                right: replay.fingerprint.clone(),
            }],
        };
    }

    let mut mismatches = run.bank.compare(&replay.bank);
    mismatches.extend(run.bank.imbalances());
    mismatches.extend(replay.bank.imbalances());
    mismatches.extend(run.bank.report().compare(replay.bank.report()));

    let errors = run.balance_errors();
    if errors > 0 {
        mismatches.push(Mismatch::BankBalanceChecks { errors });
    }

    for mismatch in &mismatches {
        warn!(%mismatch, "validation mismatch");
    }
    ValidationReport { mismatches }
}

/// Run the configured simulation, replay it sequentially, and compare
pub fn run_and_validate(simulation: &Simulation) -> Result<Validated, SimulationError> {
    run_and_validate_with(simulation, |_| {})
}

/// Like [`run_and_validate`], calling `on_run_done` between the run and the replay
pub fn run_and_validate_with<F>(simulation: &Simulation, on_run_done: F) -> Result<Validated, SimulationError>
where
    F: FnOnce(&RunOutcome),
{
    let run = simulation.run()?;
    info!(
        elapsed_secs = run.elapsed.as_secs_f64(),
        "all workers done, comparing with sequential run"
    );
    on_run_done(&run);
    let replay = simulation.run_sequential()?;
    let report = compare_runs(&run, &replay);
    Ok(Validated { run, replay, report })
}

/// A run, its replay and the verdict
#[derive(Debug)]
pub struct Validated {
    pub run: RunOutcome,
    pub replay: RunOutcome,
    pub report: ValidationReport,
}

impl Validated {
    pub fn passed(&self) -> bool {
        self.report.passed()
    }

    /// Concurrent wall time divided by replay wall time
    pub fn time_ratio(&self) -> f64 {
        let replay = self.replay.elapsed.as_secs_f64();
        if replay > 0.0 {
            self.run.elapsed.as_secs_f64() / replay
        } else {
            0.0
        }
    }

    pub fn summary(&self, plan: &RunPlan) -> RunSummary {
        RunSummary {
            scenario: plan.scenario,
            workers: plan.num_workers(),
            seed: plan.workload.seed,
            branches: plan.ledger.num_branches,
            accounts: plan.ledger.num_accounts(),
            commands: plan.workload.num_commands,
            reporting_threshold: plan.report.threshold,
            fingerprint: self.run.fingerprint.clone(),
            initial_balance: self.run.initial_balance,
            final_balance: self.run.bank.balance(),
            reports: self.run.bank.report().num_reports(),
            run_secs: self.run.elapsed.as_secs_f64(),
            replay_secs: self.replay.elapsed.as_secs_f64(),
            time_ratio: self.time_ratio(),
            workers_summary: self.run.summaries.clone(),
            mismatches: self.report.mismatches.iter().map(ToString::to_string).collect(),
            passed: self.passed(),
        }
    }
}

/// Serializable result of a validated run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub scenario: Option<u8>,
    pub workers: usize,
    pub seed: u64,
    pub branches: u32,
    pub accounts: u64,
    pub commands: u64,
    pub reporting_threshold: Amount,
    pub fingerprint: String,
    pub initial_balance: Amount,
    pub final_balance: Amount,
    pub reports: usize,
    pub run_secs: f64,
    pub replay_secs: f64,
    pub time_ratio: f64,
    pub workers_summary: Vec<WorkerSummary>,
    pub mismatches: Vec<String>,
    pub passed: bool,
}
