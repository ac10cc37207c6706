//! Bank Simulator CLI
//!
//! Runs one scenario with N worker threads, replays it with a single worker
//! and compares the two banks.
//!
//! # Example
//!
//! ```bash
//! # Scenario 2 with 8 workers and 10% yield injection
//! bank-sim -t 2 -w 8 -y10
//!
//! # Reduced workload, fixed seed, JSON summary
//! bank-sim -t 5 -w 4 -r -s 1234 --json
//!
//! # Trace teller operations and report periods
//! bank-sim -t 1 -r -d tp
//! ```

mod diagnostics;

use bank_simulator_core::orchestrator::{
    run_and_validate_with, Scenario, Simulation, SimulationConfig, SimulationError,
};
use clap::Parser;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Bank Simulator
///
/// Drives a simulated bank from several threads and checks the result
/// against a sequential replay of the same workload.
#[derive(Parser, Debug)]
#[command(name = "bank-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of worker threads (1, 2, 4, 8 or 16)
    #[arg(short = 'w', long, default_value = "1")]
    workers: usize,

    /// Test scenario (1-7)
    #[arg(short = 't', long = "test", default_value = "1")]
    scenario: u8,

    /// Random seed; 0 derives one from the clock
    #[arg(short = 's', long, default_value = "0")]
    seed: u64,

    /// Inject failures into the workload and initial balances
    #[arg(short = 'f', long)]
    failures: bool,

    /// Check every bank balance query against the fixed bank balance
    #[arg(short = 'b', long)]
    bank_balance: bool,

    /// Reduced workload (for running under slow race checkers)
    #[arg(short = 'r', long)]
    reduced: bool,

    /// Yield the thread around lock operations with this percentage probability
    #[arg(
        short = 'y',
        long = "yield",
        num_args = 0..=1,
        default_value = "0",
        default_missing_value = "5",
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    yield_percent: u8,

    /// Diagnostic categories: t(eller) w(orker) b(alance) r(andom) x(actions) p(report)
    #[arg(short = 'd', long)]
    diagnostics: Option<String>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn clock_seed() -> Option<u64> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    Some(now.as_micros() as u64 ^ u64::from(std::process::id()))
}

fn run(args: &Args) -> Result<bool, SimulationError> {
    let seed = match args.seed {
        0 => clock_seed().unwrap_or(1),
        seed => seed,
    };

    let config = SimulationConfig::new(Scenario::from_number(args.scenario)?)
        .with_workers(args.workers)
        .with_seed(seed)
        .with_failure_injection(args.failures)
        .with_bank_balance_check(args.bank_balance)
        .with_reduced_workload(args.reduced)
        .with_yield_percent(args.yield_percent);
    let simulation = Simulation::new(&config)?;
    let plan = simulation.plan();

    info!(fingerprint = simulation.fingerprint(), "configuration resolved");
    if !args.json {
        println!(
            "BANK test {}: branches {} accounts {} commands {} workers {} reporting {} initial seed {}",
            args.scenario,
            plan.ledger.num_branches,
            plan.ledger.num_accounts(),
            plan.workload.num_commands,
            plan.num_workers(),
            plan.report.threshold,
            seed
        );
    }

    let validated = run_and_validate_with(&simulation, |run| {
        if !args.json {
            println!(
                "All workers done in {:.2} seconds.\nComparing with sequential run ...",
                run.elapsed.as_secs_f64()
            );
        }
    })?;

    if args.json {
        let summary = validated.summary(plan);
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize summary: {}", e),
        }
        return Ok(validated.passed());
    }

    let balance_errors = validated.run.balance_errors();
    if balance_errors > 0 {
        eprintln!("{} bank balance command errors detected.", balance_errors);
    }
    for mismatch in &validated.report.mismatches {
        eprintln!("{}", mismatch);
    }

    if validated.passed() {
        println!(
            "Bank testrun {} PASSED all compare tests. Time ratio {:.2}",
            args.scenario,
            validated.time_ratio()
        );
    } else {
        eprintln!(
            "Bank testrun {} compare FAILED. Time ratio {:.2}",
            args.scenario,
            validated.time_ratio()
        );
    }
    Ok(validated.passed())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = match diagnostics::build_filter(args.diagnostics.as_deref()) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_simulator_core::orchestrator::DEFAULT_YIELD_PERCENT;

    #[test]
    fn test_yield_flag_forms() {
        let args = Args::try_parse_from(["bank-sim", "-y"]).unwrap();
        assert_eq!(args.yield_percent, DEFAULT_YIELD_PERCENT);

        let args = Args::try_parse_from(["bank-sim", "-y20"]).unwrap();
        assert_eq!(args.yield_percent, 20);

        let args = Args::try_parse_from(["bank-sim"]).unwrap();
        assert_eq!(args.yield_percent, 0);

        assert!(Args::try_parse_from(["bank-sim", "-y101"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["bank-sim", "-w", "4", "-t", "3", "-r", "-f"]).unwrap();
        assert_eq!(args.workers, 4);
        assert_eq!(args.scenario, 3);
        assert_eq!(args.seed, 0);
        assert!(args.reduced);
        assert!(args.failures);
        assert!(!args.bank_balance);
        assert!(!args.json);
    }

    #[test]
    fn test_unknown_scenario_is_an_error() {
        let args = Args::try_parse_from(["bank-sim", "-t", "9", "-r"]).unwrap();
        assert!(matches!(run(&args), Err(SimulationError::Config(_))));
    }
}
