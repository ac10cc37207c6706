//! Run configuration
//!
//! A [`SimulationConfig`] is what the user asks for (scenario, workers, seed,
//! switches). [`SimulationConfig::resolve`] validates it and expands it into a
//! [`RunPlan`]: the concrete ledger, report and workload parameters every
//! component is built from. Nothing reads configuration from global state.

use crate::models::{Amount, LedgerConfig, ReportConfig};
use crate::models::report::{MAX_LOG_ENTRIES, MAX_NUM_REPORTS};
use crate::workload::{ActionControl, AmountDistribution, WorkloadConfig, COMMANDS_PER_REPORT, MAX_WORKERS};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Command budget used when the reduced workload is requested
pub const REDUCED_NUM_COMMANDS: u64 = 4 * 1024;

/// Default yield percentage for a bare `-y`
pub const DEFAULT_YIELD_PERCENT: u8 = 5;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Number of workers must be 1, 2, 4, 8 or 16 (got {0})")]
    InvalidWorkerCount(usize),

    #[error("Unknown scenario {0} (expected 1-7)")]
    UnknownScenario(u8),

    #[error("Yield percentage must be between 0 and 100 (got {0})")]
    InvalidYieldPercent(u8),

    #[error("Invalid scenario parameters: {0}")]
    InvalidParams(String),

    #[error("Config serialization failed: {0}")]
    Serialization(String),
}

/// Bank and workload shape for one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioParams {
    pub num_branches: u32,
    /// Bank-wide total, split evenly across branches
    pub num_accounts: u32,
    pub num_commands: u64,
    /// Exclusive upper bound on transaction amounts
    pub max_transaction: u32,
    pub initial_balance: Amount,
    pub reporting_threshold: Amount,
    pub control: ActionControl,
    pub inject_failures: bool,
    pub check_bank_balance: bool,
    pub max_reports: usize,
    pub max_log_entries: usize,
}

impl ScenarioParams {
    pub fn new(
        num_branches: u32,
        num_accounts: u32,
        num_commands: u64,
        max_transaction: u32,
        initial_balance: Amount,
        reporting_threshold: Amount,
    ) -> Self {
        Self {
            num_branches,
            num_accounts,
            num_commands,
            max_transaction,
            initial_balance,
            reporting_threshold,
            control: ActionControl::default(),
            inject_failures: false,
            check_bank_balance: false,
            max_reports: MAX_NUM_REPORTS,
            max_log_entries: MAX_LOG_ENTRIES,
        }
    }

    pub fn with_control(mut self, control: ActionControl) -> Self {
        self.control = control;
        self
    }

    pub fn with_report_limits(mut self, max_reports: usize, max_log_entries: usize) -> Self {
        self.max_reports = max_reports;
        self.max_log_entries = max_log_entries;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.num_branches == 0 {
            return Err(ConfigError::InvalidParams("at least one branch required".into()));
        }
        if self.num_accounts < self.num_branches {
            return Err(ConfigError::InvalidParams(format!(
                "{} accounts cannot fill {} branches",
                self.num_accounts, self.num_branches
            )));
        }
        // Every worker count must get whole report intervals from every stream
        let granularity = COMMANDS_PER_REPORT * MAX_WORKERS as u64;
        if self.num_commands % granularity != 0 {
            return Err(ConfigError::InvalidParams(format!(
                "{} commands is not a multiple of {}",
                self.num_commands, granularity
            )));
        }
        if self.max_transaction == 0 {
            return Err(ConfigError::InvalidParams("max transaction must be positive".into()));
        }
        if self.reporting_threshold < 0 {
            return Err(ConfigError::InvalidParams("reporting threshold must be non-negative".into()));
        }
        Ok(())
    }
}

/// Fixed test scenarios, plus caller-defined parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scenario {
    /// 1: normal run
    Normal,
    /// 2: few branches and accounts to stress contention
    HighContention,
    /// 3: many branches and accounts, no bank balance queries
    ManyAccounts,
    /// 4: normal run with failure injection
    NormalWithFailures,
    /// 5: many branches, no cross-branch transfers or bank balance queries
    ManyBranches,
    /// 6: branches with few accounts, no cross-branch transfers or bank balance
    FewAccounts,
    /// 7: fixed bank balance, checked by every bank balance query
    BankBalance,
    Custom(ScenarioParams),
}

impl Scenario {
    pub fn from_number(number: u8) -> Result<Self, ConfigError> {
        match number {
            1 => Ok(Scenario::Normal),
            2 => Ok(Scenario::HighContention),
            3 => Ok(Scenario::ManyAccounts),
            4 => Ok(Scenario::NormalWithFailures),
            5 => Ok(Scenario::ManyBranches),
            6 => Ok(Scenario::FewAccounts),
            7 => Ok(Scenario::BankBalance),
            other => Err(ConfigError::UnknownScenario(other)),
        }
    }

    /// Scenario number (custom scenarios have none)
    pub fn number(&self) -> Option<u8> {
        match self {
            Scenario::Normal => Some(1),
            Scenario::HighContention => Some(2),
            Scenario::ManyAccounts => Some(3),
            Scenario::NormalWithFailures => Some(4),
            Scenario::ManyBranches => Some(5),
            Scenario::FewAccounts => Some(6),
            Scenario::BankBalance => Some(7),
            Scenario::Custom(_) => None,
        }
    }

    pub fn params(&self) -> ScenarioParams {
        let no_cross_no_bank = ActionControl {
            no_bank_balance: true,
            no_cross_transfer: true,
            ..Default::default()
        };

        match *self {
            Scenario::Normal => ScenarioParams::new(16, 16 * 1024, 8 * 1024 * 1024, 1024, 100_000, 1010),
            Scenario::NormalWithFailures => ScenarioParams {
                inject_failures: true,
                ..Scenario::Normal.params()
            },
            Scenario::HighContention => ScenarioParams::new(4, 4 * 2, 8 * 1024 * 1024, 128, 10_000, 124),
            Scenario::ManyAccounts => {
                ScenarioParams::new(256, 256 * 4096, 16 * 1024 * 1024, 20, 5000, 19).with_control(ActionControl {
                    no_bank_balance: true,
                    ..Default::default()
                })
            }
            Scenario::ManyBranches => {
                ScenarioParams::new(256, 256 * 64, 16 * 1024 * 1024, 20, 5000, 19).with_control(no_cross_no_bank)
            }
            Scenario::FewAccounts => {
                ScenarioParams::new(32, 32 * 4, 16 * 1024 * 1024, 20, 5000, 19).with_control(no_cross_no_bank)
            }
            Scenario::BankBalance => ScenarioParams {
                check_bank_balance: true,
                ..ScenarioParams::new(256, 256 * 64, 4 * 1024 * 1024, 20, 5000, 19)
            },
            Scenario::Custom(params) => params,
        }
    }
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub scenario: Scenario,
    pub num_workers: usize,
    /// Workload seed; must be non-zero once resolved (the CLI maps 0 to the clock)
    pub seed: u64,
    pub inject_failures: bool,
    pub check_bank_balance: bool,
    pub reduced_workload: bool,
    pub yield_percent: u8,
}

impl SimulationConfig {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            num_workers: 1,
            seed: 1,
            inject_failures: false,
            check_bank_balance: false,
            reduced_workload: false,
            yield_percent: 0,
        }
    }

    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_failure_injection(mut self, enabled: bool) -> Self {
        self.inject_failures = enabled;
        self
    }

    pub fn with_bank_balance_check(mut self, enabled: bool) -> Self {
        self.check_bank_balance = enabled;
        self
    }

    pub fn with_reduced_workload(mut self, enabled: bool) -> Self {
        self.reduced_workload = enabled;
        self
    }

    pub fn with_yield_percent(mut self, percent: u8) -> Self {
        self.yield_percent = percent;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.num_workers, 1 | 2 | 4 | 8 | 16) || MAX_WORKERS % self.num_workers != 0 {
            return Err(ConfigError::InvalidWorkerCount(self.num_workers));
        }
        if self.yield_percent > 100 {
            return Err(ConfigError::InvalidYieldPercent(self.yield_percent));
        }
        self.scenario.params().validate()
    }

    /// Validate and expand into concrete component parameters
    pub fn resolve(&self) -> Result<RunPlan, ConfigError> {
        self.validate()?;
        let params = self.scenario.params();

        let inject_failures = self.inject_failures || params.inject_failures;
        let check_bank_balance = self.check_bank_balance || params.check_bank_balance;
        let mut control = params.control;
        if check_bank_balance {
            control.no_funds_flow = true;
        }
        let num_commands = if self.reduced_workload {
            REDUCED_NUM_COMMANDS
        } else {
            params.num_commands
        };

        let ledger = LedgerConfig::new(params.num_branches, params.num_accounts, params.initial_balance)
            .with_failure_injection(inject_failures);
        let report = ReportConfig::new(params.reporting_threshold)
            .with_max_reports(params.max_reports)
            .with_max_log_entries(params.max_log_entries);
        let workload = WorkloadConfig::new(
            ledger.num_branches,
            ledger.accounts_per_branch,
            num_commands,
            params.max_transaction,
        )
        .with_workers(self.num_workers)
        .with_seed(self.seed)
        .with_control(control)
        .with_failure_injection(inject_failures)
        .with_amount_distribution(AmountDistribution::Bell);

        Ok(RunPlan {
            scenario: self.scenario.number(),
            ledger,
            report,
            workload,
            check_bank_balance,
            yield_percent: self.yield_percent,
        })
    }
}

/// Fully resolved parameters for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPlan {
    pub scenario: Option<u8>,
    pub ledger: LedgerConfig,
    pub report: ReportConfig,
    pub workload: WorkloadConfig,
    pub check_bank_balance: bool,
    pub yield_percent: u8,
}

impl RunPlan {
    pub fn num_workers(&self) -> usize {
        self.workload.num_workers
    }

    /// Same plan, executed by a single worker
    pub fn sequential(&self) -> RunPlan {
        let mut plan = self.clone();
        plan.workload.num_workers = 1;
        plan
    }

    /// SHA-256 of everything except the worker count and yield knob.
    ///
    /// A concurrent run and its replay must share a fingerprint.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let mut canonical = self.sequential();
        canonical.yield_percent = 0;
        let json = serde_json::to_string(&canonical)
            .map_err(|e| ConfigError::Serialization(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_count_validation() {
        for workers in [1, 2, 4, 8, 16] {
            assert!(SimulationConfig::new(Scenario::Normal).with_workers(workers).validate().is_ok());
        }
        for workers in [0, 3, 5, 32] {
            assert_eq!(
                SimulationConfig::new(Scenario::Normal).with_workers(workers).validate(),
                Err(ConfigError::InvalidWorkerCount(workers))
            );
        }
    }

    #[test]
    fn test_scenario_numbers_round_trip() {
        for n in 1..=7 {
            assert_eq!(Scenario::from_number(n).unwrap().number(), Some(n));
        }
        assert_eq!(Scenario::from_number(8), Err(ConfigError::UnknownScenario(8)));
    }

    #[test]
    fn test_bank_balance_check_stops_funds_flow() {
        let plan = SimulationConfig::new(Scenario::Normal)
            .with_bank_balance_check(true)
            .resolve()
            .unwrap();
        assert!(plan.check_bank_balance);
        assert!(plan.workload.control.no_funds_flow);

        let plan = SimulationConfig::new(Scenario::BankBalance).resolve().unwrap();
        assert!(plan.workload.control.no_funds_flow);
    }

    #[test]
    fn test_reduced_workload() {
        let plan = SimulationConfig::new(Scenario::ManyAccounts)
            .with_reduced_workload(true)
            .resolve()
            .unwrap();
        assert_eq!(plan.workload.num_commands, REDUCED_NUM_COMMANDS);
        assert_eq!(plan.ledger.accounts_per_branch, 4096);
        assert!(plan.workload.control.no_bank_balance);
    }

    #[test]
    fn test_failure_scenario_injects_into_ledger_and_workload() {
        let plan = SimulationConfig::new(Scenario::NormalWithFailures).resolve().unwrap();
        assert!(plan.ledger.inject_failures);
        assert!(plan.workload.inject_failures);
    }

    #[test]
    fn test_fingerprint_ignores_worker_count() {
        let base = SimulationConfig::new(Scenario::HighContention).with_seed(99);
        let a = base.clone().with_workers(8).with_yield_percent(20).resolve().unwrap();
        let b = base.clone().resolve().unwrap();
        let c = base.with_seed(100).resolve().unwrap();

        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }

    #[test]
    fn test_invalid_custom_params() {
        let params = ScenarioParams::new(4, 2, 64, 10, 100, 5);
        let err = SimulationConfig::new(Scenario::Custom(params)).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParams(_)));
    }

    #[test]
    fn test_uneven_command_count_rejected() {
        let params = ScenarioParams::new(4, 16, 1000, 100, 1_000_000, 90);
        let err = SimulationConfig::new(Scenario::Custom(params))
            .with_workers(16)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParams(_)));

        let params = ScenarioParams::new(4, 16, 1024, 100, 1_000_000, 90);
        for workers in [1, 2, 4, 8, 16] {
            let plan = SimulationConfig::new(Scenario::Custom(params))
                .with_workers(workers)
                .resolve()
                .unwrap();
            assert_eq!(plan.workload.commands_per_worker() * workers as u64, 1024);
        }
    }
}
