//! Workload parameters
//!
//! Built once per run and handed to every generator by reference.

use serde::{Deserialize, Serialize};

/// Number of deterministic generator streams.
///
/// Every supported worker count divides this, which is what lets a replay
/// with one worker reproduce the same per-stream action sequences.
pub const MAX_WORKERS: usize = 16;

/// Each worker reports this many times over its budget (minus the final
/// period, which ends with Done instead of a report)
pub const COMMANDS_PER_REPORT: u64 = 4;

/// How transaction amounts are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AmountDistribution {
    /// Raw draw modulo the maximum
    Uniform,
    /// Average of three draws; biased toward the middle of the range
    #[default]
    Bell,
}

/// Switches that suppress classes of actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionControl {
    /// Replace bank-wide balance queries with branch balance queries
    pub no_bank_balance: bool,
    /// Keep every transfer inside its source branch
    pub no_cross_transfer: bool,
    /// Zero every deposit, withdraw and transfer amount
    pub no_funds_flow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub num_branches: u32,
    pub accounts_per_branch: u32,
    /// Total actions across all workers (reports not included)
    pub num_commands: u64,
    /// Exclusive upper bound on transaction amounts
    pub max_transaction: u32,
    pub num_workers: usize,
    pub seed: u64,
    pub control: ActionControl,
    /// Zero amounts aimed at every fourth subaccount
    pub inject_failures: bool,
    pub amount_distribution: AmountDistribution,
}

impl WorkloadConfig {
    pub fn new(num_branches: u32, accounts_per_branch: u32, num_commands: u64, max_transaction: u32) -> Self {
        Self {
            num_branches,
            accounts_per_branch,
            num_commands,
            max_transaction,
            num_workers: 1,
            seed: 1,
            control: ActionControl::default(),
            inject_failures: false,
            amount_distribution: AmountDistribution::default(),
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

    pub fn with_control(mut self, control: ActionControl) -> Self {
        self.control = control;
        self
    }

    pub fn with_failure_injection(mut self, inject_failures: bool) -> Self {
        self.inject_failures = inject_failures;
        self
    }

    pub fn with_amount_distribution(mut self, distribution: AmountDistribution) -> Self {
        self.amount_distribution = distribution;
        self
    }

    /// Actions assigned to each worker
    pub fn commands_per_worker(&self) -> u64 {
        self.num_commands / self.num_workers.max(1) as u64
    }

    /// Actions between two report points of one worker
    pub fn report_interval(&self) -> u64 {
        (self.num_commands / COMMANDS_PER_REPORT) / self.num_workers.max(1) as u64
    }

    /// Reports each worker will request
    pub fn reports_per_worker(&self) -> u64 {
        let interval = self.report_interval();
        let per_worker = self.commands_per_worker();
        if interval == 0 || per_worker == 0 {
            return 0;
        }
        (per_worker - 1) / interval
    }
}
