//! Deterministic per-worker action generator
//!
//! # Streams
//!
//! The workload is drawn from [`MAX_WORKERS`] independent generator streams.
//! With `N` workers, worker `w` owns streams `w, w+N, w+2N, …` and takes the
//! draws for its `j`-th action from its `(j mod 16/N)`-th stream. Every
//! stream is consumed by exactly one worker and produces the same action
//! sequence whatever `N` is, so a one-worker replay executes the same
//! actions as a concurrent run, only interleaved differently.
//!
//! # Budget
//!
//! Each worker gets `num_commands / N` actions. Every `report_interval`
//! actions it emits a [`Action::Report`] (which does not consume budget);
//! when the budget is spent it emits [`Action::Done`] forever.

use crate::models::{AccountNumber, Amount, BranchId};
use crate::rng::RngManager;
use crate::workload::action::Action;
use crate::workload::config::{AmountDistribution, WorkloadConfig, MAX_WORKERS};
use tracing::trace;

/// Seed for stream `stream` derived from the run seed (splitmix64 finalizer)
pub fn stream_seed(seed: u64, stream: usize) -> u64 {
    let mut z = seed.wrapping_add((stream as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Budget and schedule of one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerState {
    pub worker: usize,
    /// Non-report actions left
    pub cmd_count: u64,
    /// Remaining count at which the next report is due
    pub next_report: Option<u64>,
    pub report_interval: u64,
}

impl WorkerState {
    fn new(config: &WorkloadConfig, worker: usize) -> Self {
        let cmd_count = config.commands_per_worker();
        let report_interval = config.report_interval();
        Self {
            worker,
            cmd_count,
            next_report: Self::report_point(cmd_count, report_interval),
            report_interval,
        }
    }

    fn report_point(from: u64, interval: u64) -> Option<u64> {
        if interval == 0 {
            return None;
        }
        from.checked_sub(interval).filter(|point| *point > 0)
    }
}

/// Action source for one worker. Owns its streams; never shared.
#[derive(Debug, Clone)]
pub struct WorkloadGenerator {
    config: WorkloadConfig,
    state: WorkerState,
    streams: Vec<RngManager>,
    next_stream: usize,
}

impl WorkloadGenerator {
    /// Generator for `worker` of `config.num_workers`.
    ///
    /// # Panics
    /// Panics if the worker count does not divide [`MAX_WORKERS`] or
    /// `worker` is out of range; configuration validation rules both out.
    pub fn for_worker(config: &WorkloadConfig, worker: usize) -> Self {
        let workers = config.num_workers;
        assert!(
            workers > 0 && MAX_WORKERS % workers == 0,
            "worker count must divide {}",
            MAX_WORKERS
        );
        assert!(worker < workers, "worker {} out of range", worker);

        let streams = (worker..MAX_WORKERS)
            .step_by(workers)
            .map(|stream| RngManager::new(stream_seed(config.seed, stream)))
            .collect();

        Self {
            config: config.clone(),
            state: WorkerState::new(config, worker),
            streams,
            next_stream: 0,
        }
    }

    /// One generator per worker, in worker order
    pub fn all(config: &WorkloadConfig) -> Vec<Self> {
        (0..config.num_workers)
            .map(|worker| Self::for_worker(config, worker))
            .collect()
    }

    pub fn worker(&self) -> usize {
        self.state.worker
    }

    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    /// Produce the next action
    pub fn next_action(&mut self) -> Action {
        let state = &mut self.state;
        if state.cmd_count == 0 {
            return Action::Done;
        }

        if state.next_report == Some(state.cmd_count) {
            state.next_report = WorkerState::report_point(state.cmd_count, state.report_interval);
            return Action::Report {
                worker: state.worker,
            };
        }

        state.cmd_count -= 1;

        let stream = self.next_stream;
        self.next_stream = (self.next_stream + 1) % self.streams.len();
        let action = draw_action(&self.config, &mut self.streams[stream]);
        trace!(worker = self.state.worker, stream, ?action, "generated");
        action
    }
}

impl Iterator for WorkloadGenerator {
    type Item = Action;

    /// Yields actions until (not including) `Done`
    fn next(&mut self) -> Option<Action> {
        match self.next_action() {
            Action::Done => None,
            action => Some(action),
        }
    }
}

fn draw_amount(config: &WorkloadConfig, rng: &mut RngManager) -> Amount {
    let max = config.max_transaction;
    let value = match config.amount_distribution {
        AmountDistribution::Uniform => rng.below(max),
        AmountDistribution::Bell => rng.bell(max),
    };
    Amount::from(value)
}

/// Draw one non-report action from a single stream
fn draw_action(config: &WorkloadConfig, rng: &mut RngManager) -> Action {
    let branches = config.num_branches;
    let accounts = config.accounts_per_branch;
    let control = config.control;

    match rng.uniform() & 0x7 {
        sel @ 0..=2 => {
            let sub = rng.below(accounts);
            let branch = rng.below(branches);
            let mut amount = draw_amount(config, rng);
            let account = AccountNumber::new(BranchId(branch), sub);

            let is_deposit = sel != 0;
            if control.no_funds_flow || (config.inject_failures && is_deposit && sub & 0x3 == 0) {
                amount = 0;
            }

            if is_deposit {
                Action::Deposit { account, amount }
            } else {
                Action::Withdraw { account, amount }
            }
        }
        sel @ 3..=5 => {
            let src_sub = rng.below(accounts);
            let src_branch = rng.below(branches);
            let dst_branch = rng.below(branches);
            let dst_sub = rng.below(accounts);
            let mut amount = draw_amount(config, rng);

            let dst_branch = if sel == 5 || control.no_cross_transfer {
                src_branch
            } else {
                dst_branch
            };
            if control.no_funds_flow || (config.inject_failures && dst_sub & 0x3 == 0) {
                amount = 0;
            }

            Action::Transfer {
                src: AccountNumber::new(BranchId(src_branch), src_sub),
                dst: AccountNumber::new(BranchId(dst_branch), dst_sub),
                amount,
            }
        }
        6 => Action::BranchBalance {
            branch: BranchId(rng.below(branches)),
        },
        _ => {
            if control.no_bank_balance {
                Action::BranchBalance {
                    branch: BranchId(rng.below(branches)),
                }
            } else {
                Action::BankBalance
            }
        }
    }
}
