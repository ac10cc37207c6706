//! Worker driver
//!
//! Pulls actions from one [`WorkloadGenerator`] and applies them to the
//! shared bank until the generator reports `Done`.
//!
//! Expected teller failures (missing account, insufficient funds) are part
//! of the workload: they are counted and logged at debug level. Anything
//! else aborts the worker and breaks the report barrier so the remaining
//! workers do not wait forever.

use crate::models::{AccountNumber, Amount, Bank, ReportError};
use crate::orchestrator::engine::SimulationError;
use crate::teller::{self, TellerError};
use crate::workload::{Action, WorkloadGenerator};
use serde::{Deserialize, Serialize};
use std::thread;
use tracing::{debug, trace, warn};

/// Target for per-action dispatch tracing
const DISPATCH_TARGET: &str = "bank_simulator_core::dispatch";

/// Per-worker counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub worker: usize,
    pub deposits: u64,
    pub withdraws: u64,
    pub transfers: u64,
    pub branch_balances: u64,
    pub bank_balances: u64,
    pub reports: u64,
    pub insufficient_funds: u64,
    pub missing_accounts: u64,
    /// Bank balance queries that disagreed with the fixed balance
    pub balance_errors: usize,
    /// The worker stopped because report storage ran out
    pub storage_exhausted: bool,
}

impl WorkerSummary {
    /// Budgeted actions executed (reports excluded)
    pub fn total_actions(&self) -> u64 {
        self.deposits + self.withdraws + self.transfers + self.branch_balances + self.bank_balances
    }
}

enum Flow {
    Continue,
    Stop,
}

/// Breaks the report barrier if the worker thread unwinds
struct AbandonOnPanic<'a>(&'a Bank);

impl Drop for AbandonOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.report().abandon();
        }
    }
}

pub struct Worker<'a> {
    bank: &'a Bank,
    generator: WorkloadGenerator,
    /// Fixed bank balance every BankBalance query must observe
    expected_balance: Option<Amount>,
    summary: WorkerSummary,
}

impl<'a> Worker<'a> {
    pub fn new(bank: &'a Bank, generator: WorkloadGenerator, expected_balance: Option<Amount>) -> Self {
        let summary = WorkerSummary {
            worker: generator.worker(),
            ..Default::default()
        };
        Self {
            bank,
            generator,
            expected_balance,
            summary,
        }
    }

    pub fn id(&self) -> usize {
        self.summary.worker
    }

    /// Run to completion
    pub fn run(mut self) -> Result<WorkerSummary, SimulationError> {
        let _guard = AbandonOnPanic(self.bank);
        let worker = self.id();
        debug!(worker, "worker started");

        loop {
            let action = self.generator.next_action();
            trace!(target: DISPATCH_TARGET, worker, ?action, "dispatch");

            match self.dispatch(action) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break,
                Err(err) => {
                    if !err.is_secondary() {
                        warn!(worker, error = %err, "worker aborted");
                    }
                    self.bank.report().abandon();
                    return Err(err);
                }
            }
        }

        debug!(
            worker,
            actions = self.summary.total_actions(),
            reports = self.summary.reports,
            insufficient_funds = self.summary.insufficient_funds,
            "worker finished"
        );
        Ok(self.summary)
    }

    fn dispatch(&mut self, action: Action) -> Result<Flow, SimulationError> {
        match action {
            Action::Deposit { account, amount } => {
                self.summary.deposits += 1;
                let result = teller::deposit(self.bank, account, amount);
                self.record_outcome(result, &[(account, amount)])?;
            }
            Action::Withdraw { account, amount } => {
                self.summary.withdraws += 1;
                let result = teller::withdraw(self.bank, account, amount);
                self.record_outcome(result, &[(account, -amount)])?;
            }
            Action::Transfer { src, dst, amount } => {
                self.summary.transfers += 1;
                let result = teller::transfer(self.bank, src, dst, amount);
                self.record_outcome(result, &[(src, -amount), (dst, amount)])?;
            }
            Action::BranchBalance { branch } => {
                self.summary.branch_balances += 1;
                self.bank.branch_balance(branch)?;
            }
            Action::BankBalance => {
                self.summary.bank_balances += 1;
                self.check_bank_balance();
            }
            Action::Report { worker } => return self.report(worker),
            Action::Done => return Ok(Flow::Stop),
        }
        Ok(Flow::Continue)
    }

    /// Log the records of a successful operation, or classify its failure
    fn record_outcome(
        &mut self,
        result: Result<(), TellerError>,
        records: &[(AccountNumber, Amount)],
    ) -> Result<(), SimulationError> {
        match result {
            Ok(()) => {
                for &(account, amount) in records {
                    self.bank.report().record_transfer(account, amount);
                }
                Ok(())
            }
            Err(err @ TellerError::InsufficientFunds { .. }) => {
                self.summary.insufficient_funds += 1;
                debug!(worker = self.id(), error = %err, "operation refused");
                Ok(())
            }
            Err(err @ TellerError::AccountNotFound(_)) => {
                self.summary.missing_accounts += 1;
                debug!(worker = self.id(), error = %err, "operation refused");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn check_bank_balance(&mut self) {
        let balance = self.bank.balance();
        if let Some(expected) = self.expected_balance {
            if balance != expected {
                self.summary.balance_errors += 1;
                warn!(
                    worker = self.id(),
                    balance,
                    expected,
                    "Bank balance incorrect"
                );
            }
        }
    }

    fn report(&mut self, worker: usize) -> Result<Flow, SimulationError> {
        match self.bank.do_report(worker) {
            Ok(closed) => {
                self.summary.reports += 1;
                trace!(worker, period = closed.period, snapshot_taker = closed.snapshot_taker, "report done");
                Ok(Flow::Continue)
            }
            Err(err @ ReportError::StorageExhausted { .. }) => {
                warn!(worker, error = %err, "report storage exhausted, stopping worker");
                self.summary.storage_exhausted = true;
                Ok(Flow::Stop)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BranchId, LedgerConfig, ReportConfig};
    use crate::workload::WorkloadConfig;
    use tracing_test::traced_test;

    fn bank(threshold: Amount) -> Bank {
        Bank::new(LedgerConfig::new(2, 4, 1000), ReportConfig::new(threshold), 1)
    }

    fn worker(bank: &Bank) -> Worker<'_> {
        let generator = WorkloadGenerator::for_worker(&WorkloadConfig::new(2, 2, 64, 10), 0);
        Worker::new(bank, generator, None)
    }

    fn acct(branch: u32, sub: u32) -> AccountNumber {
        AccountNumber::new(BranchId(branch), sub)
    }

    #[test]
    fn test_transfer_logs_both_sides() {
        let bank = bank(30);
        let mut w = worker(&bank);
        w.dispatch(Action::Transfer {
            src: acct(0, 0),
            dst: acct(1, 1),
            amount: 80,
        })
        .unwrap();
        w.dispatch(Action::Report { worker: 0 }).unwrap();

        let log = &bank.report().entries()[0].log;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].amount, -80);
        assert_eq!(log[1].amount, 80);
    }

    #[test]
    fn test_failed_withdraw_is_counted_not_logged() {
        let bank = bank(1);
        let mut w = worker(&bank);
        w.dispatch(Action::Withdraw {
            account: acct(0, 0),
            amount: 5000,
        })
        .unwrap();
        assert_eq!(w.summary.insufficient_funds, 1);
        assert_eq!(bank.report().pending_records(), 0);
    }

    #[test]
    fn test_invalid_amount_aborts() {
        let bank = bank(1);
        let mut w = worker(&bank);
        let err = w
            .dispatch(Action::Deposit {
                account: acct(0, 0),
                amount: -3,
            })
            .err()
            .unwrap();
        assert!(matches!(err, SimulationError::Teller(TellerError::InvalidAmount(-3))));
    }

    #[test]
    fn test_storage_exhaustion_stops_worker() {
        let bank = Bank::new(
            LedgerConfig::new(1, 1, 10),
            ReportConfig::new(1).with_max_reports(1),
            1,
        );
        let mut w = worker(&bank);
        assert!(matches!(w.dispatch(Action::Report { worker: 0 }), Ok(Flow::Continue)));
        assert!(matches!(w.dispatch(Action::Report { worker: 0 }), Ok(Flow::Stop)));
        assert!(w.summary.storage_exhausted);
        assert_eq!(bank.report().num_reports(), 1);
    }

    #[test]
    #[traced_test]
    fn test_bank_balance_mismatch_counted() {
        let bank = bank(1);
        let generator = WorkloadGenerator::for_worker(&WorkloadConfig::new(2, 2, 64, 10), 0);
        let mut w = Worker::new(&bank, generator, Some(1));
        w.dispatch(Action::BankBalance).unwrap();
        assert_eq!(w.summary.balance_errors, 1);
        assert!(logs_contain("Bank balance incorrect"));
    }

    #[test]
    fn test_full_run() {
        let bank = bank(5);
        let summary = worker(&bank).run().unwrap();
        assert_eq!(summary.total_actions(), 64);
        assert_eq!(summary.reports, 3);
        assert!(bank.validate().is_ok());
    }
}
