//! Bank (ledger root)
//!
//! Owns the branch table, the report engine and the yield knob. Topology is
//! fixed at construction, so looking up an account needs no lock; only the
//! balances behind each account and branch are locked.
//!
//! # Critical Invariants
//!
//! 1. `branch.balance == Σ account.balance` at every quiescent point
//! 2. `bank balance == Σ branch.balance`
//! 3. Account number `n` lives at `branches[n.branch()].accounts[n.subaccount()]`

use crate::models::account::{Account, AccountNumber, Amount, BranchId};
use crate::models::branch::{Branch, BranchSnapshot};
use crate::models::mismatch::Mismatch;
use crate::models::report::{PeriodClosed, Report, ReportConfig, ReportEntry, ReportError};
use crate::sync::YieldInjector;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors from ledger lookups
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Account {0} not found")]
    AccountNotFound(AccountNumber),

    #[error("Branch {0} not found")]
    BranchNotFound(BranchId),

    #[error("Ledger failed validation: {0:?}")]
    Imbalanced(Vec<Mismatch>),
}

/// Ledger shape and opening balances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub num_branches: u32,
    pub accounts_per_branch: u32,
    pub initial_balance: Amount,
    /// Seed every fourth account with an invalid negative balance
    pub inject_failures: bool,
}

impl LedgerConfig {
    /// `num_accounts` is the bank-wide total, split evenly across branches
    pub fn new(num_branches: u32, num_accounts: u32, initial_balance: Amount) -> Self {
        Self {
            num_branches,
            accounts_per_branch: num_accounts / num_branches.max(1),
            initial_balance,
            inject_failures: false,
        }
    }

    pub fn with_failure_injection(mut self, inject_failures: bool) -> Self {
        self.inject_failures = inject_failures;
        self
    }

    pub fn num_accounts(&self) -> u64 {
        u64::from(self.num_branches) * u64::from(self.accounts_per_branch)
    }
}

#[derive(Debug)]
pub struct Bank {
    branches: Vec<Branch>,
    report: Report,
    yielder: YieldInjector,
}

impl Bank {
    /// Build a bank whose report barrier expects `num_workers` parties
    ///
    /// # Example
    /// ```
    /// use bank_simulator_core::{Bank, LedgerConfig, ReportConfig};
    ///
    /// let bank = Bank::new(LedgerConfig::new(2, 4, 100), ReportConfig::new(50), 1);
    /// assert_eq!(bank.num_branches(), 2);
    /// assert_eq!(bank.balance(), 400);
    /// ```
    pub fn new(ledger: LedgerConfig, report: ReportConfig, num_workers: usize) -> Self {
        let branches = (0..ledger.num_branches)
            .map(|id| {
                Branch::new(
                    BranchId(id),
                    ledger.accounts_per_branch,
                    ledger.initial_balance,
                    ledger.inject_failures,
                )
            })
            .collect();

        debug!(
            branches = ledger.num_branches,
            accounts_per_branch = ledger.accounts_per_branch,
            initial_balance = ledger.initial_balance,
            inject_failures = ledger.inject_failures,
            "ledger initialized"
        );

        Self {
            branches,
            report: Report::new(report, num_workers),
            yielder: YieldInjector::disabled(),
        }
    }

    pub fn with_yield_injection(mut self, yielder: YieldInjector) -> Self {
        self.yielder = yielder;
        self
    }

    pub fn num_branches(&self) -> usize {
        self.branches.len()
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Possibly yield the thread (no-op unless yield injection is on)
    #[inline]
    pub(crate) fn yield_point(&self) {
        self.yielder.maybe_yield();
    }

    pub fn branch(&self, id: BranchId) -> Result<&Branch, LedgerError> {
        self.branches
            .get(id.0 as usize)
            .ok_or(LedgerError::BranchNotFound(id))
    }

    /// Decode an account number into a direct reference
    pub fn lookup_account(&self, number: AccountNumber) -> Result<&Account, LedgerError> {
        self.branches
            .get(number.branch().0 as usize)
            .and_then(|branch| branch.account(number.subaccount()))
            .ok_or(LedgerError::AccountNotFound(number))
    }

    pub fn branch_balance(&self, id: BranchId) -> Result<Amount, LedgerError> {
        let balance = self.branch(id)?.balance();
        trace!(target: "bank_simulator_core::balance", branch = %id, balance, "branch balance");
        Ok(balance)
    }

    /// Sum of branch balances, taking each branch lock in turn
    pub fn balance(&self) -> Amount {
        let balance = self.branches.iter().map(Branch::balance).sum();
        trace!(target: "bank_simulator_core::balance", balance, "bank balance");
        balance
    }

    /// Sum of branch balances with every branch lock held at once.
    ///
    /// Locks are taken in ascending branch id order. The result is a
    /// consistent cut even if a teller operation were still running.
    pub fn consistent_balance(&self) -> Amount {
        let guards: Vec<_> = self.branches.iter().map(|b| b.balance_lock().lock()).collect();
        guards.iter().map(|guard| **guard).sum()
    }

    /// Branches whose cached balance disagrees with their accounts
    pub fn imbalances(&self) -> Vec<Mismatch> {
        self.branches
            .iter()
            .filter_map(|branch| branch.validate().err())
            .collect()
    }

    /// Check every branch's cached balance against its accounts
    pub fn validate(&self) -> Result<(), LedgerError> {
        let mismatches = self.imbalances();
        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::Imbalanced(mismatches))
        }
    }

    /// Structural comparison of two ledgers (branches and accounts only)
    pub fn compare(&self, other: &Bank) -> Vec<Mismatch> {
        if self.num_branches() != other.num_branches() {
            return vec![Mismatch::BranchCount {
                left: self.num_branches(),
                right: other.num_branches(),
            }];
        }

        self.branches
            .iter()
            .zip(&other.branches)
            .flat_map(|(a, b)| a.compare(b))
            .collect()
    }

    /// Close the current report period (see [`Report::do_report`])
    pub fn do_report(&self, worker: usize) -> Result<PeriodClosed, ReportError> {
        self.report.do_report(worker, || self.consistent_balance())
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            branches: self.branches.iter().map(Branch::snapshot).collect(),
            reports: self.report.entries(),
        }
    }
}

/// Plain-data copy of a whole bank, used for determinism checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub branches: Vec<BranchSnapshot>,
    pub reports: Vec<ReportEntry>,
}

impl LedgerSnapshot {
    pub fn total(&self) -> Amount {
        self.branches.iter().map(|b| b.balance).sum()
    }
}
