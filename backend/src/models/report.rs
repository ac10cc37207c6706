//! Report engine
//!
//! Keeps a bounded history of daily reports. Each report period collects a
//! log of large transfers; at the end of a period every worker meets at a
//! barrier and the last one to arrive snapshots the bank balance and closes
//! the period into a new [`ReportEntry`].
//!
//! # Period lifecycle
//!
//! ```text
//! record_transfer ──► current period log (bounded, overflow flag)
//!        │
//! do_report (all workers) ──► barrier ──► last arriver:
//!                                           snapshot bank balance
//!                                           close log into entry N
//!                                           release everyone
//! ```
//!
//! # Critical Invariants
//!
//! 1. At most `max_reports` entries are ever stored
//! 2. Entries are never modified once closed
//! 3. Lock order is barrier → log → branch locks (inside the snapshot)

use crate::models::account::{AccountNumber, Amount};
use crate::models::mismatch::Mismatch;
use crate::sync::{BarrierBroken, CyclicBarrier};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

/// Maximum number of reports stored per bank
pub const MAX_NUM_REPORTS: usize = 8;

/// Maximum number of transfer records stored per report
pub const MAX_LOG_ENTRIES: usize = 1024;

/// Errors from the report engine
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReportError {
    #[error("Report storage exhausted: all {capacity} report slots are in use")]
    StorageExhausted { capacity: usize },

    #[error(transparent)]
    BarrierBroken(#[from] BarrierBroken),
}

/// Report engine parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Minimum absolute amount that gets logged
    pub threshold: Amount,
    pub max_reports: usize,
    pub max_log_entries: usize,
}

impl ReportConfig {
    pub fn new(threshold: Amount) -> Self {
        Self {
            threshold,
            max_reports: MAX_NUM_REPORTS,
            max_log_entries: MAX_LOG_ENTRIES,
        }
    }

    pub fn with_max_reports(mut self, max_reports: usize) -> Self {
        self.max_reports = max_reports;
        self
    }

    pub fn with_max_log_entries(mut self, max_log_entries: usize) -> Self {
        self.max_log_entries = max_log_entries;
        self
    }
}

/// One logged transfer. Ordering is by account number, then amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransferRecord {
    pub account: AccountNumber,
    /// Signed: withdrawals and transfer sources are negative
    pub amount: Amount,
}

/// A closed report period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Bank balance at the end of the period
    pub balance: Amount,
    /// True if records were dropped because the log was full
    pub overflowed: bool,
    pub log: Vec<TransferRecord>,
}

#[derive(Debug, Default)]
struct PeriodLog {
    overflowed: bool,
    records: Vec<TransferRecord>,
}

#[derive(Debug, Default)]
struct ReportLog {
    entries: Vec<ReportEntry>,
    current: PeriodLog,
}

/// Outcome of a successful `do_report`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodClosed {
    /// Index of the entry that was created
    pub period: usize,
    /// True for the worker that took the snapshot
    pub snapshot_taker: bool,
}

#[derive(Debug)]
pub struct Report {
    config: ReportConfig,
    log: Mutex<ReportLog>,
    barrier: CyclicBarrier<Result<usize, ReportError>>,
}

impl Report {
    /// Create a report engine for `num_workers` reporting parties
    pub fn new(config: ReportConfig, num_workers: usize) -> Self {
        Self {
            config,
            log: Mutex::new(ReportLog::default()),
            barrier: CyclicBarrier::new(num_workers),
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Record a transfer if it is at or above the reporting threshold.
    ///
    /// Returns true if the record was stored. Full logs set the period's
    /// overflow flag; once every report slot is used records are dropped.
    pub fn record_transfer(&self, account: AccountNumber, amount: Amount) -> bool {
        if amount.abs() < self.config.threshold {
            return false;
        }

        let mut log = self.log.lock();
        if log.entries.len() >= self.config.max_reports {
            return false;
        }
        if log.current.records.len() >= self.config.max_log_entries {
            log.current.overflowed = true;
            return false;
        }
        log.current.records.push(TransferRecord { account, amount });
        trace!(target: "bank_simulator_core::report", %account, amount, "transfer logged");
        true
    }

    /// Rendezvous at the end of a report period.
    ///
    /// Blocks until every worker has arrived. The last arriver calls
    /// `snapshot` for the bank balance and closes the period; all workers of
    /// the period get the same result.
    ///
    /// The caller must not hold any account or branch lock, and must not
    /// move money between entering and leaving this call.
    pub fn do_report<F>(&self, worker: usize, snapshot: F) -> Result<PeriodClosed, ReportError>
    where
        F: FnOnce() -> Amount,
    {
        trace!(target: "bank_simulator_core::report", worker, "arrived at report barrier");
        let arrival = self.barrier.arrive_and_wait(|| self.close_period(snapshot))?;
        let period = arrival.outcome?;
        Ok(PeriodClosed {
            period,
            snapshot_taker: arrival.is_leader,
        })
    }

    fn close_period<F>(&self, snapshot: F) -> Result<usize, ReportError>
    where
        F: FnOnce() -> Amount,
    {
        let mut log = self.log.lock();
        if log.entries.len() >= self.config.max_reports {
            return Err(ReportError::StorageExhausted {
                capacity: self.config.max_reports,
            });
        }

        let balance = snapshot();
        let period = std::mem::take(&mut log.current);
        let entry = ReportEntry {
            balance,
            overflowed: period.overflowed,
            log: period.records,
        };
        debug!(
            target: "bank_simulator_core::report",
            period = log.entries.len(),
            balance,
            records = entry.log.len(),
            overflowed = entry.overflowed,
            "report period closed"
        );
        log.entries.push(entry);
        Ok(log.entries.len() - 1)
    }

    /// Break the report barrier so no worker waits on a period that can
    /// never complete.
    pub fn abandon(&self) {
        self.barrier.abandon();
    }

    pub fn num_reports(&self) -> usize {
        self.log.lock().entries.len()
    }

    /// Copy of the closed entries
    pub fn entries(&self) -> Vec<ReportEntry> {
        self.log.lock().entries.clone()
    }

    /// Number of records in the still-open period
    pub fn pending_records(&self) -> usize {
        self.log.lock().current.records.len()
    }

    /// Compare report histories.
    ///
    /// Logs are sorted before comparison since concurrent workers append in
    /// arbitrary order. Overflowed logs are only compared by length.
    pub fn compare(&self, other: &Report) -> Vec<Mismatch> {
        let left = self.entries();
        let right = other.entries();
        compare_entries(&left, &right)
    }
}

/// Compare two report histories entry by entry
pub fn compare_entries(left: &[ReportEntry], right: &[ReportEntry]) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();

    if left.len() != right.len() {
        mismatches.push(Mismatch::ReportCount {
            left: left.len(),
            right: right.len(),
        });
    }

    for (period, (l, r)) in left.iter().zip(right).enumerate() {
        if l.balance != r.balance {
            mismatches.push(Mismatch::ReportBalance {
                period,
                left: l.balance,
                right: r.balance,
            });
        }
        if l.log.len() != r.log.len() {
            mismatches.push(Mismatch::LogLength {
                period,
                left: l.log.len(),
                right: r.log.len(),
            });
            continue;
        }
        if l.overflowed {
            continue;
        }

        let mut l_log = l.log.clone();
        let mut r_log = r.log.clone();
        l_log.sort_unstable();
        r_log.sort_unstable();
        mismatches.extend(
            l_log
                .iter()
                .zip(&r_log)
                .enumerate()
                .filter(|(_, (a, b))| a != b)
                .map(|(index, _)| Mismatch::LogEntry { period, index }),
        );
    }

    mismatches
}
