//! Structural differences found when comparing two runs
//!
//! A mismatch is a finding, not an error: comparison collects every one of
//! them and the caller decides what to do with the list.

use crate::models::account::{AccountNumber, Amount, BranchId};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Mismatch {
    BranchCount {
        left: usize,
        right: usize,
    },
    AccountCount {
        branch: BranchId,
        left: usize,
        right: usize,
    },
    BranchBalance {
        branch: BranchId,
        left: Amount,
        right: Amount,
    },
    AccountBalance {
        account: AccountNumber,
        left: Amount,
        right: Amount,
    },
    /// Cached branch balance disagrees with the sum of its accounts
    BranchImbalance {
        branch: BranchId,
        stored: Amount,
        computed: Amount,
    },
    ReportCount {
        left: usize,
        right: usize,
    },
    ReportBalance {
        period: usize,
        left: Amount,
        right: Amount,
    },
    LogLength {
        period: usize,
        left: usize,
        right: usize,
    },
    LogEntry {
        period: usize,
        index: usize,
    },
    /// BankBalance actions observed a total different from the fixed one
    BankBalanceChecks {
        errors: usize,
    },
    /// The two runs were not built from the same configuration
    ConfigFingerprint {
        left: String,
        right: String,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::BranchCount { left, right } => {
                write!(f, "Bank num branches mismatch ({} and {})", left, right)
            }
            Mismatch::AccountCount { branch, left, right } => write!(
                f,
                "Branch {} mismatch in number of accounts ({} and {})",
                branch, left, right
            ),
            Mismatch::BranchBalance {
                branch,
                left,
                right,
            } => write!(
                f,
                "Branch {} mismatch in balance ({} and {})",
                branch, left, right
            ),
            Mismatch::AccountBalance {
                account,
                left,
                right,
            } => write!(
                f,
                "Account {} mismatch in balance ({} and {})",
                account, left, right
            ),
            Mismatch::BranchImbalance {
                branch,
                stored,
                computed,
            } => write!(
                f,
                "Branch {} balance mismatch: computed {}, stored {}",
                branch, computed, stored
            ),
            Mismatch::ReportCount { left, right } => {
                write!(f, "Bank num reports mismatch {} != {}", left, right)
            }
            Mismatch::ReportBalance {
                period,
                left,
                right,
            } => write!(
                f,
                "Report {} balance mismatch {} and {}",
                period, left, right
            ),
            Mismatch::LogLength {
                period,
                left,
                right,
            } => write!(
                f,
                "Report {} has different number of log entries ({} and {})",
                period, left, right
            ),
            Mismatch::LogEntry { period, index } => {
                write!(f, "Report {} transfer log differs at {}", period, index)
            }
            Mismatch::BankBalanceChecks { errors } => {
                write!(f, "{} bank balance command errors detected", errors)
            }
            Mismatch::ConfigFingerprint { left, right } => write!(
                f,
                "Runs use different configurations ({} and {})",
                left, right
            ),
        }
    }
}
