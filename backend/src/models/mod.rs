//! Domain models for the bank simulator

pub mod account;
pub mod bank;
pub mod branch;
pub mod mismatch;
pub mod report;

// Re-exports
pub use account::{Account, AccountNumber, Amount, BranchId};
pub use bank::{Bank, LedgerConfig, LedgerError, LedgerSnapshot};
pub use branch::{Branch, BranchSnapshot};
pub use mismatch::Mismatch;
pub use report::{PeriodClosed, Report, ReportConfig, ReportEntry, ReportError, TransferRecord};
