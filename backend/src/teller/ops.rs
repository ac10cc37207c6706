//! Deposit, withdraw and transfer
//!
//! # Locking protocol
//!
//! ```text
//! deposit / withdraw:   account ──► branch
//! transfer, same branch:   account pair (ascending number)
//! transfer, cross branch:  account pair (ascending number) ──► branch pair (ascending id)
//! ```
//!
//! Funds are checked only once every needed lock is held and before any
//! balance changes. Guards release on every return path.

use crate::models::{AccountNumber, Amount, Bank, LedgerError};
use crate::teller::locking::lock_pair;
use thiserror::Error;
use tracing::trace;

/// Errors returned by teller operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TellerError {
    #[error("Account {0} not found")]
    AccountNotFound(AccountNumber),

    #[error("Insufficient funds in account {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        account: AccountNumber,
        requested: Amount,
        available: Amount,
    },

    #[error("Amount must be non-negative, got {0}")]
    InvalidAmount(Amount),

    #[error(transparent)]
    Ledger(LedgerError),
}

impl TellerError {
    /// Errors a worker is expected to hit during normal operation
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            TellerError::AccountNotFound(_) | TellerError::InsufficientFunds { .. }
        )
    }
}

impl From<LedgerError> for TellerError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound(number) => TellerError::AccountNotFound(number),
            other => TellerError::Ledger(other),
        }
    }
}

fn check_amount(amount: Amount) -> Result<(), TellerError> {
    if amount < 0 {
        return Err(TellerError::InvalidAmount(amount));
    }
    Ok(())
}

/// Add `amount` to an account and its branch
///
/// # Example
/// ```
/// use bank_simulator_core::{teller, AccountNumber, Bank, BranchId, LedgerConfig, ReportConfig};
///
/// let bank = Bank::new(LedgerConfig::new(1, 1, 100), ReportConfig::new(50), 1);
/// let account = AccountNumber::new(BranchId(0), 0);
/// teller::deposit(&bank, account, 25).unwrap();
/// assert_eq!(bank.balance(), 125);
/// ```
pub fn deposit(bank: &Bank, number: AccountNumber, amount: Amount) -> Result<(), TellerError> {
    check_amount(amount)?;
    trace!(account = %number, amount, "deposit");

    let account = bank.lookup_account(number)?;
    let branch = bank.branch(number.branch())?;

    let mut account_balance = account.balance_lock().lock();
    bank.yield_point();
    let mut branch_balance = branch.balance_lock().lock();
    bank.yield_point();

    *account_balance += amount;
    *branch_balance += amount;
    Ok(())
}

/// Remove `amount` from an account and its branch.
///
/// Fails with [`TellerError::InsufficientFunds`] if the account balance is
/// below `amount`; nothing changes in that case.
pub fn withdraw(bank: &Bank, number: AccountNumber, amount: Amount) -> Result<(), TellerError> {
    check_amount(amount)?;
    trace!(account = %number, amount, "withdraw");

    let account = bank.lookup_account(number)?;
    let branch = bank.branch(number.branch())?;

    let mut account_balance = account.balance_lock().lock();
    bank.yield_point();
    let mut branch_balance = branch.balance_lock().lock();
    bank.yield_point();

    if amount > *account_balance {
        return Err(TellerError::InsufficientFunds {
            account: number,
            requested: amount,
            available: *account_balance,
        });
    }

    *account_balance -= amount;
    *branch_balance -= amount;
    Ok(())
}

/// Move `amount` from `src` to `dst`.
///
/// A self-transfer succeeds without touching anything. Same-branch
/// transfers leave the branch balance alone since its net change is zero.
pub fn transfer(
    bank: &Bank,
    src: AccountNumber,
    dst: AccountNumber,
    amount: Amount,
) -> Result<(), TellerError> {
    check_amount(amount)?;
    if src == dst {
        return Ok(());
    }
    trace!(src = %src, dst = %dst, amount, "transfer");

    let src_account = bank.lookup_account(src)?;
    let dst_account = bank.lookup_account(dst)?;

    let (mut src_balance, mut dst_balance) = lock_pair(
        bank,
        (src, src_account.balance_lock()),
        (dst, dst_account.balance_lock()),
    );
    bank.yield_point();

    if amount > *src_balance {
        return Err(TellerError::InsufficientFunds {
            account: src,
            requested: amount,
            available: *src_balance,
        });
    }

    if src.same_branch(dst) {
        *src_balance -= amount;
        *dst_balance += amount;
        return Ok(());
    }

    let src_branch = bank.branch(src.branch())?;
    let dst_branch = bank.branch(dst.branch())?;
    let (mut src_branch_balance, mut dst_branch_balance) = lock_pair(
        bank,
        (src.branch(), src_branch.balance_lock()),
        (dst.branch(), dst_branch.balance_lock()),
    );
    bank.yield_point();

    *src_balance -= amount;
    *dst_balance += amount;
    *src_branch_balance -= amount;
    *dst_branch_balance += amount;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BranchId, LedgerConfig, ReportConfig};

    fn acct(branch: u32, sub: u32) -> AccountNumber {
        AccountNumber::new(BranchId(branch), sub)
    }

    fn bank(branches: u32, accounts: u32, initial: Amount) -> Bank {
        Bank::new(
            LedgerConfig::new(branches, accounts, initial),
            ReportConfig::new(1),
            1,
        )
    }

    #[test]
    fn test_negative_amount_rejected() {
        let bank = bank(1, 1, 10);
        assert_eq!(
            deposit(&bank, acct(0, 0), -1),
            Err(TellerError::InvalidAmount(-1))
        );
        assert_eq!(bank.balance(), 10);
    }

    #[test]
    fn test_unknown_account() {
        let bank = bank(1, 1, 10);
        let missing = acct(0, 1);
        assert_eq!(
            withdraw(&bank, missing, 1),
            Err(TellerError::AccountNotFound(missing))
        );
        assert_eq!(
            transfer(&bank, acct(0, 0), missing, 1),
            Err(TellerError::AccountNotFound(missing))
        );
    }

    #[test]
    fn test_same_branch_transfer_keeps_branch_balance() {
        let bank = bank(1, 2, 100);
        transfer(&bank, acct(0, 0), acct(0, 1), 40).unwrap();
        assert_eq!(bank.lookup_account(acct(0, 0)).unwrap().balance(), 60);
        assert_eq!(bank.lookup_account(acct(0, 1)).unwrap().balance(), 140);
        assert_eq!(bank.branch_balance(BranchId(0)).unwrap(), 200);
    }

    #[test]
    fn test_reverse_direction_transfer() {
        // Higher-numbered source exercises the swapped acquisition order
        let bank = bank(2, 2, 100);
        transfer(&bank, acct(1, 0), acct(0, 0), 30).unwrap();
        assert_eq!(bank.branch_balance(BranchId(0)).unwrap(), 130);
        assert_eq!(bank.branch_balance(BranchId(1)).unwrap(), 70);
        assert!(bank.validate().is_ok());
    }

    #[test]
    fn test_expected_errors() {
        assert!(TellerError::AccountNotFound(acct(0, 0)).is_expected());
        assert!(TellerError::InsufficientFunds {
            account: acct(0, 0),
            requested: 2,
            available: 1
        }
        .is_expected());
        assert!(!TellerError::InvalidAmount(-5).is_expected());
    }
}
