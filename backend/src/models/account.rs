//! Account model
//!
//! An account is a single balance cell addressed by an [`AccountNumber`].
//! The balance sits behind its own lock; the teller is the only code that
//! takes that lock for mutation.
//!
//! CRITICAL: All money values are i64

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed money amount
pub type Amount = i64;

/// Branch identifier (index into the bank's branch table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchId(pub u32);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Composite account number
///
/// The branch id occupies the high 32 bits and the subaccount index the low
/// 32 bits, so ordering account numbers orders first by branch and then by
/// subaccount. Lock acquisition relies on that ordering.
///
/// # Example
/// ```
/// use bank_simulator_core::{AccountNumber, BranchId};
///
/// let number = AccountNumber::new(BranchId(3), 17);
/// assert_eq!(number.branch(), BranchId(3));
/// assert_eq!(number.subaccount(), 17);
/// assert!(number < AccountNumber::new(BranchId(4), 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountNumber(u64);

impl AccountNumber {
    pub fn new(branch: BranchId, subaccount: u32) -> Self {
        Self((u64::from(branch.0) << 32) | u64::from(subaccount))
    }

    /// Wrap a raw encoded value
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn branch(self) -> BranchId {
        BranchId((self.0 >> 32) as u32)
    }

    pub fn subaccount(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    pub fn same_branch(self, other: AccountNumber) -> bool {
        self.branch() == other.branch()
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A single account
#[derive(Debug)]
pub struct Account {
    number: AccountNumber,
    balance: Mutex<Amount>,
}

impl Account {
    pub fn new(number: AccountNumber, balance: Amount) -> Self {
        Self {
            number,
            balance: Mutex::new(balance),
        }
    }

    pub fn number(&self) -> AccountNumber {
        self.number
    }

    /// Read the balance under the account lock
    pub fn balance(&self) -> Amount {
        *self.balance.lock()
    }

    /// Lock handle used by the teller
    pub(crate) fn balance_lock(&self) -> &Mutex<Amount> {
        &self.balance
    }
}
