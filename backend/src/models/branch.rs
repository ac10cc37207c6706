//! Branch model
//!
//! A branch owns a fixed set of accounts plus a cached aggregate balance.
//! The cache equals the sum of the account balances whenever no lock on the
//! branch is held.

use crate::models::account::{Account, AccountNumber, Amount, BranchId};
use crate::models::mismatch::Mismatch;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Initial balance given to every fourth account when failure injection is on
pub const INJECTED_FAILURE_BALANCE: Amount = -1;

#[derive(Debug)]
pub struct Branch {
    id: BranchId,
    balance: Mutex<Amount>,
    accounts: Vec<Account>,
}

impl Branch {
    /// Build a branch with `num_accounts` accounts at `initial_balance`.
    ///
    /// With `inject_failures`, accounts whose subaccount index is a multiple
    /// of 4 start at [`INJECTED_FAILURE_BALANCE`] instead.
    pub fn new(id: BranchId, num_accounts: u32, initial_balance: Amount, inject_failures: bool) -> Self {
        let accounts: Vec<Account> = (0..num_accounts)
            .map(|sub| {
                let balance = if inject_failures && sub & 0x3 == 0 {
                    INJECTED_FAILURE_BALANCE
                } else {
                    initial_balance
                };
                Account::new(AccountNumber::new(id, sub), balance)
            })
            .collect();
        let balance = accounts.iter().map(Account::balance).sum();

        Self {
            id,
            balance: Mutex::new(balance),
            accounts,
        }
    }

    pub fn id(&self) -> BranchId {
        self.id
    }

    /// Cached balance, read under the branch lock
    pub fn balance(&self) -> Amount {
        *self.balance.lock()
    }

    pub fn num_accounts(&self) -> usize {
        self.accounts.len()
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn account(&self, subaccount: u32) -> Option<&Account> {
        self.accounts.get(subaccount as usize)
    }

    pub(crate) fn balance_lock(&self) -> &Mutex<Amount> {
        &self.balance
    }

    /// Recompute the balance from the accounts.
    ///
    /// Only meaningful at a quiescent point; accounts are read one at a time.
    pub fn validate(&self) -> Result<(), Mismatch> {
        let computed: Amount = self.accounts.iter().map(Account::balance).sum();
        let stored = self.balance();
        if computed != stored {
            return Err(Mismatch::BranchImbalance {
                branch: self.id,
                stored,
                computed,
            });
        }
        Ok(())
    }

    /// Compare against the branch at the same position in another bank
    pub fn compare(&self, other: &Branch) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();

        if self.num_accounts() != other.num_accounts() {
            mismatches.push(Mismatch::AccountCount {
                branch: self.id,
                left: self.num_accounts(),
                right: other.num_accounts(),
            });
        }

        let (left, right) = (self.balance(), other.balance());
        if left != right {
            mismatches.push(Mismatch::BranchBalance {
                branch: self.id,
                left,
                right,
            });
        }

        for (a, b) in self.accounts.iter().zip(&other.accounts) {
            let (left, right) = (a.balance(), b.balance());
            if left != right {
                mismatches.push(Mismatch::AccountBalance {
                    account: a.number(),
                    left,
                    right,
                });
            }
        }

        mismatches
    }

    pub fn snapshot(&self) -> BranchSnapshot {
        BranchSnapshot {
            id: self.id,
            balance: self.balance(),
            accounts: self.accounts.iter().map(Account::balance).collect(),
        }
    }
}

/// Plain-data copy of a branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSnapshot {
    pub id: BranchId,
    pub balance: Amount,
    /// Account balances indexed by subaccount
    pub accounts: Vec<Amount>,
}
