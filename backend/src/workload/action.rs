//! Actions produced by the workload generator

use crate::models::{AccountNumber, Amount, BranchId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Deposit {
        account: AccountNumber,
        amount: Amount,
    },
    Withdraw {
        account: AccountNumber,
        amount: Amount,
    },
    Transfer {
        src: AccountNumber,
        dst: AccountNumber,
        amount: Amount,
    },
    BranchBalance {
        branch: BranchId,
    },
    BankBalance,
    /// End of a report period for `worker`
    Report {
        worker: usize,
    },
    /// The worker's action budget is exhausted
    Done,
}

impl Action {
    /// Short name for logs and counters
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Deposit { .. } => ActionKind::Deposit,
            Action::Withdraw { .. } => ActionKind::Withdraw,
            Action::Transfer { .. } => ActionKind::Transfer,
            Action::BranchBalance { .. } => ActionKind::BranchBalance,
            Action::BankBalance => ActionKind::BankBalance,
            Action::Report { .. } => ActionKind::Report,
            Action::Done => ActionKind::Done,
        }
    }

    /// True for actions that can move money
    pub fn moves_funds(&self) -> bool {
        matches!(
            self,
            Action::Deposit { .. } | Action::Withdraw { .. } | Action::Transfer { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionKind {
    Deposit,
    Withdraw,
    Transfer,
    BranchBalance,
    BankBalance,
    Report,
    Done,
}
