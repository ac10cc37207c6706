//! Teller
//!
//! Stateless money-moving operations over a shared [`Bank`](crate::models::Bank).
//!
//! # Critical Invariants
//!
//! 1. **Lock before mutate**: balances change only while their lock is held
//! 2. **Canonical ordering**: same-kind lock pairs are taken in ascending id order
//! 3. **All-or-nothing**: a failed operation leaves every balance unchanged
//! 4. **Conservation**: transfers never change the bank total

mod locking;
mod ops;

pub use ops::{deposit, transfer, withdraw, TellerError};
