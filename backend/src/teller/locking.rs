//! Canonical lock ordering
//!
//! Every place that holds two locks of the same kind at once goes through
//! [`lock_pair`]. Locks are acquired in ascending identifier order, so two
//! threads can never each hold one lock of a pair while waiting for the other.
//! Across kinds the order is fixed as well: accounts before branches.

use crate::models::Bank;
use parking_lot::{Mutex, MutexGuard};

/// Lock two distinct entities in ascending `key` order.
///
/// Guards come back in argument order regardless of acquisition order.
///
/// # Panics
/// Panics if both keys are equal (the same lock would be taken twice)
pub(crate) fn lock_pair<'a, K, T>(
    bank: &Bank,
    first: (K, &'a Mutex<T>),
    second: (K, &'a Mutex<T>),
) -> (MutexGuard<'a, T>, MutexGuard<'a, T>)
where
    K: Ord,
{
    assert!(first.0 != second.0, "lock_pair called with the same entity twice");

    if first.0 < second.0 {
        let a = first.1.lock();
        bank.yield_point();
        let b = second.1.lock();
        (a, b)
    } else {
        let b = second.1.lock();
        bank.yield_point();
        let a = first.1.lock();
        (a, b)
    }
}
