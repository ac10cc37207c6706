//! Deterministic random number generation
//!
//! Uses xorshift64* for fast, deterministic draws.
//! CRITICAL: All workload randomness MUST go through this module.

mod xorshift;

pub(crate) use xorshift::{scramble, step};
pub use xorshift::RngManager;
