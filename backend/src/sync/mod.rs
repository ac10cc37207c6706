//! Synchronization primitives shared by the ledger and report engine

pub mod barrier;
pub mod yield_point;

pub use barrier::{Arrival, BarrierBroken, CyclicBarrier};
pub use yield_point::YieldInjector;
