//! Probabilistic thread yields for race exposure
//!
//! Lock-adjacent code calls [`YieldInjector::maybe_yield`]; with a non-zero
//! percentage the calling thread gives up its time slice that often. This
//! only perturbs scheduling, never results.

use crate::rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared yield knob
#[derive(Debug)]
pub struct YieldInjector {
    percent: u8,
    state: AtomicU64,
}

impl YieldInjector {
    /// Injector that never yields
    pub fn disabled() -> Self {
        Self::new(0, 1)
    }

    /// Yield in `percent` of calls (clamped to 100)
    pub fn new(percent: u8, seed: u64) -> Self {
        Self {
            percent: percent.min(100),
            state: AtomicU64::new(if seed == 0 { 1 } else { seed }),
        }
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn is_enabled(&self) -> bool {
        self.percent > 0
    }

    /// Returns true when this call should yield
    fn roll(&self) -> bool {
        let previous = self
            .state
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| Some(rng::step(s)))
            .unwrap_or_else(|current| current);
        let draw = (rng::scramble(rng::step(previous)) >> 33) % 100;
        draw < u64::from(self.percent)
    }

    #[inline]
    pub fn maybe_yield(&self) {
        if self.percent == 0 {
            return;
        }
        if self.roll() {
            std::thread::yield_now();
        }
    }
}

impl Default for YieldInjector {
    fn default() -> Self {
        Self::disabled()
    }
}
