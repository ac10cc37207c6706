//! xorshift64* random number generator
//!
//! Fast, deterministic PRNG used for every draw the workload makes.
//!
//! # Algorithm
//!
//! xorshift64* is a variant of xorshift that passes TestU01's BigCrush
//! statistical tests. It uses 64-bit state and produces 64-bit output.
//!
//! # Determinism
//!
//! Same seed → same sequence of draws. The sequential replay depends on this:
//! a replay only matches the concurrent run if every stream reproduces its
//! values exactly.

use serde::{Deserialize, Serialize};

/// Multiplier applied to the xorshift state to produce output
const OUTPUT_MULTIPLIER: u64 = 0x2545_F491_4F6C_DD1D;

/// Advance a raw xorshift64 state by one step.
///
/// Shared with the yield injector, which keeps its state in an atomic.
pub(crate) fn step(mut x: u64) -> u64 {
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    x
}

/// Scramble a raw state into an output value.
pub(crate) fn scramble(state: u64) -> u64 {
    state.wrapping_mul(OUTPUT_MULTIPLIER)
}

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use bank_simulator_core::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let selector = rng.uniform() & 0x7;
/// let amount = rng.bell(1024);
/// assert!(selector < 8);
/// assert!(amount < 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit, never zero)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is mapped to 1 since xorshift never leaves the zero state.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        self.state = step(self.state);
        scramble(self.state)
    }

    /// Uniform draw in `[0, 2^31)`.
    ///
    /// Only the high bits of the xorshift* output are used; the low bits are
    /// the weakest part of the generator.
    pub fn uniform(&mut self) -> u32 {
        (self.next() >> 33) as u32
    }

    /// Uniform draw in `[0, max)`.
    ///
    /// # Panics
    /// Panics if `max` is zero
    pub fn below(&mut self, max: u32) -> u32 {
        assert!(max > 0, "max must be positive");
        self.uniform() % max
    }

    /// Approximately bell-shaped draw in `[0, max)`.
    ///
    /// Averages three uniform draws, each reduced modulo `max`, and retries
    /// until the result falls in range. Biases amounts toward the middle of
    /// the range.
    ///
    /// # Panics
    /// Panics if `max` is zero
    pub fn bell(&mut self, max: u32) -> u32 {
        assert!(max > 0, "max must be positive");
        loop {
            let sum: u64 = (0..3).map(|_| u64::from(self.uniform() % max)).sum();
            let value = (sum / 3) as u32;
            if value < max {
                return value;
            }
        }
    }

    /// Get current RNG state (for replay)
    ///
    /// ```
    /// use bank_simulator_core::RngManager;
    ///
    /// let mut rng = RngManager::new(7);
    /// rng.next();
    /// let mut resumed = RngManager::new(rng.get_state());
    /// assert_eq!(rng.next(), resumed.next());
    /// ```
    pub fn get_state(&self) -> u64 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        let rng = RngManager::new(0);
        assert_ne!(rng.get_state(), 0, "Zero seed should be converted to 1");
    }

    #[test]
    #[should_panic(expected = "max must be positive")]
    fn test_below_zero_max() {
        let mut rng = RngManager::new(12345);
        rng.below(0);
    }

    #[test]
    fn test_uniform_fits_in_31_bits() {
        let mut rng = RngManager::new(12345);
        for _ in 0..1000 {
            assert!(rng.uniform() < (1 << 31));
        }
    }

    #[test]
    fn test_bell_concentrates_toward_middle() {
        let mut rng = RngManager::new(4242);
        let max = 900;
        let draws = 6000;
        let middle = (0..draws)
            .map(|_| rng.bell(max))
            .filter(|v| (300..600).contains(v))
            .count();

        // A uniform draw lands in the middle third a third of the time;
        // the average of three lands there roughly two thirds of the time.
        assert!(
            middle > draws / 2,
            "bell draw not concentrated: {} of {} in middle third",
            middle,
            draws
        );
    }

    #[test]
    fn test_bell_max_one_is_always_zero() {
        let mut rng = RngManager::new(99);
        for _ in 0..50 {
            assert_eq!(rng.bell(1), 0);
        }
    }
}
