//! Cyclic barrier with a last-arriver action
//!
//! Every party calls [`CyclicBarrier::arrive_and_wait`] once per generation.
//! The party that completes the generation runs the supplied action while
//! the others are still blocked, then the action's result is handed to every
//! party of that generation and the barrier resets for the next one.
//!
//! # Critical Invariants
//!
//! 1. **Full barrier**: no party returns from generation `g` before the last
//!    arriver's action for `g` has completed
//! 2. **Single action**: exactly one action runs per generation
//! 3. **Shared outcome**: all parties of a generation observe the same result

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// The barrier was abandoned by a party that could not continue
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("barrier broken: a party abandoned the rendezvous")]
pub struct BarrierBroken;

/// Result of one arrival
#[derive(Debug, Clone, PartialEq)]
pub struct Arrival<T> {
    /// True for the party that ran the action
    pub is_leader: bool,
    /// Generation number the arrival belonged to (starts at 0)
    pub generation: u64,
    /// Result of the last arriver's action
    pub outcome: T,
}

#[derive(Debug)]
struct BarrierState<T> {
    /// Parties still expected in the current generation
    remaining: usize,
    generation: u64,
    /// Outcome of the most recently completed generation
    last_outcome: Option<T>,
    broken: bool,
}

/// Reusable barrier for a fixed number of parties
#[derive(Debug)]
pub struct CyclicBarrier<T> {
    parties: usize,
    state: Mutex<BarrierState<T>>,
    released: Condvar,
}

impl<T: Clone> CyclicBarrier<T> {
    /// Create a barrier for `parties` participants
    ///
    /// # Panics
    /// Panics if `parties` is zero
    pub fn new(parties: usize) -> Self {
        assert!(parties > 0, "barrier needs at least one party");
        Self {
            parties,
            state: Mutex::new(BarrierState {
                remaining: parties,
                generation: 0,
                last_outcome: None,
                broken: false,
            }),
            released: Condvar::new(),
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Number of completed generations
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Arrive at the barrier and block until the generation completes.
    ///
    /// `action` runs only on the last arriver, with the barrier lock held, so
    /// it must not call back into this barrier.
    pub fn arrive_and_wait<F>(&self, action: F) -> Result<Arrival<T>, BarrierBroken>
    where
        F: FnOnce() -> T,
    {
        let mut state = self.state.lock();
        if state.broken {
            return Err(BarrierBroken);
        }

        let generation = state.generation;
        state.remaining -= 1;

        if state.remaining == 0 {
            let outcome = action();
            state.last_outcome = Some(outcome.clone());
            state.remaining = self.parties;
            state.generation += 1;
            self.released.notify_all();
            return Ok(Arrival {
                is_leader: true,
                generation,
                outcome,
            });
        }

        // Generation counter guards against spurious wakeups
        while state.generation == generation && !state.broken {
            self.released.wait(&mut state);
        }

        if state.generation == generation {
            return Err(BarrierBroken);
        }

        match state.last_outcome.clone() {
            Some(outcome) => Ok(Arrival {
                is_leader: false,
                generation,
                outcome,
            }),
            None => Err(BarrierBroken),
        }
    }

    /// Break the barrier: wake all waiters with [`BarrierBroken`] and fail
    /// every later arrival.
    pub fn abandon(&self) {
        let mut state = self.state.lock();
        state.broken = true;
        self.released.notify_all();
    }

    pub fn is_broken(&self) -> bool {
        self.state.lock().broken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_single_party_is_always_leader() {
        let barrier = CyclicBarrier::new(1);
        for expected in 0..3u64 {
            let arrival = barrier.arrive_and_wait(|| expected * 10).unwrap();
            assert!(arrival.is_leader);
            assert_eq!(arrival.generation, expected);
            assert_eq!(arrival.outcome, expected * 10);
        }
        assert_eq!(barrier.generation(), 3);
    }

    #[test]
    fn test_one_action_per_generation() {
        let parties = 4;
        let rounds = 25;
        let barrier = CyclicBarrier::new(parties);
        let actions = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..parties {
                scope.spawn(|| {
                    for round in 0..rounds {
                        let arrival = barrier
                            .arrive_and_wait(|| actions.fetch_add(1, Ordering::SeqCst))
                            .unwrap();
                        assert_eq!(arrival.generation, round as u64);
                        // Every party sees the count taken by this round's leader
                        assert_eq!(arrival.outcome, round);
                    }
                });
            }
        });

        assert_eq!(actions.load(Ordering::SeqCst), rounds);
    }

    #[test]
    fn test_exactly_one_leader_per_generation() {
        let parties = 8;
        let barrier = CyclicBarrier::new(parties);
        let leaders = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..parties {
                scope.spawn(|| {
                    let arrival = barrier.arrive_and_wait(|| ()).unwrap();
                    if arrival.is_leader {
                        leaders.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(leaders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_abandon_wakes_waiters() {
        let barrier: CyclicBarrier<()> = CyclicBarrier::new(3);

        std::thread::scope(|scope| {
            let waiter = scope.spawn(|| barrier.arrive_and_wait(|| ()));
            while barrier.state.lock().remaining == 3 {
                std::thread::yield_now();
            }
            barrier.abandon();
            assert_eq!(waiter.join().unwrap(), Err(BarrierBroken));
        });

        assert!(barrier.is_broken());
        assert_eq!(barrier.arrive_and_wait(|| ()), Err(BarrierBroken));
    }
}
