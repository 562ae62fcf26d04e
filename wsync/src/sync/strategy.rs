//! How an acquisition waits between two attempts.
//!
//! [`Lock`] and [`Semaphore`] acquire with one retry loop, [`acquire`]. What
//! differs between their blocking and busy-spin variants is only what happens
//! when an attempt fails: [`Suspend`] sleeps on the word, [`Spin`] keeps the
//! processor and polls.
//!
//! [`Lock`]: super::Lock
//! [`Semaphore`]: super::Semaphore

use crate::TimedOut;
use core::sync::atomic::AtomicU32;
use crossbeam_utils::Backoff;
use std::time::{Duration, Instant};

pub(crate) trait WaitStrategy {
    /// Waits until `word` may have moved away from `observed`, returning no
    /// later than `deadline`.
    fn pause(&self, word: &AtomicU32, observed: u32, deadline: Option<Instant>);
}

/// Sleeps on the word until it is notified or the deadline passes.
pub(crate) struct Suspend;

impl WaitStrategy for Suspend {
    fn pause(&self, word: &AtomicU32, observed: u32, deadline: Option<Instant>) {
        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        if remaining == Some(Duration::ZERO) {
            return;
        }
        atomwait::wait(word, observed, remaining);
    }
}

/// Never gives up the processor.
pub(crate) struct Spin {
    backoff: Backoff,
}

impl Spin {
    pub(crate) fn new() -> Self {
        Self {
            backoff: Backoff::new(),
        }
    }
}

impl WaitStrategy for Spin {
    fn pause(&self, _word: &AtomicU32, _observed: u32, _deadline: Option<Instant>) {
        self.backoff.spin();
    }
}

/// Converts a timeout into a deadline. A timeout that cannot be represented
/// is infinite.
pub(crate) fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Runs `attempt` until it succeeds or `deadline` passes.
///
/// A failed attempt reports the value of the word it observed; the strategy
/// waits on exactly that value, so a word that changed in between is
/// retried at once instead of being slept on. The first attempt is always
/// made, even with a deadline in the past.
pub(crate) fn acquire<T>(
    word: &AtomicU32,
    deadline: Option<Instant>,
    strategy: impl WaitStrategy,
    mut attempt: impl FnMut() -> Result<T, u32>,
) -> Result<T, TimedOut> {
    loop {
        match attempt() {
            Ok(v) => return Ok(v),
            Err(observed) => {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return Err(TimedOut);
                }
                strategy.pause(word, observed, deadline);
            }
        }
    }
}
