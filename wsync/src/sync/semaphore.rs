//! # Semaphore.
//!
//! A counting semaphore in one word. The word holds the number of units that
//! are available right now. Units are taken and returned in batches:
//! [`Semaphore::release`] adds `k` units and wakes up to `k` sleepers, and
//! every acquisition takes all of the `k` units it asks for or none at all.
//!
//! Acquisition is an optimistic loop: read the count, give up (or sleep) if it
//! is short, otherwise compare-and-swap it down by `k`. A lost race only
//! re-reads the word. A failed acquisition never writes to the word, so a
//! short count is never driven below zero, not even briefly.
//!
//! A semaphore created with zero units is a signal: one thread waits for a
//! unit that another thread releases when an event has happened.
//!
//! #### Usage Example
//!
//! ```rust
//! use wsync::Semaphore;
//!
//! static SLOTS: Semaphore = Semaphore::new(3);
//!
//! let left = SLOTS.waitinf_acquire(2);
//! assert_eq!(left, 1);
//! assert!(SLOTS.try_acquire(2).is_err());
//! SLOTS.release(2);
//! ```

use super::strategy::{Spin, Suspend, acquire, deadline_after};
use crate::{TimedOut, WouldBlock};
use core::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Counting semaphore.
#[repr(transparent)]
#[derive(Debug, Default)]
pub struct Semaphore {
    count: AtomicU32,
}

impl Semaphore {
    /// Creates a new semaphore holding `units` available units.
    #[inline]
    pub const fn new(units: u32) -> Self {
        Self {
            count: AtomicU32::new(units),
        }
    }

    /// Resets the semaphore to `units` available units in place.
    ///
    /// Sleepers are not woken; the semaphore must not be in use.
    pub fn init(&self, units: u32) {
        self.count.store(units, Ordering::SeqCst);
    }

    /// Takes `k` units if that many are available. On failure, returns the
    /// count that was found short.
    fn try_take(&self, k: u32) -> Result<u32, u32> {
        let mut current = self.count.load(Ordering::SeqCst);
        loop {
            if current < k {
                return Err(current);
            }
            match self.count.compare_exchange_weak(
                current,
                current - k,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(current - k),
                Err(actual) => current = actual,
            }
        }
    }

    /// Takes `k` units without blocking and returns the number of units left.
    ///
    /// # Errors
    ///
    /// [`WouldBlock`] if fewer than `k` units are available. The semaphore is
    /// left untouched.
    pub fn try_acquire(&self, k: u32) -> Result<u32, WouldBlock> {
        self.try_take(k).map_err(|_| WouldBlock)
    }

    /// Takes `k` units, sleeping while fewer are available, and returns the
    /// number of units left.
    ///
    /// `timeout` bounds the whole call, however many times the caller is
    /// woken without getting its units.
    ///
    /// # Errors
    ///
    /// [`TimedOut`] if the units could not be taken in time.
    pub fn wait_acquire(&self, k: u32, timeout: Duration) -> Result<u32, TimedOut> {
        acquire(&self.count, deadline_after(timeout), Suspend, || {
            self.try_take(k)
        })
    }

    /// Takes `k` units, sleeping for as long as it takes, and returns the
    /// number of units left.
    pub fn waitinf_acquire(&self, k: u32) -> u32 {
        // Without a deadline `acquire` only returns on success.
        loop {
            if let Ok(left) = acquire(&self.count, None, Suspend, || self.try_take(k)) {
                return left;
            }
        }
    }

    /// Takes `k` units, spinning for at most `timeout`, and returns the number
    /// of units left.
    ///
    /// # Errors
    ///
    /// [`TimedOut`] if the units could not be taken in time.
    pub fn busyspin_wait_acquire(&self, k: u32, timeout: Duration) -> Result<u32, TimedOut> {
        acquire(&self.count, deadline_after(timeout), Spin::new(), || {
            self.try_take(k)
        })
    }

    /// Returns `k` units and wakes up to `k` threads sleeping on the
    /// semaphore. Returns the number of units available before the release.
    ///
    /// Never blocks. Releasing more than was acquired is not checked.
    pub fn release(&self, k: u32) -> u32 {
        let previous = self.count.fetch_add(k, Ordering::SeqCst);
        atomwait::notify(&self.count, k);
        previous
    }

    /// Returns the number of units available right now.
    pub fn available(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// The word this semaphore lives in, for diagnostics such as
    /// [`atomwait::waiter_count`].
    pub fn as_word(&self) -> &AtomicU32 {
        &self.count
    }
}
