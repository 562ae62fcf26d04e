//! # Lock.
//!
//! A binary lock held in one word: `0` is free, `1` is held. It is taken with
//! a single compare-and-swap from `0` to `1` and released by storing `0` and
//! waking one sleeper.
//!
//! Unlike a `Mutex<T>`, a [`Lock`] guards no data and hands out no guard.
//! Whoever acquired it calls [`Lock::release`]; the lock does not know its
//! owner, so releasing it from another thread is allowed and releasing a lock
//! that is not held is a bug the lock cannot detect.
//!
//! There are five ways to acquire:
//!
//! | Method                               | Blocks?        | Gives up?        |
//! |--------------------------------------|----------------|------------------|
//! | [`Lock::try_acquire`]                | No             | Immediately      |
//! | [`Lock::wait_acquire`]               | Yes (sleeps)   | After a timeout  |
//! | [`Lock::waitinf_acquire`]            | Yes (sleeps)   | Never            |
//! | [`Lock::busyspin_wait_acquire`]      | Yes (spins)    | After a timeout  |
//! | [`Lock::busyspin_waitinf_acquire`]   | Yes (spins)    | Never            |
//!
//! The busy-spin variants never leave the processor. They only pay off when
//! the lock is expected to be held for less time than a sleep and a wake-up
//! take.

use super::strategy::{Spin, Suspend, acquire, deadline_after};
use crate::{TimedOut, WouldBlock};
use core::sync::atomic::{AtomicU32, Ordering};
use log::warn;
use std::time::Duration;

const FREE: u32 = 0;
const HELD: u32 = 1;

/// A binary lock in a single 32-bit word.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use wsync::Lock;
///
/// static LOCK: Lock = Lock::new();
///
/// LOCK.waitinf_acquire();
/// assert!(LOCK.try_acquire().is_err());
/// assert!(LOCK.wait_acquire(Duration::from_millis(10)).is_err());
/// LOCK.release();
/// assert!(LOCK.try_acquire().is_ok());
/// ```
#[repr(transparent)]
#[derive(Debug, Default)]
pub struct Lock {
    word: AtomicU32,
}

impl Lock {
    /// Creates a new lock in the free state.
    #[inline]
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(FREE),
        }
    }

    /// Resets the lock to the free state in place.
    ///
    /// Sleepers are not woken; the lock must not be in use.
    pub fn init(&self) {
        self.word.store(FREE, Ordering::SeqCst);
    }

    #[inline]
    fn try_take(&self) -> Result<(), u32> {
        self.word
            .compare_exchange(FREE, HELD, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
    }

    /// Attempts to acquire the lock without blocking.
    ///
    /// # Errors
    ///
    /// [`WouldBlock`] if the lock is held.
    pub fn try_acquire(&self) -> Result<(), WouldBlock> {
        self.try_take().map_err(|_| WouldBlock)
    }

    /// Acquires the lock, sleeping for at most `timeout` while it is held.
    ///
    /// A zero timeout still makes one attempt. Time spent across repeated
    /// wake-ups is accounted against the same deadline.
    ///
    /// # Errors
    ///
    /// [`TimedOut`] if the lock could not be taken in time.
    pub fn wait_acquire(&self, timeout: Duration) -> Result<(), TimedOut> {
        acquire(&self.word, deadline_after(timeout), Suspend, || {
            self.try_take()
        })
    }

    /// Acquires the lock, sleeping for as long as it takes.
    pub fn waitinf_acquire(&self) {
        let _ = acquire(&self.word, None, Suspend, || self.try_take());
    }

    /// Acquires the lock, spinning for at most `timeout` while it is held.
    ///
    /// # Errors
    ///
    /// [`TimedOut`] if the lock could not be taken in time.
    pub fn busyspin_wait_acquire(&self, timeout: Duration) -> Result<(), TimedOut> {
        acquire(&self.word, deadline_after(timeout), Spin::new(), || {
            self.try_take()
        })
    }

    /// Acquires the lock, spinning for as long as it takes.
    pub fn busyspin_waitinf_acquire(&self) {
        let _ = acquire(&self.word, None, Spin::new(), || self.try_take());
    }

    /// Releases the lock and wakes one thread sleeping on it.
    ///
    /// The caller must hold the lock.
    pub fn release(&self) {
        if self.word.swap(FREE, Ordering::SeqCst) == FREE {
            warn!("lock: {:p} released while free", &self.word);
        }
        atomwait::notify(&self.word, 1);
    }

    /// Returns whether the lock is currently held.
    ///
    /// The answer may be stale by the time it is used.
    pub fn is_locked(&self) -> bool {
        self.word.load(Ordering::SeqCst) != FREE
    }

    /// The word this lock lives in, for diagnostics such as
    /// [`atomwait::waiter_count`].
    pub fn as_word(&self) -> &AtomicU32 {
        &self.word
    }
}
