//! Condition variable over a generation counter.

use super::lock::Lock;
use crate::{TimedOut, WaitResult, WaitToken};
use core::sync::atomic::{AtomicU32, Ordering};
use log::trace;
use std::time::Duration;

/// A Condition Variable
///
/// Condition variables let a thread sleep until another thread announces that
/// something has changed. They are used together with a [`Lock`] that guards
/// a predicate: the predicate is always checked with the lock held before
/// deciding to wait, and re-checked after every wake-up.
///
/// The state is a single generation counter. Every [`signal`] advances it by
/// exactly one, and a waiter sleeps only while the generation is still the
/// one it read before releasing the lock. A signal sent between the release
/// and the sleep therefore cannot be missed. The condition variable protects
/// nothing by itself.
///
/// ```
/// use std::time::Duration;
/// use wsync::{ConditionVariable, Lock};
///
/// static LOCK: Lock = Lock::new();
/// static READY: ConditionVariable = ConditionVariable::new();
///
/// LOCK.waitinf_acquire();
/// // Nobody signals, so the wait runs into its timeout and returns without
/// // the lock.
/// assert!(READY.wait(&LOCK, Duration::from_millis(10)).is_err());
/// assert!(!LOCK.is_locked());
/// ```
///
/// [`signal`]: ConditionVariable::signal
#[repr(transparent)]
#[derive(Debug, Default)]
pub struct ConditionVariable {
    generation: AtomicU32,
}

impl ConditionVariable {
    /// Creates a new condition variable which is ready to be waited on and
    /// signaled.
    #[inline]
    pub const fn new() -> Self {
        Self {
            generation: AtomicU32::new(0),
        }
    }

    /// Resets the generation to zero in place.
    ///
    /// The condition variable must not be in use.
    pub fn init(&self) {
        self.generation.store(0, Ordering::SeqCst);
    }

    /// Releases `lock`, sleeps until signaled, and reacquires `lock`.
    ///
    /// The caller must hold `lock`. The sleep and the reacquisition are each
    /// bounded by the full `timeout`, so a successful call may take up to
    /// twice as long as `timeout` when the lock is contended after the
    /// signal.
    ///
    /// # Errors
    ///
    /// [`TimedOut`] if no signal arrived in time, or if the lock could not be
    /// reacquired in time after one did. In both cases `lock` is **not** held
    /// on return.
    pub fn wait(&self, lock: &Lock, timeout: Duration) -> Result<(), TimedOut> {
        let generation = self.generation.load(Ordering::SeqCst);
        lock.release();
        if atomwait::wait(&self.generation, generation, Some(timeout)) == WaitResult::TimedOut {
            trace!("condvar: {:p} wait timed out", &self.generation);
            return Err(TimedOut);
        }
        lock.wait_acquire(timeout)
    }

    /// Releases `lock`, sleeps until signaled, and reacquires `lock`, with no
    /// timeout.
    ///
    /// The caller must hold `lock`, and holds it again on return.
    pub fn waitinf(&self, lock: &Lock) {
        let generation = self.generation.load(Ordering::SeqCst);
        lock.release();
        atomwait::wait(&self.generation, generation, None);
        lock.waitinf_acquire();
    }

    /// Releases `lock` and registers `callback` to run once this condition
    /// variable is signaled, without blocking.
    ///
    /// The caller must hold `lock`. The lock is released before this returns
    /// and is **not** reacquired for the callback; a callback that needs it
    /// acquires it itself. The callback runs later on the dispatcher thread
    /// of [`atomwait`] with [`WaitResult::Ok`] after a signal,
    /// [`WaitResult::TimedOut`] once `timeout` elapses (`None` waits forever),
    /// or [`WaitResult::NotEqual`] if a signal slipped in between the release
    /// and the registration. No order is promised between the callbacks of
    /// different waits.
    ///
    /// The returned token withdraws the wait with
    /// [`atomwait::cancel_wait_async`].
    ///
    /// # Errors
    ///
    /// Fails only if the dispatcher thread cannot be started. `lock` is then
    /// still held.
    pub fn wait_async(
        &self,
        lock: &Lock,
        callback: impl FnOnce(WaitResult) + Send + 'static,
        timeout: Option<Duration>,
    ) -> std::io::Result<WaitToken> {
        atomwait::start_dispatcher()?;
        let generation = self.generation.load(Ordering::SeqCst);
        lock.release();
        atomwait::wait_async(&self.generation, generation, timeout, callback)
    }

    /// Wakes up to `n` threads waiting on this condition variable and returns
    /// how many were woken.
    ///
    /// The generation advances exactly once per call, whatever `n` is.
    /// Signals are not buffered: with nobody waiting, a signal has no effect
    /// on future waits.
    pub fn signal(&self, n: u32) -> u32 {
        self.generation.fetch_add(1, Ordering::SeqCst);
        atomwait::notify(&self.generation, n)
    }

    /// Wakes up all threads waiting on this condition variable.
    ///
    /// To wake up only some, see [`signal`].
    ///
    /// [`signal`]: ConditionVariable::signal
    pub fn broadcast(&self) -> u32 {
        self.signal(u32::MAX)
    }

    /// Returns the current generation, i.e. the number of signals sent since
    /// [`init`], wrapping on overflow.
    ///
    /// [`init`]: ConditionVariable::init
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::SeqCst)
    }

    /// The word this condition variable lives in, for diagnostics such as
    /// [`atomwait::waiter_count`].
    pub fn as_word(&self) -> &AtomicU32 {
        &self.generation
    }
}
