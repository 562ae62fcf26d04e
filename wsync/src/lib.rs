//! # wsync: synchronization built from a single word
//!
//! Every primitive in this crate is one [`AtomicU32`] and nothing else. The
//! word is changed with atomic instructions only; a thread that has to block
//! goes to sleep on the word itself with [`atomwait::wait`] and is woken with
//! [`atomwait::notify`]. There is no hidden allocation and no teardown: a
//! primitive may live in a `static`, on the stack, or inside any shared
//! structure, and is reset in place with `init`.
//!
//! The crate provides:
//!
//! - [`Lock`]: a binary lock with try, timed, infinite and busy-spin
//!   acquisition.
//! - [`Semaphore`]: a counting semaphore that acquires and releases many units
//!   at once, all-or-nothing.
//! - [`ConditionVariable`]: a generation counter paired with a [`Lock`],
//!   waited on synchronously or through a callback.
//! - [`sleep`]: a pure delay on a private word.
//! - [`WorkerBuilder`]: spawning of the threads that use all of the above.
//!
//! Failures are reported, never raised: try-variants fail with
//! [`WouldBlock`], blocking variants with [`TimedOut`]. Misuse, such as
//! releasing a lock that is not held, is not checked.
//!
//! [`AtomicU32`]: core::sync::atomic::AtomicU32
//! [`Lock`]: sync::Lock
//! [`Semaphore`]: sync::Semaphore
//! [`ConditionVariable`]: sync::ConditionVariable
//! [`sleep`]: worker::sleep
//! [`WorkerBuilder`]: worker::WorkerBuilder

#![deny(missing_docs)]

pub mod sync;
pub mod worker;

pub use atomwait::{WaitResult, WaitToken, WouldBlock};
pub use sync::{ConditionVariable, Lock, Semaphore};
pub use worker::{WorkerBuilder, WorkerError, sleep};

/// A blocking operation gave up because its timeout elapsed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimedOut;

impl core::fmt::Display for TimedOut {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("the operation timed out")
    }
}

impl std::error::Error for TimedOut {}
