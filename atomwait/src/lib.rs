//! # atomwait: waiting on 32-bit words
//!
//! This crate provides the one primitive every blocking construct in the
//! workspace is built from: a thread may go to sleep *on a word*, and another
//! thread may wake the sleepers of that word.
//!
//! - [`wait`] and [`notify`] are the synchronous pair. A waiter sleeps only
//!   while the word still holds the value it expects, so a notifier that
//!   changes the word before notifying can never lose a wake-up.
//! - [`wait_async`] registers the same kind of wait without blocking and
//!   reports its [`WaitResult`] to a callback on a background dispatcher
//!   thread. Pending waits can be withdrawn with [`cancel_wait_async`],
//!   [`cancel_all_wait_asyncs_on`] and [`cancel_all_wait_asyncs`].
//! - [`DispatcherConfig`] names and sizes the dispatcher before it starts.
//!
//! The lot of sleeping threads is guarded by the [`SpinLock`] in
//! [`spinlock`], which never sleeps itself.
//!
//! ## Logging
//!
//! The crate emits records through the [`log`] facade: `trace` for every
//! park and wake, `debug` for dispatcher lifecycle, and `error` when an
//! asynchronous callback panics. Nothing is printed unless the application
//! installs a logger.

#![deny(missing_docs)]

pub mod config;
pub mod dispatch;
pub mod parking;
pub mod spinlock;

pub use config::{AlreadyStarted, DispatcherConfig};
pub use dispatch::{
    WaitToken, cancel_all_wait_asyncs, cancel_all_wait_asyncs_on, cancel_wait_async,
    start_dispatcher, wait_async,
};
pub use parking::{WaitResult, notify, wait, waiter_count};
pub use spinlock::{SpinLock, SpinLockGuard, WouldBlock};
