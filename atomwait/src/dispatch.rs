//! # Asynchronous waits.
//!
//! [`wait_async`] is the non-blocking counterpart of [`wait`]: it queues a
//! waiter on the word and returns a [`WaitToken`] immediately. The outcome
//! is delivered later by calling a one-shot callback on the *dispatcher*, a
//! single background thread owned by this crate.
//!
//! The dispatcher sleeps until either a completion is pushed to its queue or
//! the earliest pending deadline passes:
//!
//! ```text
//!   notify() ──dequeue──▶ completions (SegQueue) ──▶ dispatcher ──▶ callback(Ok)
//!   deadline passes ─────────────────────────────▶ dispatcher ──▶ callback(TimedOut)
//! ```
//!
//! A callback therefore never runs on the stack of the thread that registered
//! it, and never inside [`notify`]. Each callback runs at most once; it runs
//! exactly once unless the wait is withdrawn by [`cancel_wait_async`] first.
//! No ordering is promised between callbacks of different waits.
//!
//! [`wait`]: crate::wait
//! [`notify`]: crate::notify

use crate::{
    config::{AlreadyStarted, DispatcherConfig},
    parking::{self, WaitResult},
    spinlock::SpinLock,
};
use crossbeam_queue::SegQueue;
use crossbeam_utils::sync::{Parker, Unparker};
use log::{debug, error, trace};
use std::{
    collections::{BTreeMap, BTreeSet},
    panic::AssertUnwindSafe,
    sync::{OnceLock, atomic::AtomicU32},
    time::{Duration, Instant},
};

/// Identifies one pending asynchronous wait.
///
/// A token stays valid until its callback fires or the wait is cancelled.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct WaitToken(u64);

impl WaitToken {
    pub(crate) fn id(self) -> u64 {
        self.0
    }
}

type Callback = Box<dyn FnOnce(WaitResult) + Send + 'static>;

struct Pending {
    addr: usize,
    deadline: Option<Instant>,
    callback: Callback,
}

struct Registry {
    pending: BTreeMap<WaitToken, Pending>,
    deadlines: BTreeSet<(Instant, WaitToken)>,
}

impl Registry {
    const fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
            deadlines: BTreeSet::new(),
        }
    }

    fn remove(&mut self, token: WaitToken) -> Option<Pending> {
        let pending = self.pending.remove(&token)?;
        if let Some(deadline) = pending.deadline {
            self.deadlines.remove(&(deadline, token));
        }
        Some(pending)
    }

    /// Pops every deadline that has passed at `now`, with the address of the
    /// word each expired wait is queued on.
    fn take_expired(&mut self, now: Instant) -> Vec<(WaitToken, usize)> {
        let mut expired = Vec::new();
        while let Some(&(deadline, token)) = self.deadlines.first() {
            if deadline > now {
                break;
            }
            self.deadlines.pop_first();
            if let Some(pending) = self.pending.get_mut(&token) {
                pending.deadline = None;
                expired.push((token, pending.addr));
            }
        }
        expired
    }
}

struct Shared {
    registry: SpinLock<Registry>,
    completions: SegQueue<(WaitToken, WaitResult)>,
    unparker: OnceLock<Unparker>,
}

static SHARED: Shared = Shared {
    registry: SpinLock::new(Registry::new()),
    completions: SegQueue::new(),
    unparker: OnceLock::new(),
};

/// Configuration for the next start. `None` once the dispatcher runs.
static STARTUP: SpinLock<Option<DispatcherConfig>> = SpinLock::new(Some(DispatcherConfig::new()));

pub(crate) fn configure(config: DispatcherConfig) -> Result<(), AlreadyStarted> {
    let mut startup = STARTUP.lock();
    let result = match startup.as_mut() {
        Some(slot) => {
            debug!(
                "dispatch: configured as {:?} with {:#x} bytes of stack",
                config.name, config.stack_size
            );
            *slot = config;
            Ok(())
        }
        None => Err(AlreadyStarted),
    };
    startup.unlock();
    result
}

/// Starts the dispatcher thread if it is not running yet.
///
/// Asynchronous waits start it on demand; calling this up front moves the
/// cost, and the only failure point, out of the first [`wait_async`].
///
/// # Errors
///
/// Propagates the error of the host if the thread cannot be spawned.
pub fn start_dispatcher() -> std::io::Result<()> {
    if SHARED.unparker.get().is_some() {
        return Ok(());
    }
    let mut startup = STARTUP.lock();
    let Some(config) = (*startup).clone() else {
        // Lost the race against another starter.
        startup.unlock();
        return Ok(());
    };

    let parker = Parker::new();
    let unparker = parker.unparker().clone();
    let result = std::thread::Builder::new()
        .name(config.name.to_string())
        .stack_size(config.stack_size)
        .spawn(move || run(parker))
        .map(|_| {
            debug!("dispatch: started {:?}", config.name);
            let _ = SHARED.unparker.set(unparker);
            *startup = None;
        });
    startup.unlock();
    result
}

fn kick() {
    if let Some(unparker) = SHARED.unparker.get() {
        unparker.unpark();
    }
}

/// Hands the outcome of `token` to the dispatcher.
pub(crate) fn complete(token: WaitToken, result: WaitResult) {
    SHARED.completions.push((token, result));
    kick();
}

fn fire(token: WaitToken, result: WaitResult) {
    let mut registry = SHARED.registry.lock();
    let pending = registry.remove(token);
    registry.unlock();

    match pending {
        Some(pending) => {
            trace!("dispatch: {token:?} completed with {result:?}");
            if std::panic::catch_unwind(AssertUnwindSafe(move || (pending.callback)(result)))
                .is_err()
            {
                error!("dispatch: callback of {token:?} panicked");
            }
        }
        None => trace!("dispatch: {token:?} was cancelled before completion"),
    }
}

fn run(parker: Parker) {
    loop {
        while let Some((token, result)) = SHARED.completions.pop() {
            fire(token, result);
        }

        let mut registry = SHARED.registry.lock();
        let expired = registry.take_expired(Instant::now());
        registry.unlock();
        for (token, addr) in expired {
            // Losing the dequeue means a notify took the waiter; its
            // completion is already on the queue.
            if parking::dequeue(addr, token.id()) {
                fire(token, WaitResult::TimedOut);
            }
        }

        let registry = SHARED.registry.lock();
        let next = registry.deadlines.first().map(|&(deadline, _)| deadline);
        registry.unlock();

        if !SHARED.completions.is_empty() {
            continue;
        }
        match next {
            Some(deadline) => parker.park_deadline(deadline),
            None => parker.park(),
        }
    }
}

/// Registers an asynchronous wait on `word` for as long as it holds
/// `expected`, and returns without blocking.
///
/// `callback` runs once on the dispatcher thread with:
/// - [`WaitResult::Ok`] when a [`notify`] wakes this waiter,
/// - [`WaitResult::TimedOut`] when `timeout` elapses first (`None` never
///   times out; a zero timeout completes at once),
/// - [`WaitResult::NotEqual`] when `word` already differed from `expected`.
///
/// The word is identified by its address only and is never dereferenced
/// after registration, so it may be freed while the wait is pending; the
/// wait then simply runs into its timeout.
///
/// # Errors
///
/// Fails only if the dispatcher thread has to be started and cannot be.
///
/// [`notify`]: crate::notify
pub fn wait_async(
    word: &AtomicU32,
    expected: u32,
    timeout: Option<Duration>,
    callback: impl FnOnce(WaitResult) + Send + 'static,
) -> std::io::Result<WaitToken> {
    start_dispatcher()?;

    let token = WaitToken(parking::next_id());
    let addr = parking::addr_of(word);
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

    // The callback must be findable before a notify can see the waiter.
    let mut registry = SHARED.registry.lock();
    registry.pending.insert(
        token,
        Pending {
            addr,
            deadline: None,
            callback: Box::new(callback),
        },
    );
    registry.unlock();

    match parking::enqueue_async(word, expected, token, timeout == Some(Duration::ZERO)) {
        Ok(()) => {
            if let Some(deadline) = deadline {
                // Armed only once queued, so an expiry always finds the waiter
                // or a completion in flight.
                let mut registry = SHARED.registry.lock();
                if let Some(pending) = registry.pending.get_mut(&token) {
                    pending.deadline = Some(deadline);
                    registry.deadlines.insert((deadline, token));
                }
                registry.unlock();
                kick();
            }
            trace!("dispatch: {token:?} queued on {addr:#x} (expected {expected})");
        }
        Err(result) => complete(token, result),
    }
    Ok(token)
}

/// Withdraws a pending asynchronous wait.
///
/// Returns `true` if the wait was still pending; its callback will then
/// never run. Returns `false` if the callback already ran or is running, or
/// if the token is unknown.
pub fn cancel_wait_async(token: WaitToken) -> bool {
    let mut registry = SHARED.registry.lock();
    let pending = registry.remove(token);
    registry.unlock();

    match pending {
        Some(pending) => {
            parking::dequeue(pending.addr, token.id());
            trace!("dispatch: {token:?} cancelled");
            true
        }
        None => false,
    }
}

fn cancel_matching(filter: impl Fn(&Pending) -> bool) -> usize {
    let registry = SHARED.registry.lock();
    let tokens = registry
        .pending
        .iter()
        .filter(|(_, pending)| filter(pending))
        .map(|(token, _)| *token)
        .collect::<Vec<_>>();
    registry.unlock();

    tokens
        .into_iter()
        .filter(|token| cancel_wait_async(*token))
        .count()
}

/// Withdraws every pending asynchronous wait on `word` and returns how many
/// were withdrawn.
pub fn cancel_all_wait_asyncs_on(word: &AtomicU32) -> usize {
    let addr = parking::addr_of(word);
    cancel_matching(|pending| pending.addr == addr)
}

/// Withdraws every pending asynchronous wait and returns how many were
/// withdrawn.
pub fn cancel_all_wait_asyncs() -> usize {
    cancel_matching(|_| true)
}
