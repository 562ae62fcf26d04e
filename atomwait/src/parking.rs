//! # Wait-on-address and notify-on-address.
//!
//! The two calls in this module are the only blocking mechanism the rest of
//! the workspace is built on:
//!
//! - [`wait`] suspends the calling thread while a 32-bit word still holds an
//!   expected value, until it is notified or a timeout elapses.
//! - [`notify`] wakes up to `count` threads suspended on a word.
//!
//! Waiters live in a *parking lot*: a fixed table of buckets keyed by the
//! address of the word, each bucket a FIFO of waiters protected by a
//! [`SpinLock`]. The word itself carries no bookkeeping, so any `AtomicU32`
//! anywhere in memory can be waited on.
//!
//! The compare in [`wait`] is performed under the same bucket lock that
//! [`notify`] takes. A thread that stores a new value and then notifies can
//! therefore never miss a waiter that observed the old value: either the
//! waiter was queued before the notifier scanned the bucket, or the waiter's
//! compare runs after the store and fails with [`WaitResult::NotEqual`].
//!
//! Wake-ups carry no ordering promise. Waiters are dequeued in the order they
//! arrived within a bucket, but callers must re-check their condition after
//! every return; a return is never a statement that the condition holds.

use crate::{dispatch::WaitToken, spinlock::SpinLock};
use crossbeam_utils::{
    CachePadded,
    sync::{Parker, Unparker},
};
use log::trace;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

/// The outcome of a wait on an address.
///
/// The discriminants are the raw result codes of the host wait primitive and
/// can be converted losslessly with [`u32::from`] and
/// [`WaitResult::try_from`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum WaitResult {
    /// The waiter was woken by a notify.
    Ok = 0,
    /// The word did not hold the expected value; the caller never slept.
    NotEqual = 1,
    /// The timeout elapsed before a notify arrived.
    TimedOut = 2,
}

/// Number of buckets in the parking lot. Must be a power of two.
const BUCKETS: usize = 64;

static TABLE: [CachePadded<Bucket>; BUCKETS] =
    [const { CachePadded::new(Bucket::new()) }; BUCKETS];

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// How a dequeued waiter is told that it was woken.
pub(crate) enum Wakeup {
    Thread {
        unparker: Unparker,
        woken: Arc<AtomicBool>,
    },
    Async(WaitToken),
}

impl Wakeup {
    fn wake(self) {
        match self {
            Wakeup::Thread { unparker, woken } => {
                woken.store(true, Ordering::Release);
                unparker.unpark();
            }
            Wakeup::Async(token) => crate::dispatch::complete(token, WaitResult::Ok),
        }
    }
}

pub(crate) struct Waiter {
    addr: usize,
    id: u64,
    wakeup: Wakeup,
}

struct Bucket {
    queue: SpinLock<VecDeque<Waiter>>,
}

impl Bucket {
    const fn new() -> Self {
        Self {
            queue: SpinLock::new(VecDeque::new()),
        }
    }
}

/// Allocates a fresh identifier for a waiter or an asynchronous wait.
pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[inline]
pub(crate) fn addr_of(word: &AtomicU32) -> usize {
    word as *const AtomicU32 as usize
}

fn bucket_of(addr: usize) -> &'static Bucket {
    // Fibonacci hashing; words are 4-byte aligned so the low bits carry nothing.
    let hash = ((addr as u64) >> 2).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    &TABLE[(hash >> (u64::BITS - BUCKETS.trailing_zeros())) as usize]
}

/// Removes the waiter `id` queued on `addr`.
///
/// Returns `false` if it is no longer queued, i.e. a notify already took it.
pub(crate) fn dequeue(addr: usize, id: u64) -> bool {
    let mut queue = bucket_of(addr).queue.lock();
    let removed = queue
        .iter()
        .position(|w| w.id == id)
        .and_then(|idx| queue.remove(idx))
        .is_some();
    queue.unlock();
    removed
}

/// Queues an asynchronous waiter for `token` on `word` if it still holds
/// `expected`.
///
/// On failure the immediate result is returned instead and nothing is
/// queued. `immediate_timeout` reports a zero timeout.
pub(crate) fn enqueue_async(
    word: &AtomicU32,
    expected: u32,
    token: WaitToken,
    immediate_timeout: bool,
) -> Result<(), WaitResult> {
    let addr = addr_of(word);
    let mut queue = bucket_of(addr).queue.lock();
    let result = if word.load(Ordering::SeqCst) != expected {
        Err(WaitResult::NotEqual)
    } else if immediate_timeout {
        Err(WaitResult::TimedOut)
    } else {
        queue.push_back(Waiter {
            addr,
            id: token.id(),
            wakeup: Wakeup::Async(token),
        });
        Ok(())
    };
    queue.unlock();
    result
}

/// Suspends the calling thread while `word` holds `expected`.
///
/// `timeout` of `None` waits forever. A zero timeout never sleeps: it
/// reports [`WaitResult::NotEqual`] or [`WaitResult::TimedOut`] after the
/// compare. A timeout too large to be represented as a deadline is treated
/// as infinite.
///
/// Spurious wake-ups of the underlying parker are absorbed here; the call
/// returns [`WaitResult::Ok`] only after a [`notify`] dequeued this waiter.
pub fn wait(word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> WaitResult {
    let addr = addr_of(word);
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
    let bucket = bucket_of(addr);

    let mut queue = bucket.queue.lock();
    if word.load(Ordering::SeqCst) != expected {
        queue.unlock();
        return WaitResult::NotEqual;
    }
    if timeout == Some(Duration::ZERO) {
        queue.unlock();
        return WaitResult::TimedOut;
    }

    let parker = Parker::new();
    let woken = Arc::new(AtomicBool::new(false));
    let id = next_id();
    queue.push_back(Waiter {
        addr,
        id,
        wakeup: Wakeup::Thread {
            unparker: parker.unparker().clone(),
            woken: woken.clone(),
        },
    });
    queue.unlock();
    trace!("wait: {addr:#x} parked as #{id} (expected {expected})");

    loop {
        if woken.load(Ordering::Acquire) {
            trace!("wait: {addr:#x} #{id} woken");
            return WaitResult::Ok;
        }
        match deadline {
            None => parker.park(),
            Some(deadline) if Instant::now() < deadline => parker.park_deadline(deadline),
            Some(_) => {
                if dequeue(addr, id) {
                    trace!("wait: {addr:#x} #{id} timed out");
                    return WaitResult::TimedOut;
                }
                // A notifier already dequeued us and is about to unpark.
                while !woken.load(Ordering::Acquire) {
                    parker.park();
                }
                return WaitResult::Ok;
            }
        }
    }
}

/// Wakes up to `count` waiters suspended on `word`, synchronous or
/// asynchronous, and returns how many were woken.
///
/// Waiters on other words that share the bucket are left alone. Passing
/// [`u32::MAX`] wakes every waiter.
pub fn notify(word: &AtomicU32, count: u32) -> u32 {
    if count == 0 {
        return 0;
    }
    let addr = addr_of(word);
    let mut woken = Vec::new();

    let mut queue = bucket_of(addr).queue.lock();
    let mut idx = 0;
    while idx < queue.len() && (woken.len() as u32) < count {
        if queue[idx].addr == addr {
            woken.extend(queue.remove(idx));
        } else {
            idx += 1;
        }
    }
    queue.unlock();

    let n = woken.len() as u32;
    if n != 0 {
        trace!("notify: {addr:#x} woke {n} of at most {count}");
    }
    for waiter in woken {
        waiter.wakeup.wake();
    }
    n
}

/// Returns the number of waiters, synchronous and asynchronous, currently
/// queued on `word`.
///
/// The answer may be stale as soon as it is returned; it is intended for
/// diagnostics and for tests that need to know a thread has gone to sleep.
pub fn waiter_count(word: &AtomicU32) -> usize {
    let addr = addr_of(word);
    let queue = bucket_of(addr).queue.lock();
    let count = queue.iter().filter(|w| w.addr == addr).count();
    queue.unlock();
    count
}
