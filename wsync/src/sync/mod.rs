//! # Synchronization Primitives.
//!
//! Threads that share memory must agree on who touches what, and when. The
//! primitives in this module make that agreement out of nothing but a 32-bit
//! word per primitive and the wait/notify pair of [`atomwait`]. A primitive
//! that is available costs one atomic instruction; only a thread that has to
//! wait goes to sleep, on the word itself.
//!
//! - [`Lock`]: mutual exclusion. Only one thread holds it at a time.
//! - [`Semaphore`]: a count of available units, taken and returned in
//!   batches.
//! - [`ConditionVariable`]: sleeping until another thread announces a
//!   change, in tandem with a [`Lock`].
//!
//! | Primitive             | Blocks Thread?       | Fair? | Typical Use Case                                 |
//! |-----------------------|----------------------|-------|--------------------------------------------------|
//! | [`SpinLock`]          | No (busy wait)       | No    | Bookkeeping inside the parking lot               |
//! | [`Lock`]              | Yes, or spins        | No    | Exclusive access to shared data                  |
//! | [`ConditionVariable`] | Yes, or asynchronous | No    | Waiting for a predicate guarded by a [`Lock`]    |
//! | [`Semaphore`]         | Yes, or spins        | No    | Limiting access to a bounded resource            |
//!
//! None of them is fair: a wake-up goes to whichever sleeper the parking lot
//! picks, and a thread that never slept may take the primitive first. Every
//! blocking call re-checks its condition after each wake-up, so spurious and
//! stolen wake-ups only cost another round.
//!
//! Timeouts are measured against [`Instant`] and bound the whole call, not a
//! single sleep. The one exception is [`ConditionVariable::wait`], which
//! reacquires its lock with a fresh budget.
//!
//! [`SpinLock`]: atomwait::SpinLock
//! [`Instant`]: std::time::Instant

pub mod condition_variable;
pub mod lock;
pub mod semaphore;
mod strategy;

pub use condition_variable::*;
pub use lock::*;
pub use semaphore::*;
