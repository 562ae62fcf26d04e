//! # Workers.
//!
//! Threads that use the primitives of this crate are spawned with a
//! [`WorkerBuilder`]. A worker gets a region of [`STACK_SIZE`] bytes by
//! default; on top of the requested stack a [`TLS_RESERVE`] is added so that
//! thread-local storage never eats into the stack the caller asked for.
//!
//! The region is allocated by the host for each worker, so a worker's stack
//! never overlaps the stack of the thread that created it.

use crate::WaitResult;
use core::sync::atomic::AtomicU32;
use log::debug;
use std::{
    borrow::Cow,
    thread::JoinHandle,
    time::{Duration, Instant},
};

/// Default stack size of a worker.
pub const STACK_SIZE: usize = 0x100000;

/// Bytes added to every worker stack for thread-local storage.
pub const TLS_RESERVE: usize = 0x1000;

/// Stack sizes are multiples of this.
pub const STACK_ALIGN: usize = 16;

const fn round_up(n: usize, align: usize) -> usize {
    n.div_ceil(align) * align
}

/// Failure to create a worker.
#[derive(Debug)]
pub enum WorkerError {
    /// The requested stack size is zero or not a multiple of [`STACK_ALIGN`].
    InvalidArgument,
    /// The host could not create the thread.
    Spawn(std::io::Error),
}

impl core::fmt::Display for WorkerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WorkerError::InvalidArgument => write!(
                f,
                "worker stack size must be a non-zero multiple of {STACK_ALIGN}"
            ),
            WorkerError::Spawn(e) => write!(f, "failed to spawn worker: {e}"),
        }
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkerError::InvalidArgument => None,
            WorkerError::Spawn(e) => Some(e),
        }
    }
}

/// A builder for a worker thread.
pub struct WorkerBuilder {
    name: Cow<'static, str>,
    stack_size: usize,
}

impl WorkerBuilder {
    /// Create a new worker builder for worker `name`.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            stack_size: STACK_SIZE,
        }
    }

    /// Set the size of the stack, excluding [`TLS_RESERVE`].
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Spawn the worker.
    ///
    /// # Errors
    ///
    /// [`WorkerError::InvalidArgument`] if the stack size is zero or not a
    /// multiple of [`STACK_ALIGN`]; [`WorkerError::Spawn`] if the host
    /// refuses to create the thread.
    pub fn spawn<F, T>(self, f: F) -> Result<JoinHandle<T>, WorkerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.stack_size == 0 || self.stack_size % STACK_ALIGN != 0 {
            return Err(WorkerError::InvalidArgument);
        }
        let region = self
            .stack_size
            .checked_add(round_up(TLS_RESERVE, STACK_ALIGN))
            .ok_or(WorkerError::InvalidArgument)?;
        debug!(
            "worker: spawning {:?} with {:#x} bytes of stack and TLS",
            self.name, region
        );
        std::thread::Builder::new()
            .name(self.name.into_owned())
            .stack_size(region)
            .spawn(f)
            .map_err(WorkerError::Spawn)
    }
}

/// Puts the current thread to sleep for at least `duration`.
///
/// The thread sleeps on a private word that nobody else can see, so the
/// sleep always runs into its timeout. This is a delay, not a point of
/// synchronization.
pub fn sleep(duration: Duration) {
    let word = AtomicU32::new(0);
    let Some(deadline) = Instant::now().checked_add(duration) else {
        // Too long to measure.
        loop {
            atomwait::wait(&word, 0, None);
        }
    };
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero()
            || atomwait::wait(&word, 0, Some(remaining)) == WaitResult::TimedOut
        {
            return;
        }
    }
}
