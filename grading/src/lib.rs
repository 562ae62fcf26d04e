//! A small test driver for the grader binaries of this workspace.
//!
//! Every crate registers its checks as plain functions and hands them to
//! [`TestDriver::start`], which runs each on a thread of its own and reports
//! the outcome in the familiar `test name ... ok` layout:
//!
//! ```ignore
//! fn main() {
//!     grading::TestDriver::start([
//!         &lock::smoke,
//!         &lock::parking,
//!     ]);
//! }
//! ```
//!
//! Names given on the command line select tests by their path without the
//! binary name (e.g. `lock::smoke`). Arguments starting with `-` are those
//! of the libtest harness and are ignored.
extern crate grading_derive;

pub use grading_derive::*;

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::{
    collections::BTreeSet,
    io::Write,
    sync::{OnceLock, mpsc},
    time::Duration,
};

#[doc(hidden)]
pub trait TestCase
where
    Self: Sync + Send,
{
    fn name(&'static self) -> &'static str;
    fn run(&'static self) -> bool;
}

impl<T> TestCase for T
where
    T: Fn() + Send + Sync + 'static,
{
    fn name(&'static self) -> &'static str {
        core::any::type_name::<T>()
    }
    fn run(&'static self) -> bool {
        print!("test {} ... ", core::any::type_name::<T>());
        let _ = std::io::stdout().flush();
        let outcome = std::thread::Builder::new()
            .name(core::any::type_name::<T>().into())
            .spawn(self)
            .map(|handle| handle.join().is_ok());
        match outcome {
            Ok(true) => {
                println!("ok");
                true
            }
            Ok(false) => {
                println!("FAILED");
                false
            }
            Err(e) => {
                println!("FAILED (spawn: {e})");
                false
            }
        }
    }
}

/// A driver for running tests.
pub struct TestDriver;

impl TestDriver {
    /// Run the given tests and exit the process, with a failure status if
    /// any of them failed.
    pub fn start<const TC: usize>(tests: [&'static dyn TestCase; TC]) -> ! {
        init_logger();
        let filter = std::env::args()
            .skip(1)
            .filter(|arg| !arg.starts_with('-'))
            .collect::<BTreeSet<_>>();
        let tests = tests
            .iter()
            .filter(|test| {
                if filter.is_empty() {
                    return true;
                }
                let name = test.name();
                let r = name.split("::").next().map(|n| n.len() + 2).unwrap_or(0);
                filter.contains(&name[r..])
            })
            .collect::<Vec<_>>();
        let (total, mut succ) = (tests.len(), 0);
        println!(
            "Running {} test{}",
            total,
            if total == 1 { "" } else { "s" }
        );

        for test in tests {
            if test.run() {
                succ += 1;
            }
        }
        println!(
            "test result: {}. {} passed; {} failed",
            if total == succ { "ok" } else { "FAILED" },
            succ,
            total - succ
        );
        std::process::exit(if total == succ { 0 } else { 1 })
    }
}

/// Runs `f` on a thread called `name` and waits at most `limit` for it.
///
/// A panic of `f` is resumed on the caller. Running out of time panics; the
/// stuck thread is abandoned.
pub fn run_with_deadline<F>(name: &'static str, limit: Duration, f: F)
where
    F: FnOnce() + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = std::thread::Builder::new()
        .name(name.into())
        .spawn(move || {
            f();
            let _ = tx.send(());
        })
        .expect("Failed to spawn a test thread");
    match rx.recv_timeout(limit) {
        Ok(()) => {
            let _ = handle.join();
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            if let Err(e) = handle.join() {
                std::panic::resume_unwind(e);
            }
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("{name} did not finish within {limit:?}")
        }
    }
}

struct Logger;

impl Log for Logger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let thread = std::thread::current();
        eprintln!(
            "\x1b[{}m[{:>5}] [{}] {}: {}\x1b[0m",
            level_to_color_code(record.level()),
            record.level(),
            thread.name().unwrap_or("?"),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

fn level_to_color_code(level: Level) -> u8 {
    match level {
        Level::Error => 31,
        Level::Warn => 93,
        Level::Info => 34,
        Level::Debug => 32,
        Level::Trace => 90,
    }
}

/// Installs the console logger on stderr.
///
/// The level comes from the `LOG` environment variable (`error`, `warn`,
/// `info`, `debug` or `trace`); logging is off otherwise. Calling this more
/// than once is harmless.
pub fn init_logger() {
    static LOGGER: Logger = Logger;
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(match std::env::var("LOG").as_deref() {
                Ok("error") => LevelFilter::Error,
                Ok("warn") => LevelFilter::Warn,
                Ok("info") => LevelFilter::Info,
                Ok("debug") => LevelFilter::Debug,
                Ok("trace") => LevelFilter::Trace,
                _ => LevelFilter::Off,
            });
        }
    });
}
