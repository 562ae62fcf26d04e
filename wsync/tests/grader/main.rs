mod condition_variable;
mod worker;

fn main() {
    grading::TestDriver::start([
        // Lock.
        &lock::round_trip,
        &lock::zero_timeout,
        &lock::timeout_then_acquire,
        &lock::parking,
        &lock::busyspin,
        &lock::smoke,
        &lock::smoke_mixed,
        // Semaphore.
        &semaphore::try_short,
        &semaphore::batch,
        &semaphore::three_takers,
        &semaphore::no_drift,
        &semaphore::n_permits,
        &semaphore::exec_order,
        // Condition variable.
        &condition_variable::signal_one,
        &condition_variable::signal_counts,
        &condition_variable::signal_nobody,
        &condition_variable::wait_timeout,
        &condition_variable::reacquire_budget,
        &condition_variable::bounded_buffer,
        &condition_variable::wait_async,
        &condition_variable::wait_async_timeout,
        &condition_variable::wait_async_cancel,
        // Workers.
        &worker::spawn,
        &worker::invalid_stack,
        &worker::sleep,
    ]);
}

/// Spins until `n` threads sleep on `word`.
pub fn settle(word: &std::sync::atomic::AtomicU32, n: usize) {
    while atomwait::waiter_count(word) != n {
        std::thread::yield_now();
    }
}

/// Spawns a test helper thread.
pub fn spawn<T: Send + 'static>(
    name: &'static str,
    f: impl FnOnce() -> T + Send + 'static,
) -> std::thread::JoinHandle<T> {
    wsync::WorkerBuilder::new(name).spawn(f).unwrap()
}
