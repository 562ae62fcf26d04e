
fn main() {
    grading::TestDriver::start([
        // The dispatcher can only be configured before its first use.
        &dispatch::configure,
        // Spinlock.
        &spinlock::smoke,
        &spinlock::try_lock,
        &spinlock::unlock_required,
        // Wait and notify.
        &parking::result_codes,
        &parking::not_equal,
        &parking::zero_timeout,
        &parking::timeout,
        &parking::huge_timeout,
        &parking::wake_one,
        &parking::notify_count,
        &parking::notify_nobody,
        &parking::shared_bucket,
        &parking::ping_pong,
        // Asynchronous waits.
        &dispatch::notify,
        &dispatch::not_equal,
        &dispatch::zero_timeout,
        &dispatch::timeout,
        &dispatch::cancel,
        &dispatch::cancel_after_completion,
        &dispatch::cancel_all_on,
        &dispatch::cancel_all,
        &dispatch::panicking_callback,
        &dispatch::mixed_waiters,
    ]);
}

/// Spins until `n` waiters are queued on `word`.
pub fn settle(word: &std::sync::atomic::AtomicU32, n: usize) {
    while atomwait::waiter_count(word) != n {
        std::thread::yield_now();
    }
}
