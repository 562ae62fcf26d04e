use crate::{settle, spawn};
use std::{
    cell::UnsafeCell,
    sync::{Arc, mpsc},
    time::{Duration, Instant},
};
use wsync::{ConditionVariable, Lock, WaitResult};

#[derive(Default)]
struct Shared {
    lock: Lock,
    cond: ConditionVariable,
}

#[grading::deadline(5000)]
pub fn signal_one() {
    let shared = Arc::new(Shared::default());
    let waiter = {
        let shared = shared.clone();
        spawn("waiter", move || {
            shared.lock.waitinf_acquire();
            shared.cond.waitinf(&shared.lock);
            // Woken waiters always hold the lock again.
            assert!(shared.lock.is_locked());
            shared.lock.release();
        })
    };
    settle(shared.cond.as_word(), 1);

    shared.lock.waitinf_acquire();
    assert_eq!(shared.cond.signal(1), 1);
    assert_eq!(shared.cond.generation(), 1);
    shared.lock.release();
    waiter.join().unwrap();
}

#[grading::deadline(5000)]
pub fn signal_counts() {
    let shared = Arc::new(Shared::default());
    let (tx, rx) = mpsc::channel();
    let waiters = (0..3)
        .map(|i| {
            let (shared, tx) = (shared.clone(), tx.clone());
            spawn("waiter", move || {
                shared.lock.waitinf_acquire();
                let woken = shared.cond.wait(&shared.lock, Duration::from_secs(10));
                assert_eq!(woken, Ok(()));
                shared.lock.release();
                tx.send(i).unwrap();
            })
        })
        .collect::<Vec<_>>();
    settle(shared.cond.as_word(), 3);

    assert_eq!(shared.cond.signal(1), 1);
    rx.recv().unwrap();
    assert!(rx.try_recv().is_err(), "signal(1) wakes a single waiter");
    assert_eq!(atomwait::waiter_count(shared.cond.as_word()), 2);

    assert_eq!(shared.cond.broadcast(), 2);
    rx.recv().unwrap();
    rx.recv().unwrap();
    assert_eq!(shared.cond.generation(), 2);
    for waiter in waiters {
        waiter.join().unwrap();
    }
}

pub fn signal_nobody() {
    let cond = ConditionVariable::new();
    assert_eq!(cond.signal(5), 0);
    assert_eq!(cond.broadcast(), 0);
    // The generation advances once per call, not per waiter.
    assert_eq!(cond.generation(), 2);
    cond.init();
    assert_eq!(cond.generation(), 0);
}

#[grading::deadline(5000)]
pub fn wait_timeout() {
    let shared = Shared::default();
    shared.lock.waitinf_acquire();
    let start = Instant::now();
    assert!(shared.cond.wait(&shared.lock, Duration::from_millis(30)).is_err());
    assert!(start.elapsed() >= Duration::from_millis(30));
    assert!(
        !shared.lock.is_locked(),
        "A timed out wait returns without the lock"
    );
    assert_eq!(atomwait::waiter_count(shared.cond.as_word()), 0);
}

#[grading::deadline(5000)]
pub fn reacquire_budget() {
    // After the wake-up, the lock is reacquired with the full timeout again,
    // so the whole call may outlast its timeout and still succeed.
    const TIMEOUT: Duration = Duration::from_millis(200);
    let shared = Arc::new(Shared::default());
    let (tx, rx) = mpsc::channel();
    let waiter = {
        let shared = shared.clone();
        spawn("waiter", move || {
            shared.lock.waitinf_acquire();
            tx.send(Instant::now()).unwrap();
            let result = shared.cond.wait(&shared.lock, TIMEOUT);
            let elapsed = Instant::now();
            if result.is_ok() {
                shared.lock.release();
            }
            (result, elapsed)
        })
    };
    let start = rx.recv().unwrap();
    settle(shared.cond.as_word(), 1);

    shared.lock.waitinf_acquire();
    std::thread::sleep((start + Duration::from_millis(120)).saturating_duration_since(Instant::now()));
    assert_eq!(shared.cond.signal(1), 1);
    std::thread::sleep(Duration::from_millis(140));
    shared.lock.release();

    let (result, end) = waiter.join().unwrap();
    assert_eq!(result, Ok(()));
    assert!(end - start > TIMEOUT, "took {:?}", end - start);
}

struct Buffer<const N: usize> {
    shared: Shared,
    items: UnsafeCell<std::collections::VecDeque<usize>>,
}

unsafe impl<const N: usize> Sync for Buffer<N> {}

impl<const N: usize> Buffer<N> {
    fn new() -> Self {
        Self {
            shared: Shared::default(),
            items: UnsafeCell::new(std::collections::VecDeque::new()),
        }
    }

    fn put(&self, v: usize) {
        self.shared.lock.waitinf_acquire();
        while unsafe { (*self.items.get()).len() } == N {
            self.shared.cond.waitinf(&self.shared.lock);
        }
        unsafe { (*self.items.get()).push_back(v) };
        self.shared.cond.broadcast();
        self.shared.lock.release();
    }

    fn get(&self) -> usize {
        self.shared.lock.waitinf_acquire();
        let v = loop {
            if let Some(v) = unsafe { (*self.items.get()).pop_front() } {
                break v;
            }
            self.shared.cond.waitinf(&self.shared.lock);
        };
        self.shared.cond.broadcast();
        self.shared.lock.release();
        v
    }
}

#[grading::deadline(20000)]
pub fn bounded_buffer() {
    const ITEMS: usize = 2000;
    let buffer = Arc::new(Buffer::<2>::new());
    let producers = (0..2)
        .map(|p| {
            let buffer = buffer.clone();
            spawn("producer", move || {
                for i in (p..ITEMS).step_by(2) {
                    buffer.put(i);
                }
            })
        })
        .collect::<Vec<_>>();
    let consumer = {
        let buffer = buffer.clone();
        spawn("consumer", move || {
            let mut seen = (0..ITEMS).map(|_| buffer.get()).collect::<Vec<_>>();
            seen.sort();
            seen
        })
    };

    for producer in producers {
        producer.join().unwrap();
    }
    assert_eq!(consumer.join().unwrap(), (0..ITEMS).collect::<Vec<_>>());
}

#[grading::deadline(5000)]
pub fn wait_async() {
    let shared = Arc::new(Shared::default());
    let (tx, rx) = mpsc::channel();

    shared.lock.waitinf_acquire();
    let token = {
        let shared2 = shared.clone();
        shared
            .cond
            .wait_async(
                &shared.lock,
                move |result| {
                    // Reacquiring the lock is up to the callback.
                    shared2.lock.waitinf_acquire();
                    tx.send(result).unwrap();
                    shared2.lock.release();
                },
                None,
            )
            .unwrap()
    };
    assert!(!shared.lock.is_locked(), "wait_async releases the lock at once");
    assert_eq!(atomwait::waiter_count(shared.cond.as_word()), 1);
    assert!(rx.try_recv().is_err());

    assert_eq!(shared.cond.signal(1), 1);
    assert_eq!(rx.recv_timeout(Duration::from_secs(3)), Ok(WaitResult::Ok));
    assert!(!atomwait::cancel_wait_async(token));
}

#[grading::deadline(5000)]
pub fn wait_async_timeout() {
    let shared = Arc::new(Shared::default());
    let (tx, rx) = mpsc::channel();
    shared.lock.waitinf_acquire();
    shared
        .cond
        .wait_async(
            &shared.lock,
            move |result| tx.send(result).unwrap(),
            Some(Duration::from_millis(20)),
        )
        .unwrap();
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(3)),
        Ok(WaitResult::TimedOut)
    );
    assert_eq!(shared.cond.signal(1), 0);
}

#[grading::deadline(5000)]
pub fn wait_async_cancel() {
    let shared = Arc::new(Shared::default());
    let (tx, rx) = mpsc::channel();
    shared.lock.waitinf_acquire();
    let token = shared
        .cond
        .wait_async(&shared.lock, move |result| tx.send(result).unwrap(), None)
        .unwrap();
    assert!(atomwait::cancel_wait_async(token));
    assert_eq!(shared.cond.signal(u32::MAX), 0);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}
