use std::time::{Duration, Instant};
use wsync::{
    WorkerBuilder, WorkerError,
    worker::{STACK_ALIGN, TLS_RESERVE},
};

pub fn spawn() {
    let handle = WorkerBuilder::new("answer")
        .spawn(|| {
            assert_eq!(std::thread::current().name(), Some("answer"));
            42
        })
        .unwrap();
    assert_eq!(handle.join().unwrap(), 42);

    let small = WorkerBuilder::new(String::from("small"))
        .stack_size(64 * 1024)
        .spawn(|| {
            let buf = [1u8; 16 * 1024];
            buf.iter().map(|b| *b as usize).sum::<usize>()
        })
        .unwrap();
    assert_eq!(small.join().unwrap(), 16 * 1024);
    assert_eq!(TLS_RESERVE % STACK_ALIGN, 0);
}

pub fn invalid_stack() {
    for bytes in [0, 8, 100, 4097] {
        assert!(
            matches!(
                WorkerBuilder::new("bad").stack_size(bytes).spawn(|| ()),
                Err(WorkerError::InvalidArgument)
            ),
            "stack size {bytes} must be rejected"
        );
    }
    // No room left for the thread-local reserve.
    assert!(matches!(
        WorkerBuilder::new("huge")
            .stack_size(usize::MAX & !(STACK_ALIGN - 1))
            .spawn(|| ()),
        Err(WorkerError::InvalidArgument)
    ));
}

#[grading::deadline(5000)]
pub fn sleep() {
    let start = Instant::now();
    wsync::sleep(Duration::ZERO);
    assert!(start.elapsed() < Duration::from_secs(1));

    let start = Instant::now();
    wsync::sleep(Duration::from_millis(30));
    assert!(start.elapsed() >= Duration::from_millis(30));
}
