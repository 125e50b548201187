#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for multithreaded tests in this workspace.

use std::panic;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

/// Runs a test body on a separate thread and fails the test if it does not finish in time.
///
/// Guards against tests that deadlock, which would otherwise hang the whole test run.
/// The limit is 10 seconds, or 60 seconds under Miri where synchronization is much slower.
///
/// With `MUTATION_TESTING=1` in the environment the body runs directly on the calling
/// thread, so that mutation testing can detect mutations that cause hangs.
///
/// # Panics
///
/// Panics if the body panics or exceeds the time limit.
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    let (tx, rx) = mpsc::channel();

    let worker = thread::spawn(move || {
        // If the receiver already gave up, there is nobody left to tell.
        drop(tx.send(test_fn()));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            worker.join().expect("test thread finished, so it cannot have panicked");
            result
        }
        Err(RecvTimeoutError::Timeout) => {
            panic!("test did not complete within {timeout:?}");
        }
        Err(RecvTimeoutError::Disconnected) => match worker.join() {
            Ok(()) => panic!("test thread exited without producing a result"),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// Runs `body` on `thread_count` threads at once and returns the results in thread order.
///
/// All threads wait on a shared barrier before calling `body`, so they start as close to
/// simultaneously as the platform allows. The body receives the zero-based thread index.
///
/// # Panics
///
/// Re-throws the panic of the first thread (in index order) that panicked.
pub fn on_threads<F, R>(thread_count: usize, body: F) -> Vec<R>
where
    F: Fn(usize) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    let body = Arc::new(body);
    let start = Arc::new(Barrier::new(thread_count));

    let handles = (0..thread_count)
        .map(|index| {
            let body = Arc::clone(&body);
            let start = Arc::clone(&start);

            thread::spawn(move || {
                start.wait();
                body(index)
            })
        })
        .collect::<Vec<_>>();

    handles
        .into_iter()
        .map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
        .collect()
}
