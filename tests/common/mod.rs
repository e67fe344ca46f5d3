//! Shared test helpers for integration tests

use deferred::{Deferred, EventLoop, Promise};
use std::sync::Once;

static LOGGING: Once = Once::new();

/// Route `tracing` output to the test writer, filtered by `RUST_LOG`
#[allow(dead_code)]
pub fn init_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A promise that resolves with `value` after `delay` virtual milliseconds
#[allow(dead_code)]
pub fn resolve_after<T: Clone + 'static, E: Clone + 'static>(
    event_loop: &EventLoop,
    delay: u64,
    value: T,
) -> Promise<T, E> {
    let dfd = Deferred::new(event_loop);
    let promise = dfd.promise();
    event_loop.set_timeout(delay, move || {
        dfd.resolve(value);
    });
    promise
}

/// A promise that rejects with `reason` after `delay` virtual milliseconds
#[allow(dead_code)]
pub fn reject_after<T: Clone + 'static, E: Clone + 'static>(
    event_loop: &EventLoop,
    delay: u64,
    reason: E,
) -> Promise<T, E> {
    let dfd = Deferred::new(event_loop);
    let promise = dfd.promise();
    event_loop.set_timeout(delay, move || {
        dfd.reject(reason);
    });
    promise
}
