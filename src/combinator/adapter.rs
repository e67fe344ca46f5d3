//! Callback-to-promise adapter
//!
//! Wraps methods written in the callback style, where the last argument is
//! a callback taking `(status, result)`, into functions that return a
//! promise. The status predicate decides which statuses count as success;
//! the default convention accepts exactly `"success"`.

use crate::event_loop::EventLoop;
use crate::promise::{Deferred, Promise};
use std::rc::Rc;
use tracing::trace;

/// Status reported by callback-style methods on success
pub const SUCCESS_STATUS: &str = "success";

/// Completion callback handed to a wrapped method
pub type Callback<S, R> = Box<dyn FnOnce(S, R)>;

/// Builds promise-returning wrappers around callback-style methods
pub struct CallbackAdapter<S> {
    event_loop: EventLoop,
    is_success: Rc<dyn Fn(&S) -> bool>,
}

impl<S> Clone for CallbackAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            event_loop: self.event_loop.clone(),
            is_success: self.is_success.clone(),
        }
    }
}

impl<S: 'static> CallbackAdapter<S> {
    /// Adapter for a custom callback convention
    pub fn with_predicate(event_loop: &EventLoop, is_success: impl Fn(&S) -> bool + 'static) -> Self {
        Self {
            event_loop: event_loop.clone(),
            is_success: Rc::new(is_success),
        }
    }

    /// Wrap `method` bound to `receiver`.
    ///
    /// Each call of the returned function invokes `method` once,
    /// synchronously, with the call's arguments and an injected callback,
    /// and returns a promise. The callback resolves the promise with
    /// `result` when the status passes the predicate and rejects it with
    /// `result` otherwise. Calling the callback more than once is the
    /// wrapped method's bug; only the first call has any effect.
    pub fn wrap<O, A, R>(
        &self,
        receiver: Rc<O>,
        method: impl Fn(&O, A, Callback<S, R>) + 'static,
    ) -> impl Fn(A) -> Promise<R, R>
    where
        O: 'static,
        R: Clone + 'static,
    {
        let adapter = self.clone();
        move |args: A| {
            let dfd = Deferred::new(&adapter.event_loop);
            let settle = dfd.clone();
            let is_success = adapter.is_success.clone();
            let callback: Callback<S, R> = Box::new(move |status, result| {
                let promise = settle.promise().id();
                if is_success(&status) {
                    trace!(promise, "callback reported success");
                    settle.resolve(result);
                } else {
                    trace!(promise, "callback reported failure");
                    settle.reject(result);
                }
            });
            method(&receiver, args, callback);
            dfd.promise()
        }
    }
}

impl<S: AsRef<str> + 'static> CallbackAdapter<S> {
    /// Adapter for the `("success", result)` / `(other, reason)` convention
    pub fn success_status(event_loop: &EventLoop) -> Self {
        Self::with_predicate(event_loop, |status: &S| status.as_ref() == SUCCESS_STATUS)
    }
}

/// Wrap a callback-style method using the `"success"` status convention.
///
/// ```
/// use deferred::combinator::{promisify, Callback};
/// use deferred::{EventLoop, Settlement};
/// use std::rc::Rc;
///
/// struct Store;
/// impl Store {
///     fn load(&self, key: u32, done: Callback<&'static str, String>) {
///         if key == 1 { done("success", "one".into()) } else { done("error", "missing".into()) }
///     }
/// }
///
/// let el = EventLoop::new();
/// let load = promisify(&el, Rc::new(Store), Store::load);
/// assert_eq!(load(1).settlement(), Some(Settlement::Fulfilled("one".to_string())));
/// assert_eq!(load(2).settlement(), Some(Settlement::Rejected("missing".to_string())));
/// ```
pub fn promisify<O, A, S, R>(
    event_loop: &EventLoop,
    receiver: Rc<O>,
    method: impl Fn(&O, A, Callback<S, R>) + 'static,
) -> impl Fn(A) -> Promise<R, R>
where
    O: 'static,
    S: AsRef<str> + 'static,
    R: Clone + 'static,
{
    CallbackAdapter::success_status(event_loop).wrap(receiver, method)
}
