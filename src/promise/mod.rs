//! Promise Implementation
//!
//! Single-threaded promises whose reactions run as microtasks on an
//! [`EventLoop`]. A [`Deferred`] is the write side: the first `resolve` or
//! `reject` settles the paired [`Promise`] and every later call is ignored.
//!
//! Reactions registered on the same promise run in registration order, and
//! always asynchronously: even a reaction registered on an already-settled
//! promise waits for the next flush.

use crate::event_loop::EventLoop;
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// ID counter for Promise tracking
static PROMISE_ID: AtomicU64 = AtomicU64::new(1);

/// Promise state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromiseState {
    /// Not yet settled
    Pending,
    /// Settled with a value
    Fulfilled,
    /// Settled with a reason
    Rejected,
}

impl fmt::Display for PromiseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromiseState::Pending => write!(f, "pending"),
            PromiseState::Fulfilled => write!(f, "fulfilled"),
            PromiseState::Rejected => write!(f, "rejected"),
        }
    }
}

/// The terminal outcome of a promise
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement<T, E> {
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Settlement<T, E> {
    pub fn state(&self) -> PromiseState {
        match self {
            Settlement::Fulfilled(_) => PromiseState::Fulfilled,
            Settlement::Rejected(_) => PromiseState::Rejected,
        }
    }

    pub fn into_result(self) -> std::result::Result<T, E> {
        match self {
            Settlement::Fulfilled(value) => Ok(value),
            Settlement::Rejected(reason) => Err(reason),
        }
    }
}

impl<T, E> From<std::result::Result<T, E>> for Settlement<T, E> {
    fn from(result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(value) => Settlement::Fulfilled(value),
            Err(reason) => Settlement::Rejected(reason),
        }
    }
}

type Reaction<T, E> = Box<dyn FnOnce(Settlement<T, E>)>;

struct PromiseInner<T, E> {
    id: u64,
    settlement: Option<Settlement<T, E>>,
    reactions: Vec<Reaction<T, E>>,
}

/// Read side of a deferred value. Cloning yields another handle to the
/// same promise.
pub struct Promise<T, E> {
    inner: Rc<RefCell<PromiseInner<T, E>>>,
    event_loop: EventLoop,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            event_loop: self.event_loop.clone(),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Promise")
            .field("id", &inner.id)
            .field("settlement", &inner.settlement)
            .field("reactions", &inner.reactions.len())
            .finish()
    }
}

impl<T, E> Promise<T, E> {
    /// Unique id, used in log output
    pub fn id(&self) -> u64 {
        self.inner.borrow().id
    }

    /// The loop this promise schedules its reactions on
    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    pub fn state(&self) -> PromiseState {
        self.inner
            .borrow()
            .settlement
            .as_ref()
            .map_or(PromiseState::Pending, Settlement::state)
    }

    pub fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    /// Whether two handles refer to the same promise
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    /// Synchronous peek at the outcome, without waiting for a flush
    pub fn settlement(&self) -> Option<Settlement<T, E>> {
        self.inner.borrow().settlement.clone()
    }

    /// Register a reaction that receives the settlement
    pub fn subscribe(&self, reaction: impl FnOnce(Settlement<T, E>) + 'static) {
        let mut inner = self.inner.borrow_mut();
        let settled = inner.settlement.clone();
        match settled {
            Some(settlement) => {
                drop(inner);
                self.event_loop.enqueue_microtask(move || reaction(settlement));
            }
            None => {
                inner.reactions.push(Box::new(reaction));
                trace!(id = inner.id, reactions = inner.reactions.len(), "reaction registered");
            }
        }
    }

    /// Register fulfillment and rejection observers. Exactly one of them
    /// runs, once, during a later flush.
    pub fn observe(
        &self,
        on_fulfilled: impl FnOnce(T) + 'static,
        on_rejected: impl FnOnce(E) + 'static,
    ) {
        self.subscribe(move |settlement| match settlement {
            Settlement::Fulfilled(value) => on_fulfilled(value),
            Settlement::Rejected(reason) => on_rejected(reason),
        });
    }

    /// Map the fulfillment value. Rejections pass through unchanged.
    pub fn then<U: Clone + 'static>(&self, on_fulfilled: impl FnOnce(T) -> U + 'static) -> Promise<U, E> {
        let next = Deferred::new(&self.event_loop);
        let settle = next.clone();
        self.subscribe(move |settlement| {
            match settlement {
                Settlement::Fulfilled(value) => settle.resolve(on_fulfilled(value)),
                Settlement::Rejected(reason) => settle.reject(reason),
            };
        });
        next.promise()
    }

    /// Chain a promise-returning continuation; the result adopts the state
    /// of the returned promise.
    pub fn and_then<U: Clone + 'static>(
        &self,
        on_fulfilled: impl FnOnce(T) -> Promise<U, E> + 'static,
    ) -> Promise<U, E> {
        let next = Deferred::new(&self.event_loop);
        let settle = next.clone();
        self.subscribe(move |settlement| match settlement {
            Settlement::Fulfilled(value) => settle.follow(&on_fulfilled(value)),
            Settlement::Rejected(reason) => {
                settle.reject(reason);
            }
        });
        next.promise()
    }

    /// Recover from a rejection with a replacement value
    pub fn catch(&self, on_rejected: impl FnOnce(E) -> T + 'static) -> Promise<T, E> {
        let next = Deferred::new(&self.event_loop);
        let settle = next.clone();
        self.subscribe(move |settlement| {
            match settlement {
                Settlement::Fulfilled(value) => settle.resolve(value),
                Settlement::Rejected(reason) => settle.resolve(on_rejected(reason)),
            };
        });
        next.promise()
    }

    /// First settlement wins; returns whether this call settled the promise
    fn settle(&self, settlement: Settlement<T, E>) -> bool {
        let (id, reactions) = {
            let mut inner = self.inner.borrow_mut();
            if let Some(existing) = &inner.settlement {
                trace!(
                    id = inner.id,
                    state = %existing.state(),
                    ignored = %settlement.state(),
                    "promise already settled"
                );
                return false;
            }
            inner.settlement = Some(settlement.clone());
            (inner.id, std::mem::take(&mut inner.reactions))
        };

        self.event_loop.record_promise_settled();
        debug!(id, state = %settlement.state(), reactions = reactions.len(), "promise settled");

        for reaction in reactions {
            let settlement = settlement.clone();
            self.event_loop.enqueue_microtask(move || reaction(settlement));
        }
        true
    }
}

/// A value, or a promise for one
pub enum Resolvable<T, E> {
    Value(T),
    Promise(Promise<T, E>),
}

impl<T: Clone, E> Clone for Resolvable<T, E> {
    fn clone(&self) -> Self {
        match self {
            Resolvable::Value(value) => Resolvable::Value(value.clone()),
            Resolvable::Promise(promise) => Resolvable::Promise(promise.clone()),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Resolvable<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolvable::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolvable::Promise(promise) => f.debug_tuple("Promise").field(promise).finish(),
        }
    }
}

impl<T, E> From<Promise<T, E>> for Resolvable<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Resolvable::Promise(promise)
    }
}

impl<T, E> From<&Promise<T, E>> for Resolvable<T, E> {
    fn from(promise: &Promise<T, E>) -> Self {
        Resolvable::Promise(promise.clone())
    }
}

/// Write side of a promise
pub struct Deferred<T, E> {
    promise: Promise<T, E>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").field("promise", &self.promise).finish()
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Deferred<T, E> {
    /// Create a pending deferred scheduled on `event_loop`
    pub fn new(event_loop: &EventLoop) -> Self {
        let id = PROMISE_ID.fetch_add(1, Ordering::SeqCst);
        event_loop.record_promise_created();
        trace!(id, "promise created");
        Self {
            promise: Promise {
                inner: Rc::new(RefCell::new(PromiseInner {
                    id,
                    settlement: None,
                    reactions: Vec::new(),
                })),
                event_loop: event_loop.clone(),
            },
        }
    }

    /// The paired promise
    pub fn promise(&self) -> Promise<T, E> {
        self.promise.clone()
    }

    /// Fulfill the promise. Returns `false` if it was already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.promise.settle(Settlement::Fulfilled(value))
    }

    /// Reject the promise. Returns `false` if it was already settled.
    pub fn reject(&self, reason: E) -> bool {
        self.promise.settle(Settlement::Rejected(reason))
    }

    pub fn settle(&self, settlement: Settlement<T, E>) -> bool {
        self.promise.settle(settlement)
    }

    /// Settle the same way `source` eventually settles
    pub fn follow(&self, source: &Promise<T, E>) {
        let target = self.promise.clone();
        trace!(source = source.id(), target = target.id(), "following promise");
        source.subscribe(move |settlement| {
            target.settle(settlement);
        });
    }
}
