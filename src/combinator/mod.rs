//! Promise combinators
//!
//! Construction helpers layered over [`Deferred`]: [`when`] lifts a value or
//! adopts a promise, [`reject`] builds an already-rejected promise, and
//! [`all`] joins many promises into a promise for their values. None of them
//! change how the underlying promise settles.
//!
//! ```
//! use deferred::combinator::{all, when};
//! use deferred::{EventLoop, Resolvable, Settlement};
//!
//! let el = EventLoop::new();
//! let later = when::<_, String>(&el, Resolvable::Value(2));
//! let joined = all(&el, vec![Resolvable::Value(1), Resolvable::Promise(later)]);
//! el.flush().unwrap();
//! assert_eq!(joined.settlement(), Some(Settlement::Fulfilled(vec![1, 2])));
//! ```

mod adapter;

pub use adapter::{promisify, Callback, CallbackAdapter, SUCCESS_STATUS};

use crate::event_loop::EventLoop;
use crate::promise::{Deferred, Promise, Resolvable};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, trace};

impl<T, E> From<Vec<Resolvable<T, E>>> for Resolvable<Vec<Resolvable<T, E>>, E> {
    fn from(items: Vec<Resolvable<T, E>>) -> Self {
        Resolvable::Value(items)
    }
}

impl<T, E> From<Vec<Promise<T, E>>> for Resolvable<Vec<Resolvable<T, E>>, E> {
    fn from(promises: Vec<Promise<T, E>>) -> Self {
        Resolvable::Value(promises.into_iter().map(Resolvable::Promise).collect())
    }
}

/// A promise for `value`.
///
/// A plain value gives a promise that is already fulfilled. A promise gives
/// a new promise that settles the same way once the source settles.
pub fn when<T, E>(event_loop: &EventLoop, value: impl Into<Resolvable<T, E>>) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let dfd = Deferred::new(event_loop);
    match value.into() {
        Resolvable::Value(value) => {
            dfd.resolve(value);
        }
        Resolvable::Promise(source) => dfd.follow(&source),
    }
    dfd.promise()
}

/// A promise already rejected with `reason`
pub fn reject<T, E>(event_loop: &EventLoop, reason: E) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let dfd = Deferred::new(event_loop);
    dfd.reject(reason);
    dfd.promise()
}

/// Turn a sequence of values or promises (or a promise for one) into a
/// promise for the sequence of values.
///
/// Values keep their input positions whatever order the inputs settle in.
/// The first rejection observed rejects the result; rejections arriving
/// after it are dropped. An empty sequence fulfills immediately.
pub fn all<T, E>(
    event_loop: &EventLoop,
    promises: impl Into<Resolvable<Vec<Resolvable<T, E>>, E>>,
) -> Promise<Vec<T>, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    match promises.into() {
        Resolvable::Value(items) => join(event_loop, items),
        Resolvable::Promise(outer) => {
            let el = event_loop.clone();
            outer.and_then(move |items| join(&el, items))
        }
    }
}

fn join<T, E>(event_loop: &EventLoop, items: Vec<Resolvable<T, E>>) -> Promise<Vec<T>, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let aggregate = Deferred::new(event_loop);
    if items.is_empty() {
        aggregate.resolve(Vec::new());
        return aggregate.promise();
    }

    let total = items.len();
    let slots: Rc<RefCell<Vec<Option<T>>>> = Rc::new(RefCell::new(vec![None; total]));
    let pending = Rc::new(Cell::new(total));
    debug!(aggregate = aggregate.promise().id(), inputs = total, "joining promises");

    for (index, item) in items.into_iter().enumerate() {
        let on_value = {
            let aggregate = aggregate.clone();
            let slots = slots.clone();
            let pending = pending.clone();
            move |value: T| {
                slots.borrow_mut()[index] = Some(value);
                pending.set(pending.get() - 1);
                if pending.get() == 0 {
                    let values: Option<Vec<T>> = slots.borrow_mut().drain(..).collect();
                    if let Some(values) = values {
                        aggregate.resolve(values);
                    }
                }
            }
        };
        let on_reason = {
            let aggregate = aggregate.clone();
            move |reason: E| {
                if aggregate.reject(reason) {
                    debug!(index, "aggregate rejected");
                } else {
                    trace!(index, "late rejection ignored");
                }
            }
        };
        when::<T, E>(event_loop, item).observe(on_value, on_reason);
    }

    aggregate.promise()
}
