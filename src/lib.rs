//! Deferred: single-threaded promises, promise combinators and promise
//! matchers driven by a virtual clock
//!
//! Every promise belongs to an [`EventLoop`]. Settlement reactions run as
//! microtasks on that loop, and nothing runs until the loop is flushed or
//! advanced, so tests decide exactly when asynchronous work happens.
//!
//! # Quick Start
//!
//! ```
//! use deferred::combinator::{all, when};
//! use deferred::{Deferred, EventLoop, Resolvable, Settlement};
//!
//! fn main() -> deferred::Result<()> {
//!     let el = EventLoop::new();
//!     let slow = Deferred::<i32, String>::new(&el);
//!     let joined = all(&el, vec![Resolvable::Value(1), Resolvable::Promise(slow.promise())]);
//!
//!     el.set_timeout(50, move || {
//!         slow.resolve(2);
//!     });
//!     el.flush()?;
//!
//!     assert_eq!(joined.settlement(), Some(Settlement::Fulfilled(vec![1, 2])));
//!     assert_eq!(el.now(), 50);
//!     let ready = when::<i32, String>(&el, Resolvable::Value(3));
//!     assert_eq!(ready.settlement(), Some(Settlement::Fulfilled(3)));
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`event_loop`] | Microtask queue, timers and virtual time |
//! | [`promise`] | [`Promise`], [`Deferred`], [`Resolvable`] |
//! | [`combinator`] | `when`, `reject`, `all`, `promisify` |
//! | [`capability`] | Structural capability descriptors |
//! | [`matchers`] | Settlement and capability assertions |
#![allow(clippy::type_complexity)]

pub mod capability;
pub mod combinator;
pub mod event_loop;
pub mod matchers;
pub mod prelude;
pub mod promise;

mod error;

pub use error::{Error, QueueKind, Result};
pub use event_loop::{EventLoop, EventLoopConfig};
pub use promise::{Deferred, Promise, PromiseState, Resolvable, Settlement};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
