//! Promise matchers
//!
//! Assertions about how a promise settles, evaluated against a virtual
//! clock. Each settlement matcher registers observers on the promise,
//! flushes the event loop so any scheduled settlement happens inside the
//! assertion call, then inspects what was recorded. A promise that is
//! still pending after the flush "never settled".
//!
//! # Example
//!
//! ```
//! use deferred::matchers::Harness;
//! use deferred::Deferred;
//!
//! let harness = Harness::install();
//! let dfd = Deferred::<i32, String>::new(harness.event_loop());
//! assert!(!harness.expect(&dfd).to_be_settled().pass);
//!
//! dfd.resolve(5);
//! assert!(harness.expect(&dfd).to_be_resolved_with(5).pass);
//!
//! let result = harness.expect(&dfd).to_be_resolved_with(6);
//! assert_eq!(
//!     result.message.as_deref(),
//!     Some("Expected promise to be resolved with 6 but it was resolved with 5.")
//! );
//! ```

mod equality;

pub use equality::EqualityTesters;

use crate::capability::{Capable, CapabilityDescriptor, CapabilityRegistry, THENABLE, WYRMLING};
use crate::error::{Error, Result};
use crate::event_loop::EventLoop;
use crate::promise::{Deferred, Promise, Settlement};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

// ---------------------------------------------------------------------------
// MatchResult
// ---------------------------------------------------------------------------

/// Outcome of a single matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub pass: bool,
    /// Why the matcher failed; `None` when it passed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MatchResult {
    pub fn passed() -> Self {
        Self {
            pass: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            pass: false,
            message: Some(message.into()),
        }
    }

    /// Convert a failure into [`Error::AssertionFailed`]
    pub fn into_result(self) -> Result<()> {
        if self.pass {
            Ok(())
        } else {
            Err(Error::AssertionFailed(
                self.message.unwrap_or_else(|| "matcher failed".to_string()),
            ))
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.pass, &self.message) {
            (true, _) => write!(f, "PASSED"),
            (false, Some(message)) => write!(f, "FAILED: {}", message),
            (false, None) => write!(f, "FAILED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Subjects
// ---------------------------------------------------------------------------

/// A matcher subject that is, or carries, a promise
pub trait AsPromise {
    type Value;
    type Reason;

    fn as_promise(&self) -> Promise<Self::Value, Self::Reason>;
}

impl<T, E> AsPromise for Promise<T, E> {
    type Value = T;
    type Reason = E;

    fn as_promise(&self) -> Promise<T, E> {
        self.clone()
    }
}

impl<T: Clone + 'static, E: Clone + 'static> AsPromise for Deferred<T, E> {
    type Value = T;
    type Reason = E;

    fn as_promise(&self) -> Promise<T, E> {
        self.promise()
    }
}

impl<P: AsPromise + ?Sized> AsPromise for &P {
    type Value = P::Value;
    type Reason = P::Reason;

    fn as_promise(&self) -> Promise<P::Value, P::Reason> {
        (**self).as_promise()
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Owns the virtual clock and the comparison settings matchers use
#[derive(Debug)]
pub struct Harness {
    event_loop: EventLoop,
    equality: EqualityTesters,
    capabilities: CapabilityRegistry,
}

impl Harness {
    /// Harness driving an existing event loop
    pub fn new(event_loop: &EventLoop) -> Self {
        Self {
            event_loop: event_loop.clone(),
            equality: EqualityTesters::new(),
            capabilities: CapabilityRegistry::new(),
        }
    }

    /// Harness with a freshly installed virtual clock
    pub fn install() -> Self {
        Self::new(&EventLoop::install())
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Register a custom equality tester for the `*_with` matchers
    pub fn add_equality_tester<T: 'static>(
        &mut self,
        tester: impl Fn(&T, &T) -> Option<bool> + 'static,
    ) {
        self.equality.add(tester);
    }

    pub fn register_capability(&mut self, descriptor: CapabilityDescriptor) {
        self.capabilities.register(descriptor);
    }

    pub fn equals<T: PartialEq + 'static>(&self, actual: &T, expected: &T) -> bool {
        self.equality.equals(actual, expected)
    }

    pub fn expect<S>(&self, subject: S) -> Expectation<'_, S> {
        Expectation {
            harness: self,
            subject,
        }
    }

    /// Drop anything still queued, e.g. between tests sharing a harness.
    /// Call it before dropping a harness whose loop still has work queued.
    pub fn reset(&self) {
        self.event_loop.clear();
    }
}

/// A subject awaiting a matcher
pub struct Expectation<'h, S> {
    harness: &'h Harness,
    subject: S,
}

// ---------------------------------------------------------------------------
// Structural matchers
// ---------------------------------------------------------------------------

impl<S: Capable> Expectation<'_, S> {
    /// Passes iff the subject can be chained with `then`. Never flushes.
    pub fn to_be_thenable(&self) -> MatchResult {
        self.to_conform_to(&THENABLE)
    }

    /// Passes iff the subject exposes the plugin object proxy members
    pub fn to_be_a_wyrmling(&self) -> MatchResult {
        self.to_conform_to(&WYRMLING)
    }

    pub fn to_conform_to(&self, descriptor: &CapabilityDescriptor) -> MatchResult {
        let missing = descriptor.missing_members(&self.subject);
        if missing.is_empty() {
            MatchResult::passed()
        } else {
            MatchResult::failed(format!(
                "Expected object to be {} but it is missing {}.",
                descriptor.name,
                missing.join(", ")
            ))
        }
    }

    /// Like [`to_conform_to`](Self::to_conform_to), looking the descriptor
    /// up in the harness registry
    pub fn to_have_capability(&self, name: &str) -> MatchResult {
        match self.harness.capabilities.get(name) {
            Some(descriptor) => self.to_conform_to(descriptor),
            None => MatchResult::failed(format!("Unknown capability '{}'.", name)),
        }
    }
}

// ---------------------------------------------------------------------------
// Settlement matchers
// ---------------------------------------------------------------------------

impl<S> Expectation<'_, S>
where
    S: AsPromise,
    S::Value: Clone + fmt::Debug + 'static,
    S::Reason: Clone + fmt::Debug + 'static,
{
    pub fn to_be_settled(&self) -> MatchResult {
        self.check("settled", |_| None)
    }

    pub fn to_be_resolved(&self) -> MatchResult {
        self.check("resolved", |settlement| match settlement {
            Settlement::Fulfilled(_) => None,
            Settlement::Rejected(_) => Some("rejected".to_string()),
        })
    }

    pub fn to_be_rejected(&self) -> MatchResult {
        self.check("rejected", |settlement| match settlement {
            Settlement::Fulfilled(_) => Some("resolved".to_string()),
            Settlement::Rejected(_) => None,
        })
    }

    /// Passes iff the promise fulfills with a value equal to `expected`.
    ///
    /// Values in failure messages use their `Debug` form, so strings are
    /// quoted: `... but it was rejected with "boom".`
    pub fn to_be_resolved_with(&self, expected: S::Value) -> MatchResult
    where
        S::Value: PartialEq,
    {
        let wanted = format!("resolved with {:?}", expected);
        self.check(&wanted, |settlement| match settlement {
            Settlement::Fulfilled(actual) if self.harness.equals(&actual, &expected) => None,
            Settlement::Fulfilled(actual) => Some(format!("resolved with {:?}", actual)),
            Settlement::Rejected(reason) => Some(format!("rejected with {:?}", reason)),
        })
    }

    /// Passes iff the promise rejects with a reason equal to `expected`.
    /// Messages render values with `Debug`, as for
    /// [`to_be_resolved_with`](Self::to_be_resolved_with).
    pub fn to_be_rejected_with(&self, expected: S::Reason) -> MatchResult
    where
        S::Reason: PartialEq,
    {
        let wanted = format!("rejected with {:?}", expected);
        self.check(&wanted, |settlement| match settlement {
            Settlement::Rejected(actual) if self.harness.equals(&actual, &expected) => None,
            Settlement::Rejected(actual) => Some(format!("rejected with {:?}", actual)),
            Settlement::Fulfilled(value) => Some(format!("resolved with {:?}", value)),
        })
    }

    /// Settle the subject under the virtual clock and judge the outcome.
    /// `verdict` returns `None` to pass or a description of what was
    /// observed instead.
    fn check(
        &self,
        wanted: &str,
        verdict: impl FnOnce(Settlement<S::Value, S::Reason>) -> Option<String>,
    ) -> MatchResult {
        let observed = match self.settle() {
            Ok(observed) => observed,
            Err(err) => {
                return MatchResult::failed(format!(
                    "Expected promise to be {} but flushing the event loop failed: {}.",
                    wanted, err
                ))
            }
        };

        let result = match observed {
            None => MatchResult::failed(format!(
                "Expected promise to be {} but it never settled.",
                wanted
            )),
            Some(settlement) => match verdict(settlement) {
                None => MatchResult::passed(),
                Some(actual) => MatchResult::failed(format!(
                    "Expected promise to be {} but it was {}.",
                    wanted, actual
                )),
            },
        };
        debug!(pass = result.pass, wanted, "promise matcher evaluated");
        result
    }

    /// Record the subject's settlement, if any, after flushing
    fn settle(&self) -> Result<Option<Settlement<S::Value, S::Reason>>> {
        let promise = self.subject.as_promise();
        let record = Rc::new(RefCell::new(None));
        let writer = record.clone();
        promise.subscribe(move |settlement| *writer.borrow_mut() = Some(settlement));

        self.harness.event_loop.flush()?;
        if !promise.event_loop().ptr_eq(&self.harness.event_loop) {
            debug!(promise = promise.id(), "flushing the promise's own event loop");
            promise.event_loop().flush()?;
        }

        let observed = record.borrow_mut().take();
        Ok(observed)
    }
}
