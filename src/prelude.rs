//! Prelude module for convenient imports
//!
//! ```
//! use deferred::prelude::*;
//!
//! let harness = Harness::install();
//! let p = when::<_, ()>(harness.event_loop(), Resolvable::Value("ready"));
//! assert!(harness.expect(&p).to_be_resolved_with("ready").pass);
//! ```

// Scheduling
pub use crate::event_loop::{EventLoop, EventLoopConfig, RunResult, TimerId};

// Promises
pub use crate::promise::{Deferred, Promise, PromiseState, Resolvable, Settlement};

// Combinators
pub use crate::combinator::{all, promisify, reject, when, Callback, CallbackAdapter};

// Capabilities
pub use crate::capability::{Capable, CapabilityDescriptor, ObjectShape, THENABLE, WYRMLING};

// Matchers
pub use crate::matchers::{Harness, MatchResult};

// Error handling
pub use crate::error::{Error, Result};

// Version constant
pub use crate::VERSION;
