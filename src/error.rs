//! Error types for the deferred runtime
//!
//! Promise failures are never represented here: a rejected promise carries
//! its own reason. These errors cover the infrastructure around promises,
//! i.e. the event loop, configuration loading and the assertion harness.

use std::fmt;
use thiserror::Error;

/// Which part of the event loop hit its task budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// Promise reactions and other queued continuations
    Microtask,
    /// Virtual-time timers
    Timer,
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueKind::Microtask => write!(f, "microtask"),
            QueueKind::Timer => write!(f, "timer"),
        }
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    /// A flush ran more tasks than the configured budget allows
    #[error("FlushLimitError: ran {limit} tasks without draining the event loop ({remaining} {queue}s still queued)")]
    FlushLimitExceeded {
        limit: usize,
        remaining: usize,
        queue: QueueKind,
    },

    /// A matcher did not pass
    #[error("AssertionError: {0}")]
    AssertionFailed(String),

    /// Invalid or unparsable configuration
    #[error("ConfigError: {0}")]
    Config(String),

    /// IO error
    #[error("IOError: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a flush budget error
    pub fn flush_limit(limit: usize, remaining: usize, queue: QueueKind) -> Self {
        Error::FlushLimitExceeded {
            limit,
            remaining,
            queue,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_limit_display() {
        let err = Error::flush_limit(10, 3, QueueKind::Microtask);
        assert_eq!(
            err.to_string(),
            "FlushLimitError: ran 10 tasks without draining the event loop (3 microtasks still queued)"
        );
    }

    #[test]
    fn test_io_error_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().starts_with("IOError:"));
    }
}
