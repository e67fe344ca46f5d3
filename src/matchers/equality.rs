//! Value equality for the `*_with` matchers
//!
//! Custom testers are consulted in registration order. A tester returns
//! `Some(verdict)` to decide or `None` to defer; when every tester defers,
//! values are compared with `PartialEq`.

use std::any::Any;
use std::fmt;

type Tester = Box<dyn Fn(&dyn Any, &dyn Any) -> Option<bool>>;

#[derive(Default)]
pub struct EqualityTesters {
    testers: Vec<Tester>,
}

impl fmt::Debug for EqualityTesters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EqualityTesters")
            .field("testers", &self.testers.len())
            .finish()
    }
}

impl EqualityTesters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tester for values of type `T`. It is skipped for
    /// comparisons of any other type.
    pub fn add<T: 'static>(&mut self, tester: impl Fn(&T, &T) -> Option<bool> + 'static) {
        self.testers.push(Box::new(move |actual, expected| {
            match (actual.downcast_ref::<T>(), expected.downcast_ref::<T>()) {
                (Some(actual), Some(expected)) => tester(actual, expected),
                _ => None,
            }
        }));
    }

    pub fn len(&self) -> usize {
        self.testers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.testers.is_empty()
    }

    pub fn equals<T: PartialEq + 'static>(&self, actual: &T, expected: &T) -> bool {
        self.testers
            .iter()
            .find_map(|tester| tester(actual, expected))
            .unwrap_or_else(|| actual == expected)
    }
}
