//! Capability descriptors
//!
//! A descriptor names the minimum set of members a subject must expose to
//! count as a given kind of object. Subjects report their members through
//! [`Capable`]; conformance is a pure check with no side effects.

use crate::promise::{Deferred, Promise};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// Something that can report which named members it exposes
pub trait Capable {
    fn has_member(&self, name: &str) -> bool;
}

impl<C: Capable + ?Sized> Capable for &C {
    fn has_member(&self, name: &str) -> bool {
        (**self).has_member(name)
    }
}

/// A named minimum member set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    pub name: &'static str,
    pub members: &'static [&'static str],
}

/// Objects that can be chained with `then`
pub const THENABLE: CapabilityDescriptor = CapabilityDescriptor {
    name: "thenable",
    members: &["then"],
};

/// Plugin object proxies
pub const WYRMLING: CapabilityDescriptor = CapabilityDescriptor {
    name: "wyrmling",
    members: &["objectId", "spawnId", "getProperty", "setProperty", "invoke"],
};

impl CapabilityDescriptor {
    /// Passes iff every required member is present. Extra members are fine.
    pub fn is_satisfied_by(&self, subject: &dyn Capable) -> bool {
        self.members.iter().all(|member| subject.has_member(member))
    }

    /// Required members the subject lacks, in declaration order
    pub fn missing_members(&self, subject: &dyn Capable) -> Vec<&'static str> {
        self.members
            .iter()
            .copied()
            .filter(|member| !subject.has_member(member))
            .collect()
    }
}

impl fmt::Display for CapabilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.members.join(", "))
    }
}

/// Name → descriptor lookup, preloaded with the built-in descriptors
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    descriptors: FxHashMap<&'static str, CapabilityDescriptor>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        let mut registry = Self {
            descriptors: FxHashMap::default(),
        };
        registry.register(THENABLE);
        registry.register(WYRMLING);
        registry
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a descriptor, returning the one it replaced
    pub fn register(&mut self, descriptor: CapabilityDescriptor) -> Option<CapabilityDescriptor> {
        self.descriptors.insert(descriptor.name, descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.descriptors.get(name)
    }

    /// Whether `subject` conforms to the named descriptor. Unknown names
    /// never conform.
    pub fn conforms(&self, name: &str, subject: &dyn Capable) -> bool {
        self.get(name)
            .is_some_and(|descriptor| descriptor.is_satisfied_by(subject))
    }
}

/// The member set of a dynamically shaped object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectShape {
    members: FxHashSet<String>,
}

impl ObjectShape {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_member(mut self, name: impl Into<String>) -> Self {
        self.members.insert(name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Capable for ObjectShape {
    fn has_member(&self, name: &str) -> bool {
        self.members.contains(name)
    }
}

impl<T, E> Capable for Promise<T, E> {
    fn has_member(&self, name: &str) -> bool {
        matches!(name, "then" | "catch")
    }
}

impl<T, E> Capable for Deferred<T, E> {
    fn has_member(&self, name: &str) -> bool {
        matches!(name, "promise" | "resolve" | "reject")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::EventLoop;

    fn wyrmling_shape() -> ObjectShape {
        ObjectShape::new(["objectId", "spawnId", "getProperty", "setProperty", "invoke"])
    }

    #[test]
    fn test_full_member_set_conforms() {
        assert!(WYRMLING.is_satisfied_by(&wyrmling_shape()));
        assert!(WYRMLING.missing_members(&wyrmling_shape()).is_empty());
    }

    #[test]
    fn test_extra_members_still_conform() {
        let shape = wyrmling_shape().with_member("toString");
        assert!(WYRMLING.is_satisfied_by(&shape));
    }

    #[test]
    fn test_missing_member_is_reported() {
        let shape = ObjectShape::new(["objectId", "getProperty", "setProperty"]);
        assert!(!WYRMLING.is_satisfied_by(&shape));
        assert_eq!(WYRMLING.missing_members(&shape), vec!["spawnId", "invoke"]);
    }

    #[test]
    fn test_promise_is_thenable_but_deferred_is_not() {
        let el = EventLoop::new();
        let dfd = Deferred::<(), ()>::new(&el);
        assert!(THENABLE.is_satisfied_by(&dfd.promise()));
        assert!(!THENABLE.is_satisfied_by(&dfd));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = CapabilityRegistry::new();
        assert!(registry.conforms("thenable", &ObjectShape::new(["then"])));
        assert!(!registry.conforms("unknown", &ObjectShape::new(["then"])));

        let closable = CapabilityDescriptor {
            name: "closable",
            members: &["close"],
        };
        assert!(registry.register(closable).is_none());
        assert!(registry.conforms("closable", &ObjectShape::new(["close", "open"])));
        assert_eq!(registry.get("closable"), Some(&closable));
    }

    #[test]
    fn test_descriptor_display() {
        assert_eq!(THENABLE.to_string(), "thenable [then]");
    }
}
