//! Generic resource manager.
//!
//! # Responsibilities
//! - Hold the live objects of one kind, keyed by identity
//! - Diff a desired configuration list against the live objects
//! - Apply in-place updates, report which configs need a fresh object
//! - Remove objects whose identity is no longer desired
//!
//! # Design Decisions
//! - One implementation, instantiated once per kind
//! - Keys are kept sorted so listings and snapshots are deterministic
//! - A read/write lock per manager: snapshots only take the read side
//! - In-place updates run under the write lock, including any blocking work
//!   an object does there (STRICT_DNS resolution); snapshot and status
//!   readers of that manager wait for it

use std::collections::{BTreeMap, HashSet};

use parking_lot::RwLock;

use crate::config::schema::ResourceConfig;
use crate::object::{Kind, Object, ObjectError, Outcome};

/// What a manager could not do by itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta<C> {
    /// Desired configurations with no live object; the caller must build and
    /// upsert one for each.
    pub to_construct: Vec<C>,
    /// `RestartRequired` if any in-place update asked for a restart.
    pub outcome: Outcome,
}

/// The live objects of one resource kind.
pub struct Manager<O: Object> {
    kind: Kind,
    objects: RwLock<BTreeMap<String, O>>,
}

impl<O: Object> Manager<O> {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Converge the live objects towards `desired`.
    ///
    /// Stale identities are removed first. Existing identities are updated in
    /// place in the order given; the first update failure is returned
    /// immediately and the remaining identities are left untouched.
    pub fn reconcile(&self, desired: &[O::Config]) -> Result<Delta<O::Config>, ObjectError> {
        let mut objects = self.objects.write();

        let wanted: HashSet<&str> = desired.iter().map(|c| c.name()).collect();
        let stale: Vec<String> = objects
            .keys()
            .filter(|name| !wanted.contains(name.as_str()))
            .cloned()
            .collect();
        for name in stale {
            if let Some(mut object) = objects.remove(&name) {
                if let Err(e) = object.close() {
                    tracing::warn!(kind = %self.kind, name = %name, error = %e, "Error closing removed object");
                }
                tracing::info!(kind = %self.kind, name = %name, "Object removed");
            }
        }

        let mut delta = Delta {
            to_construct: Vec::new(),
            outcome: Outcome::Applied,
        };
        for config in desired {
            match objects.get_mut(config.name()) {
                None => delta.to_construct.push(config.clone()),
                Some(object) => {
                    let outcome = object.reconcile(config)?;
                    if outcome.restart_required() {
                        tracing::debug!(kind = %self.kind, name = %config.name(), "Update requires restart");
                    }
                    delta.outcome = delta.outcome.merge(outcome);
                }
            }
        }

        Ok(delta)
    }

    /// Register a freshly built object, replacing (and closing) any object
    /// with the same identity.
    pub fn upsert(&self, object: O) {
        let name = object.name().to_string();
        let previous = self.objects.write().insert(name.clone(), object);
        if let Some(mut previous) = previous {
            if let Err(e) = previous.close() {
                tracing::warn!(kind = %self.kind, name = %name, error = %e, "Error closing replaced object");
            }
        }
        tracing::debug!(kind = %self.kind, name = %name, "Object registered");
    }

    /// Identities of the live objects, in listing order.
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    /// Configuration of one object.
    pub fn get(&self, name: &str) -> Option<O::Config> {
        self.objects.read().get(name).map(Object::config)
    }

    /// Configurations of every object, in listing order, read under a single
    /// lock acquisition.
    pub fn configs(&self) -> Vec<O::Config> {
        self.objects.read().values().map(Object::config).collect()
    }

    /// Run `f` on one object.
    pub fn with<R>(&self, name: &str, f: impl FnOnce(&O) -> R) -> Option<R> {
        self.objects.read().get(name).map(f)
    }

    /// Run `f` on every object, in listing order, stopping at the first error.
    pub fn try_for_each_mut<E>(&self, mut f: impl FnMut(&mut O) -> Result<(), E>) -> Result<(), E> {
        self.objects.write().values_mut().try_for_each(|o| f(o))
    }

    /// Run `f` on every object, in listing order.
    pub fn for_each_mut(&self, f: impl FnMut(&mut O)) {
        self.objects.write().values_mut().for_each(f);
    }

    /// Map every object, in listing order.
    pub fn map<R>(&self, f: impl FnMut(&O) -> R) -> Vec<R> {
        self.objects.read().values().map(f).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::ValidationError;

    #[derive(Debug, Clone, PartialEq)]
    struct TestConfig {
        name: String,
        value: u32,
    }

    impl ResourceConfig for TestConfig {
        fn name(&self) -> &str {
            &self.name
        }

        fn validate(&self) -> Result<(), ValidationError> {
            Ok(())
        }
    }

    /// Values >= 100 need a restart, 999 fails.
    struct TestObject {
        config: TestConfig,
        closed: bool,
    }

    impl Object for TestObject {
        type Config = TestConfig;

        fn name(&self) -> &str {
            &self.config.name
        }

        fn config(&self) -> TestConfig {
            self.config.clone()
        }

        fn reconcile(&mut self, config: &TestConfig) -> Result<Outcome, ObjectError> {
            match config.value {
                999 => Err(ObjectError::Other("boom".into())),
                v if v >= 100 => Ok(Outcome::RestartRequired),
                _ => {
                    self.config = config.clone();
                    Ok(Outcome::Applied)
                }
            }
        }

        fn close(&mut self) -> Result<(), ObjectError> {
            self.closed = true;
            Ok(())
        }
    }

    fn cfg(name: &str, value: u32) -> TestConfig {
        TestConfig {
            name: name.into(),
            value,
        }
    }

    fn manager(names: &[&str]) -> Manager<TestObject> {
        let m = Manager::new(Kind::Cluster);
        for name in names {
            m.upsert(TestObject {
                config: cfg(name, 0),
                closed: false,
            });
        }
        m
    }

    #[test]
    fn new_identities_are_returned_for_construction() {
        let m = manager(&[]);
        let delta = m.reconcile(&[cfg("a", 1), cfg("b", 2)]).unwrap();
        assert_eq!(delta.to_construct, vec![cfg("a", 1), cfg("b", 2)]);
        assert_eq!(delta.outcome, Outcome::Applied);
        assert!(m.is_empty());
    }

    #[test]
    fn existing_identities_are_updated_in_place() {
        let m = manager(&["a"]);
        let delta = m.reconcile(&[cfg("a", 7)]).unwrap();
        assert!(delta.to_construct.is_empty());
        assert_eq!(m.get("a"), Some(cfg("a", 7)));
    }

    #[test]
    fn stale_identities_are_removed() {
        let m = manager(&["a", "b"]);
        let delta = m.reconcile(&[cfg("b", 0), cfg("c", 0)]).unwrap();
        assert_eq!(delta.to_construct, vec![cfg("c", 0)]);
        assert_eq!(m.keys(), vec!["b".to_string()]);
    }

    #[test]
    fn restart_keeps_old_object_and_is_reported() {
        let m = manager(&["a"]);
        let delta = m.reconcile(&[cfg("a", 100)]).unwrap();
        assert_eq!(delta.outcome, Outcome::RestartRequired);
        assert_eq!(m.get("a"), Some(cfg("a", 0)));
    }

    #[test]
    fn failure_stops_processing_but_removals_stand() {
        let m = manager(&["a", "b", "stale"]);
        let err = m.reconcile(&[cfg("a", 999), cfg("b", 5)]).unwrap_err();
        assert!(matches!(err, ObjectError::Other(_)));
        assert_eq!(m.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(m.get("b"), Some(cfg("b", 0)));
    }

    #[test]
    fn upsert_replaces_and_closes_previous() {
        let m = manager(&["a"]);
        m.upsert(TestObject {
            config: cfg("a", 42),
            closed: false,
        });
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("a"), Some(cfg("a", 42)));
        assert_eq!(m.with("a", |o| o.closed), Some(false));
    }

    #[test]
    fn keys_are_sorted() {
        let m = manager(&["c", "a", "b"]);
        assert_eq!(m.keys(), vec!["a", "b", "c"]);
        assert_eq!(m.map(|o| o.config.value), vec![0, 0, 0]);
    }
}
