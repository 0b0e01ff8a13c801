use super::KeySet;
use crate::{
    context::Context,
    dynamic::Dynamic,
    error::{ContextError, Result},
    key::Key,
    traits::Scope,
};
use std::{cell::RefCell, fmt::Debug};

/// A single-use [`Scope`] that records every key read through it.
///
/// A tracker is created for exactly one evaluation. It forwards every read to its target
/// [`Context`], after adding the key to its dependency set. When it tracks the computation of a
/// named key, that key is its *guard*: reading the guard fails with
/// [`RecursiveEvaluation`](ContextError::RecursiveEvaluation).
///
/// ```rust
/// use reactive_context::{graph::DependencyTracker, Context, Key, ScopeExt};
///
/// let cx = Context::new();
/// cx.set("a", 1).unwrap();
/// cx.set("b", 2).unwrap();
///
/// let tracker = DependencyTracker::new(&cx, None);
/// let sum = tracker.get::<i64>("a").unwrap() + tracker.get::<i64>("b").unwrap();
/// assert_eq!(sum, 3);
///
/// let deps = tracker.into_dependencies();
/// assert!(deps.contains(&Key::new("a")) && deps.contains(&Key::new("b")));
/// ```
pub struct DependencyTracker<'a> {
    target: &'a Context,
    guard: Option<Key>,
    dependencies: RefCell<KeySet>,
}

impl<'a> DependencyTracker<'a> {
    /// Creates a tracker that forwards reads to `target`.
    ///
    /// Pass the key being computed as `guard`, or `None` for a computation that is not bound to
    /// a key.
    pub fn new(target: &'a Context, guard: Option<Key>) -> Self {
        Self {
            target,
            guard,
            dependencies: Default::default(),
        }
    }

    /// Consumes the tracker and returns the keys read through it.
    pub fn into_dependencies(self) -> KeySet {
        self.dependencies.into_inner()
    }

    fn track(&self, key: &Key) -> Result<()> {
        if self.guard.as_ref() == Some(key) {
            return Err(ContextError::RecursiveEvaluation(key.clone()));
        }
        self.dependencies.borrow_mut().insert(key.clone());
        Ok(())
    }
}

impl Debug for DependencyTracker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyTracker")
            .field("guard", &self.guard)
            .field("dependencies", &self.dependencies.borrow())
            .finish_non_exhaustive()
    }
}

impl Scope for DependencyTracker<'_> {
    fn get_dynamic(&self, key: &Key) -> Result<Dynamic> {
        self.track(key)?;
        self.target.get_dynamic(key)
    }

    fn try_get_dynamic(&self, key: &Key) -> Result<Option<Dynamic>> {
        self.track(key)?;
        self.target.try_get_dynamic(key)
    }
}
