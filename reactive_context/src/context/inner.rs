use super::{notify::Listeners, Context, DeletePolicy};
use crate::{
    dynamic::Dynamic,
    graph::{KeySet, WeakRegistry},
    key::Key,
    subscription::SubscriptionInner,
    value::AnyValue,
};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

pub(crate) type KeyClosure = IndexSet<Key, FxBuildHasher>;

#[derive(Debug, Clone)]
pub(crate) struct OwnedValue {
    pub value: AnyValue,
    pub enumerable: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ContextInner {
    pub parent: Option<Context>,
    pub children: Vec<Weak<RefCell<ContextInner>>>,
    pub own_values: IndexMap<Key, OwnedValue, FxBuildHasher>,
    pub cache: FxHashMap<Key, Dynamic>,
    pub dependencies: FxHashMap<Key, KeySet>,
    pub evaluating: KeySet,
    pub subscriptions: WeakRegistry<SubscriptionInner>,
    pub listeners: Listeners<dyn Fn(&str), String>,
    pub delete_policy: DeletePolicy,
}

impl ContextInner {
    pub fn with_parent(
        parent: Option<Context>,
        delete_policy: DeletePolicy,
    ) -> Self {
        Self {
            parent,
            delete_policy,
            ..Default::default()
        }
    }

    /// Every cached key that transitively read `key`, plus `key` itself.
    ///
    /// Walks the dependency map depth-first with an explicit stack; the visited set keeps each
    /// key in the closure exactly once, however many paths lead to it.
    pub fn named_closure(&self, key: &Key) -> KeyClosure {
        let mut closure = KeyClosure::default();
        let mut stack = vec![key.clone()];
        while let Some(current) = stack.pop() {
            if !closure.insert(current.clone()) {
                continue;
            }
            for (dependent, dependencies) in &self.dependencies {
                if dependencies.contains(&current)
                    && !closure.contains(dependent)
                {
                    stack.push(dependent.clone());
                }
            }
        }
        closure
    }

    /// Every live subscription whose latest evaluation read a key in `closure`.
    pub fn subscription_closure(
        &mut self,
        closure: &KeyClosure,
    ) -> Vec<Rc<SubscriptionInner>> {
        self.subscriptions
            .live()
            .into_iter()
            .filter(|subscription| subscription.depends_on_any(closure))
            .collect()
    }

    /// Drops the cached result and dependency record of every key in `closure`.
    ///
    /// The evicted results are returned, so that they can be dropped after the borrow ends.
    pub fn evict(&mut self, closure: &KeyClosure) -> Vec<Dynamic> {
        closure
            .iter()
            .filter_map(|key| {
                self.dependencies.remove(key);
                self.cache.remove(key)
            })
            .collect()
    }

    /// Cached keys (other than `key` itself) whose latest evaluation read `key`.
    pub fn direct_dependents(&self, key: &Key) -> Vec<Key> {
        self.dependencies
            .iter()
            .filter(|(dependent, dependencies)| {
                *dependent != key && dependencies.contains(key)
            })
            .map(|(dependent, _)| dependent.clone())
            .collect()
    }

    /// How many live subscriptions read `key` in their latest evaluation.
    pub fn subscriptions_reading(&mut self, key: &Key) -> usize {
        let closure = KeyClosure::from_iter([key.clone()]);
        self.subscription_closure(&closure).len()
    }

    /// Every key this context has a record of: cached keys, the keys their evaluations read,
    /// and the keys read by live subscriptions. Reads that missed count too.
    pub fn recorded_keys(&mut self) -> KeySet {
        let mut keys = self.cache.keys().cloned().collect::<KeySet>();
        for dependencies in self.dependencies.values() {
            keys.extend(dependencies.iter().cloned());
        }
        for subscription in self.subscriptions.live() {
            keys.extend(subscription.read_keys());
        }
        keys
    }

    /// Strong references to the children that are still alive, pruning the dead ones.
    pub fn live_children(&mut self) -> Vec<Context> {
        let mut live = Vec::with_capacity(self.children.len());
        self.children.retain(|child| match child.upgrade() {
            Some(inner) => {
                live.push(Context { inner });
                true
            }
            None => false,
        });
        live
    }

    pub fn remove_child(&mut self, child: &Context) {
        let target = Rc::as_ptr(&child.inner);
        self.children.retain(|c| {
            c.strong_count() > 0 && !std::ptr::eq(c.as_ptr(), target)
        });
    }
}
