//! Scopes: the nodes of the reactive value tree.

mod inner;
mod notify;

pub(crate) use inner::KeyClosure;
pub(crate) use notify::Listeners;
pub use notify::{ChangeStream, ListenerId};

use crate::{
    dynamic::{Dynamic, FromDynamic},
    error::{ContextError, Result},
    graph::{DependencyTracker, KeySet},
    key::Key,
    subscription::{Subscription, SubscriptionInner},
    traits::Scope,
    value::AnyValue,
};
use inner::{ContextInner, OwnedValue};
use std::{
    cell::RefCell,
    fmt::Debug,
    rc::{Rc, Weak},
};

/// How [`Context::delete_own`] treats keys that cached computations still depend on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeletePolicy {
    /// Delete the key and invalidate its dependents.
    #[default]
    Permissive,
    /// Refuse to delete a key while any cached value, in this scope or in a descendant that
    /// inherits the key, lists it as a dependency.
    RejectDependents,
}

/// A scope in a tree of reactive values.
///
/// A context owns a set of keyed [`Value`](crate::Value)s and inherits the values of its
/// ancestors. Reading a key resolves the nearest owner, evaluates its value against *this*
/// context, and memoizes the result here, together with the set of keys that evaluation read.
/// Writing a key invalidates every memoized result that transitively read it, in this context
/// and in every descendant that does not own the key itself.
///
/// `Context` is a cheap, reference-counted handle; clones refer to the same scope. A child keeps
/// its parent alive, but a parent does not keep its children alive.
#[derive(Clone)]
pub struct Context {
    pub(crate) inner: Rc<RefCell<ContextInner>>,
}

#[derive(Clone)]
pub(crate) struct WeakContext(Weak<RefCell<ContextInner>>);

impl WeakContext {
    pub fn upgrade(&self) -> Option<Context> {
        self.0.upgrade().map(|inner| Context { inner })
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Context {}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Context")
                .field(
                    "own_values",
                    &inner.own_values.keys().collect::<Vec<_>>(),
                )
                .field("cached", &inner.cache.len())
                .field("children", &inner.children.len())
                .field("subscriptions", &inner.subscriptions.len())
                .field("has_parent", &inner.parent.is_some())
                .finish(),
            Err(_) => f.debug_struct("Context").finish_non_exhaustive(),
        }
    }
}

/// Removes a key from the set of keys under evaluation when dropped, so that a failed
/// evaluation does not leave it marked.
struct EvaluationGuard<'a> {
    context: &'a Context,
    key: Key,
}

impl<'a> EvaluationGuard<'a> {
    fn enter(context: &'a Context, key: &Key) -> Result<Self> {
        if !context.inner.borrow_mut().evaluating.insert(key.clone()) {
            return Err(ContextError::RecursiveEvaluation(key.clone()));
        }
        Ok(Self {
            context,
            key: key.clone(),
        })
    }
}

impl Drop for EvaluationGuard<'_> {
    fn drop(&mut self) {
        match self.context.inner.try_borrow_mut() {
            Ok(mut inner) => {
                inner.evaluating.remove(&self.key);
            }
            Err(_) => crate::log_warning(format_args!(
                "could not unmark `{}` after evaluating it; reading it again \
                 will fail as a recursive evaluation",
                self.key
            )),
        }
    }
}

impl Context {
    /// Creates a new root context.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ContextInner::default())),
        }
    }

    /// Creates a new context and registers it as a child of `parent`.
    ///
    /// The child inherits every value of its ancestors, as well as the parent's
    /// [`DeletePolicy`].
    pub fn child_of(parent: &Context) -> Self {
        let policy = parent.delete_policy();
        let child = Self {
            inner: Rc::new(RefCell::new(ContextInner::with_parent(
                Some(parent.clone()),
                policy,
            ))),
        };
        parent
            .inner
            .borrow_mut()
            .children
            .push(Rc::downgrade(&child.inner));
        child
    }

    /// Creates a new context that is a child of this one.
    pub fn child(&self) -> Self {
        Self::child_of(self)
    }

    /// Sets how [`Context::delete_own`] treats keys that still have dependents.
    pub fn with_delete_policy(self, policy: DeletePolicy) -> Self {
        self.inner.borrow_mut().delete_policy = policy;
        self
    }

    /// How [`Context::delete_own`] treats keys that still have dependents.
    pub fn delete_policy(&self) -> DeletePolicy {
        self.inner.borrow().delete_policy
    }

    pub(crate) fn downgrade(&self) -> WeakContext {
        WeakContext(Rc::downgrade(&self.inner))
    }

    /// The parent of this context, if it is not a root.
    pub fn parent(&self) -> Option<Context> {
        self.inner.borrow().parent.clone()
    }

    /// The children of this context that are still alive.
    pub fn children(&self) -> Vec<Context> {
        self.inner.borrow_mut().live_children()
    }

    /// Whether `self` is `other` or one of its ancestors.
    fn is_ancestor_or_self_of(&self, other: &Context) -> bool {
        let mut current = Some(other.clone());
        while let Some(cx) = current {
            if cx == *self {
                return true;
            }
            current = cx.parent();
        }
        false
    }

    /// Makes this context a child of `parent`, detaching it from its previous parent.
    ///
    /// Cached results that were inherited from the old ancestors are invalidated, in this context
    /// and in its descendants. Fails with [`InvalidArgument`](ContextError::InvalidArgument)
    /// if `parent` is this context or one of its descendants.
    pub fn attach(&self, parent: &Context) -> Result<()> {
        if self.is_ancestor_or_self_of(parent) {
            return Err(ContextError::InvalidArgument(
                "cannot attach a context to itself or to a descendant",
            ));
        }
        let previous = self.inner.borrow_mut().parent.replace(parent.clone());
        if let Some(previous) = &previous {
            previous.inner.borrow_mut().remove_child(self);
        }
        {
            let mut parent = parent.inner.borrow_mut();
            parent.remove_child(self);
            parent.children.push(Rc::downgrade(&self.inner));
        }
        self.invalidate_inherited(&KeySet::default());
        Ok(())
    }

    /// Makes this context a root. Its own values and children are unaffected.
    ///
    /// Cached results that were inherited from the old ancestors are invalidated.
    pub fn detach(&self) {
        let previous = self.inner.borrow_mut().parent.take();
        if let Some(previous) = previous {
            previous.inner.borrow_mut().remove_child(self);
            self.invalidate_inherited(&KeySet::default());
        }
    }

    /// Invalidates every key this context cached or read, including reads that missed, unless
    /// it is in `skip`: owned by a context between this one and the node that was re-parented,
    /// or already invalidated there.
    fn invalidate_inherited(&self, skip: &KeySet) {
        let (inherited, own, children) = {
            let mut inner = self.inner.borrow_mut();
            let mut inherited = inner.recorded_keys();
            inherited.retain(|key| {
                !inner.own_values.contains_key(key) && !skip.contains(key)
            });
            let own = inner.own_values.keys().cloned().collect::<Vec<_>>();
            (inherited, own, inner.live_children())
        };
        for key in &inherited {
            self.invalidate(key);
        }
        // `invalidate` already reached every descendant that inherits these keys
        let mut skip = skip.clone();
        skip.extend(own);
        skip.extend(inherited);
        for child in children {
            child.invalidate_inherited(&skip);
        }
    }

    /// Reads `key` as a `T`.
    ///
    /// Fails with [`KeyNotFound`](ContextError::KeyNotFound) if no context in the ancestor chain
    /// owns the key, with [`TypeMismatch`](ContextError::TypeMismatch) if the result is not a
    /// `T`, and with [`RecursiveEvaluation`](ContextError::RecursiveEvaluation) if the key's
    /// value reads itself while it is being computed.
    pub fn get<T: FromDynamic>(&self, key: impl Into<Key>) -> Result<T> {
        self.read(&key.into())?.extract()
    }

    /// Reads `key` as a `T`, reporting a miss or a type mismatch as `None`.
    ///
    /// [`RecursiveEvaluation`](ContextError::RecursiveEvaluation) is still returned as an error.
    pub fn try_get<T: FromDynamic>(
        &self,
        key: impl Into<Key>,
    ) -> Result<Option<T>> {
        Ok(self
            .try_read(&key.into())?
            .and_then(|value| T::from_dynamic(&value)))
    }

    /// Reads the untyped result of `key`.
    pub fn get_dynamic(&self, key: impl Into<Key>) -> Result<Dynamic> {
        self.read(&key.into())
    }

    /// Reads the untyped result of `key`, reporting any failure except
    /// [`RecursiveEvaluation`](ContextError::RecursiveEvaluation) as `None`.
    pub fn try_get_dynamic(
        &self,
        key: impl Into<Key>,
    ) -> Result<Option<Dynamic>> {
        self.try_read(&key.into())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", skip_all, fields(key = %key))
    )]
    fn read(&self, key: &Key) -> Result<Dynamic> {
        let cached = self.inner.borrow().cache.get(key).cloned();
        if let Some(cached) = cached {
            #[cfg(feature = "tracing")]
            tracing::trace!("cache hit");
            return Ok(cached);
        }

        let value = self
            .find_value(key)
            .ok_or_else(|| ContextError::KeyNotFound(key.clone()))?;

        let guard = EvaluationGuard::enter(self, key)?;
        let tracker = DependencyTracker::new(self, Some(key.clone()));
        let result = value.get(&tracker);
        drop(guard);
        let result = result?;
        let dependencies = tracker.into_dependencies();

        #[cfg(feature = "tracing")]
        tracing::trace!(dependencies = dependencies.len(), "evaluated");

        let mut inner = self.inner.borrow_mut();
        inner.cache.insert(key.clone(), result.clone());
        inner.dependencies.insert(key.clone(), dependencies);
        Ok(result)
    }

    fn try_read(&self, key: &Key) -> Result<Option<Dynamic>> {
        match self.read(key) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_fatal() => Err(err),
            Err(_) => Ok(None),
        }
    }

    /// Finds the value for `key` in this context or its nearest ancestor that owns it.
    pub fn find_value(&self, key: impl Into<Key>) -> Option<AnyValue> {
        let key = key.into();
        let mut current = Some(self.clone());
        while let Some(cx) = current {
            let parent = {
                let inner = cx.inner.borrow();
                if let Some(owned) = inner.own_values.get(&key) {
                    return Some(owned.value.clone());
                }
                inner.parent.clone()
            };
            current = parent;
        }
        None
    }

    /// Whether this context or any of its ancestors owns `key`.
    pub fn has(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        let mut current = Some(self.clone());
        while let Some(cx) = current {
            if cx.has_own(&key) {
                return true;
            }
            current = cx.parent();
        }
        false
    }

    /// Whether this context owns `key` itself.
    pub fn has_own(&self, key: impl Into<Key>) -> bool {
        self.inner.borrow().own_values.contains_key(&key.into())
    }

    /// Whether this context owns `key` and it is marked enumerable.
    pub fn has_enumerable(&self, key: impl Into<Key>) -> bool {
        self.inner
            .borrow()
            .own_values
            .get(&key.into())
            .is_some_and(|owned| owned.enumerable)
    }

    /// The enumerable values owned by this context, in insertion order.
    pub fn own_values(&self) -> Vec<(Key, AnyValue)> {
        self.inner
            .borrow()
            .own_values
            .iter()
            .filter(|(_, owned)| owned.enumerable)
            .map(|(key, owned)| (key.clone(), owned.value.clone()))
            .collect()
    }

    /// Whether `key` has a memoized result in this context.
    pub fn is_cached(&self, key: impl Into<Key>) -> bool {
        self.inner.borrow().cache.contains_key(&key.into())
    }

    /// The keys read by the latest evaluation of `key` in this context, if it is memoized.
    pub fn dependencies(&self, key: impl Into<Key>) -> Option<KeySet> {
        self.inner.borrow().dependencies.get(&key.into()).cloned()
    }

    /// Stores an enumerable value under `key`, replacing any value this context owned for it,
    /// and invalidates everything that depended on the key.
    pub fn set(
        &self,
        key: impl Into<Key>,
        value: impl Into<AnyValue>,
    ) -> Result<()> {
        self.set_with(key, value, true)
    }

    /// Stores a value that is hidden from [`Context::own_values`].
    pub fn set_hidden(
        &self,
        key: impl Into<Key>,
        value: impl Into<AnyValue>,
    ) -> Result<()> {
        self.set_with(key, value, false)
    }

    /// Stores a hidden [`Computed`](crate::Computed) value.
    pub fn set_computed<T>(
        &self,
        key: impl Into<Key>,
        fun: impl Fn(&dyn Scope) -> Result<T> + 'static,
    ) -> Result<()>
    where
        T: Into<Dynamic>,
    {
        self.set_with(key, crate::value::Computed::new(fun), false)
    }

    /// Stores a value under `key`, replacing any value this context owned for it, and invalidates
    /// everything that depended on the key.
    ///
    /// Fails with [`InvalidArgument`](ContextError::InvalidArgument), without storing anything,
    /// if the key is empty.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn set_with(
        &self,
        key: impl Into<Key>,
        value: impl Into<AnyValue>,
        enumerable: bool,
    ) -> Result<()> {
        let key = key.into();
        ensure_key(&key)?;
        let previous = self.inner.borrow_mut().own_values.insert(
            key.clone(),
            OwnedValue {
                value: value.into(),
                enumerable,
            },
        );
        self.invalidate(&key);
        drop(previous);
        Ok(())
    }

    /// Removes the value this context owns for `key`, and invalidates everything that depended
    /// on it. Returns `false` if this context did not own the key.
    ///
    /// Under [`DeletePolicy::RejectDependents`], fails with
    /// [`DependentsExist`](ContextError::DependentsExist), without removing anything, while any
    /// cached value still lists the key as a dependency.
    pub fn delete_own(&self, key: impl Into<Key>) -> Result<bool> {
        let key = key.into();
        if !self.has_own(&key) {
            return Ok(false);
        }
        if self.delete_policy() == DeletePolicy::RejectDependents {
            let (dependents, subscriptions) = self.dependents_of(&key);
            if !dependents.is_empty() || subscriptions > 0 {
                return Err(ContextError::DependentsExist {
                    key,
                    dependents,
                    subscriptions,
                });
            }
        }
        let removed = self.inner.borrow_mut().own_values.shift_remove(&key);
        self.invalidate(&key);
        drop(removed);
        Ok(true)
    }

    /// Cached keys and live subscriptions that read `key`, in this context and in descendants
    /// that inherit it.
    fn dependents_of(&self, key: &Key) -> (Vec<Key>, usize) {
        let (mut dependents, mut subscriptions, children) = {
            let mut inner = self.inner.borrow_mut();
            (
                inner.direct_dependents(key),
                inner.subscriptions_reading(key),
                inner.live_children(),
            )
        };
        for child in children {
            if !child.has_own(key) {
                let (keys, count) = child.dependents_of(key);
                dependents.extend(keys);
                subscriptions += count;
            }
        }
        (dependents, subscriptions)
    }

    /// Invalidates `key` and everything that transitively depended on it, in this context and in
    /// every descendant that does not own the key, then notifies listeners and subscriptions.
    ///
    /// This is called by [`Context::set_with`] and [`Context::delete_own`]. Call it directly
    /// when a value's result changed without going through the store, e.g. after
    /// [`Lazy::invalidate`](crate::Lazy::invalidate).
    ///
    /// Fails with [`InvalidArgument`](ContextError::InvalidArgument) if the key is empty.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn refresh(&self, key: impl Into<Key>) -> Result<()> {
        let key = key.into();
        ensure_key(&key)?;
        self.invalidate(&key);
        Ok(())
    }

    fn invalidate(&self, key: &Key) {
        let (named, stale, children, evicted) = {
            let mut inner = self.inner.borrow_mut();
            let named = inner.named_closure(key);
            let stale = inner.subscription_closure(&named);
            let evicted = inner.evict(&named);
            (named, stale, inner.live_children(), evicted)
        };
        drop(evicted);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            key = %key,
            named = named.len(),
            subscriptions = stale.len(),
            children = children.len(),
            "invalidating"
        );

        for child in children {
            if !child.has_own(key) {
                child.invalidate(key);
            }
        }
        for changed in &named {
            self.notify_changed(changed);
        }
        for subscription in stale {
            subscription.mark_stale();
        }
    }

    fn notify_changed(&self, key: &Key) {
        let alternate = key.alternate();
        let mut spellings = vec![key.as_str().to_owned()];
        if alternate != key.as_str() {
            spellings.push(alternate);
        }

        let listeners = {
            let mut inner = self.inner.borrow_mut();
            for spelling in &spellings {
                inner.listeners.send(spelling);
            }
            inner.listeners.snapshot()
        };
        for spelling in &spellings {
            for listener in &listeners {
                listener(spelling);
            }
        }
    }

    /// Registers a callback that runs every time a key of this context changes.
    ///
    /// The callback receives the key in its canonical dotted spelling and, when it differs, once
    /// more in its slash-separated spelling. It runs synchronously during the write, and may
    /// read from or write to the store.
    pub fn on_change(&self, listener: impl Fn(&str) + 'static) -> ListenerId {
        self.inner.borrow_mut().listeners.add(Rc::new(listener))
    }

    /// Removes a callback registered with [`Context::on_change`].
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.borrow_mut().listeners.remove(id)
    }

    /// Returns a stream of the keys of this context that change, in both spellings.
    pub fn changes(&self) -> ChangeStream {
        ChangeStream(self.inner.borrow_mut().listeners.stream())
    }

    /// Creates an anonymous subscription to `value`, evaluated against this context.
    ///
    /// If `T` restricts results to one [`Kind`](crate::Kind), the value is coerced to it. The
    /// subscription is evaluated lazily, the first time it is read, and is notified whenever a
    /// key it read changes. This context only holds it weakly.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn subscribe<T: FromDynamic>(
        &self,
        value: impl Into<AnyValue>,
    ) -> Subscription<T> {
        let value = value.into();
        let value = match T::KIND {
            Some(kind) => value.coerce(kind),
            None => value,
        };
        let inner = Rc::new(SubscriptionInner::new(self.downgrade(), value));
        self.inner.borrow_mut().subscriptions.insert(&inner);
        Subscription::from_inner(inner)
    }

    /// Disposes of a subscription created from this context.
    pub fn dispose<T>(&self, subscription: &Subscription<T>) {
        if !subscription.belongs_to(self) {
            crate::log_warning(format_args!(
                "disposing of a subscription that was created from another \
                 context"
            ));
        }
        subscription.dispose();
    }

    /// Removes a subscription from the registry. An entry that is already gone is not an error.
    pub(crate) fn deregister(&self, subscription: *const SubscriptionInner) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.subscriptions.remove(subscription);
        }
    }
}

fn ensure_key(key: &Key) -> Result<()> {
    if key.is_empty() {
        Err(ContextError::InvalidArgument("key must not be empty"))
    } else {
        Ok(())
    }
}

impl Scope for Context {
    fn get_dynamic(&self, key: &Key) -> Result<Dynamic> {
        self.read(key)
    }

    fn try_get_dynamic(&self, key: &Key) -> Result<Option<Dynamic>> {
        self.try_read(key)
    }
}
