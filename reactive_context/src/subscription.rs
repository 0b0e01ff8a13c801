//! Anonymous subscriptions: computed values that are not bound to a key.

use crate::{
    channel::{notifications, Notifier},
    context::{Context, KeyClosure, ListenerId, Listeners, WeakContext},
    dynamic::{Dynamic, FromDynamic},
    error::{ContextError, Result},
    graph::{DependencyTracker, KeySet},
    key::Key,
    value::AnyValue,
};
use std::{cell::RefCell, fmt::Debug, marker::PhantomData, rc::Rc};

pub use crate::channel::Notifications;

/// An observed computation, created with [`Context::subscribe`](crate::Context::subscribe).
///
/// A subscription evaluates its value against the context it was created from, the first time
/// it is read, and memoizes the result. Whenever one of the keys it read changes, the result is
/// dropped and its change notification fires; the next read evaluates it again.
///
/// The context only holds a subscription weakly. Dropping every handle (or calling
/// [`Subscription::dispose`]) removes it from the context, after which it is never notified
/// again.
///
/// ```rust
/// use reactive_context::{Computed, Context, ScopeExt};
/// use std::{cell::Cell, rc::Rc};
///
/// let cx = Context::new();
/// cx.set("a", 1).unwrap();
/// cx.set("b", 2).unwrap();
///
/// let sum = cx.subscribe::<i64>(Computed::new(|cx| {
///     Ok(cx.get::<i64>("a")? + cx.get::<i64>("b")?)
/// }));
/// let notified = Rc::new(Cell::new(0));
/// sum.on_change({
///     let notified = Rc::clone(&notified);
///     move || notified.set(notified.get() + 1)
/// });
///
/// assert_eq!(sum.value().unwrap(), 3);
/// cx.set("a", 10).unwrap();
/// assert_eq!(notified.get(), 1);
/// assert_eq!(sum.value().unwrap(), 12);
/// ```
pub struct Subscription<T = Dynamic> {
    inner: Rc<SubscriptionInner>,
    ty: PhantomData<fn() -> T>,
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            ty: PhantomData,
        }
    }
}

impl<T> Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("type", &std::any::type_name::<T>())
            .field("data", &Rc::as_ptr(&self.inner))
            .finish()
    }
}

impl<T> Subscription<T> {
    pub(crate) fn from_inner(inner: Rc<SubscriptionInner>) -> Self {
        Self {
            inner,
            ty: PhantomData,
        }
    }

    pub(crate) fn belongs_to(&self, context: &Context) -> bool {
        self.inner
            .origin
            .upgrade()
            .is_some_and(|origin| origin == *context)
    }

    /// Registers a callback that runs every time the subscription becomes stale.
    pub fn on_change(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.inner.state.borrow_mut().listeners.add(Rc::new(listener))
    }

    /// Removes a callback registered with [`Subscription::on_change`].
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.state.borrow_mut().listeners.remove(id)
    }

    /// Returns a stream that yields whenever the subscription has become stale since it was last
    /// polled. The stream ends when the subscription is disposed or dropped.
    pub fn changes(&self) -> Notifications {
        let (tx, rx) = notifications();
        self.inner.state.borrow_mut().notifiers.push(tx);
        rx
    }

    /// Whether the current result needs to be recomputed before it can be read.
    pub fn is_stale(&self) -> bool {
        self.inner.state.borrow().result.is_none()
    }

    /// The keys read by the latest evaluation.
    pub fn dependencies(&self) -> KeySet {
        self.inner.state.borrow().dependencies.clone()
    }

    /// Removes the subscription from its context. Reading it afterwards fails with
    /// [`DisposedAccess`](ContextError::DisposedAccess). Disposing twice does nothing.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Whether [`Subscription::dispose`] has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.state.borrow().disposed
    }
}

impl<T: FromDynamic> Subscription<T> {
    /// Returns the current result, evaluating it first if it is stale.
    ///
    /// Fails with [`DisposedAccess`](ContextError::DisposedAccess) if the subscription was
    /// disposed, or if it is stale and its context no longer exists.
    pub fn value(&self) -> Result<T> {
        self.inner.value()?.extract()
    }
}

pub(crate) struct SubscriptionInner {
    origin: WeakContext,
    value: AnyValue,
    state: RefCell<SubscriptionState>,
}

#[derive(Default)]
struct SubscriptionState {
    result: Option<Dynamic>,
    dependencies: KeySet,
    disposed: bool,
    listeners: Listeners<dyn Fn(), ()>,
    notifiers: Vec<Notifier>,
}

impl SubscriptionInner {
    pub fn new(origin: WeakContext, value: AnyValue) -> Self {
        Self {
            origin,
            value,
            state: Default::default(),
        }
    }

    fn value(&self) -> Result<Dynamic> {
        {
            let state = self.state.borrow();
            if state.disposed {
                return Err(ContextError::DisposedAccess);
            }
            if let Some(result) = &state.result {
                return Ok(result.clone());
            }
        }

        let origin = self.origin.upgrade().ok_or(ContextError::DisposedAccess)?;
        let tracker = DependencyTracker::new(&origin, None);
        let result = self.value.get(&tracker)?;
        let dependencies = tracker.into_dependencies();

        let mut state = self.state.borrow_mut();
        if !state.disposed {
            state.result = Some(result.clone());
            state.dependencies = dependencies;
        }
        Ok(result)
    }

    pub fn depends_on_any(&self, keys: &KeyClosure) -> bool {
        self.state
            .try_borrow()
            .map(|state| {
                !state.disposed
                    && keys.iter().any(|key| state.dependencies.contains(key))
            })
            .unwrap_or(false)
    }

    /// The keys read by the latest evaluation.
    pub fn read_keys(&self) -> Vec<Key> {
        match self.state.try_borrow() {
            Ok(state) if !state.disposed => {
                state.dependencies.iter().cloned().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Drops the memoized result and fires the change notification.
    pub fn mark_stale(&self) {
        let listeners = {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.result = None;
            state.notifiers.retain(|notifier| !notifier.is_closed());
            for notifier in &state.notifiers {
                notifier.notify();
            }
            state.listeners.snapshot()
        };
        for listener in listeners {
            listener();
        }
    }

    fn dispose(&self) {
        {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.result = None;
            state.dependencies.clear();
            state.listeners.clear();
            state.notifiers.clear();
        }
        if let Some(origin) = self.origin.upgrade() {
            origin.deregister(self);
        }
    }
}

impl Drop for SubscriptionInner {
    fn drop(&mut self) {
        if self.state.get_mut().disposed {
            return;
        }
        // reclaimed without an explicit `dispose()`; if the registry cannot be reached right
        // now, it purges the dead entry the next time it is walked
        if let Some(origin) = self.origin.upgrade() {
            origin.deregister(self);
        }
    }
}
