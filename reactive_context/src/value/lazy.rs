use super::Value;
use crate::{dynamic::Dynamic, error::Result, traits::Scope};
use std::{cell::RefCell, fmt::Debug, rc::Rc};

/// A zero-argument computation that runs at most once until it is invalidated.
///
/// Unlike [`Computed`](super::Computed), a lazy value ignores the scope it is read from, so it
/// never records dependencies. Its owner is responsible for calling
/// [`Context::refresh`](crate::Context::refresh) for every key it is stored under after calling
/// [`Lazy::invalidate`].
///
/// Cloning a `Lazy` produces another handle to the same memoized state.
///
/// ```rust
/// use reactive_context::{Context, Lazy, ScopeExt};
/// use std::{cell::Cell, rc::Rc};
///
/// let source = Rc::new(Cell::new(1));
/// let lazy = Lazy::new({
///     let source = Rc::clone(&source);
///     move || Ok(source.get())
/// });
///
/// let cx = Context::new();
/// cx.set("config", lazy.clone()).unwrap();
/// assert_eq!(cx.get::<i64>("config").unwrap(), 1);
///
/// source.set(2);
/// lazy.invalidate();
/// cx.refresh("config").unwrap();
/// assert_eq!(cx.get::<i64>("config").unwrap(), 2);
/// ```
#[derive(Clone)]
pub struct Lazy {
    inner: Rc<LazyInner>,
}

struct LazyInner {
    #[allow(clippy::type_complexity)]
    fun: Box<dyn Fn() -> Result<Dynamic>>,
    value: RefCell<Option<Dynamic>>,
}

impl Lazy {
    /// Creates a lazy value. Nothing runs until it is first read.
    pub fn new<T>(fun: impl Fn() -> Result<T> + 'static) -> Self
    where
        T: Into<Dynamic>,
    {
        Self {
            inner: Rc::new(LazyInner {
                fun: Box::new(move || fun().map(Into::into)),
                value: RefCell::new(None),
            }),
        }
    }

    /// Returns the memoized result, running the computation if needed.
    ///
    /// A failed computation is not memoized; the next read runs it again.
    pub fn value(&self) -> Result<Dynamic> {
        if let Some(value) = self.inner.value.borrow().as_ref() {
            return Ok(value.clone());
        }
        let value = (self.inner.fun)()?;
        *self.inner.value.borrow_mut() = Some(value.clone());
        Ok(value)
    }

    /// Forgets the memoized result, so that the next read runs the computation again.
    pub fn invalidate(&self) {
        self.inner.value.borrow_mut().take();
    }

    /// Whether the computation has run since the last invalidation.
    pub fn is_evaluated(&self) -> bool {
        self.inner.value.borrow().is_some()
    }
}

impl Debug for Lazy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lazy")
            .field("evaluated", &self.is_evaluated())
            .finish_non_exhaustive()
    }
}

impl Value for Lazy {
    fn get(&self, _scope: &dyn Scope) -> Result<Dynamic> {
        self.value()
    }
}
