use super::Value;
use crate::{dynamic::Dynamic, error::Result, traits::Scope};
use std::{fmt::Debug, rc::Rc};

/// A value computed from the scope it is read from.
///
/// The keys the function reads through the scope during a call are exactly the dependencies of
/// that evaluation.
///
/// ```rust
/// use reactive_context::{Computed, Context, ScopeExt};
///
/// let cx = Context::new();
/// cx.set("first", "Ada").unwrap();
/// cx.set("last", "Lovelace").unwrap();
/// cx.set(
///     "full",
///     Computed::new(|cx| {
///         Ok(format!(
///             "{} {}",
///             cx.get::<String>("first")?,
///             cx.get::<String>("last")?
///         ))
///     }),
/// )
/// .unwrap();
/// assert_eq!(cx.get::<String>("full").unwrap(), "Ada Lovelace");
/// ```
#[derive(Clone)]
pub struct Computed {
    #[allow(clippy::type_complexity)]
    fun: Rc<dyn Fn(&dyn Scope) -> Result<Dynamic>>,
}

impl Computed {
    /// Creates a value from a function of the scope.
    pub fn new<T>(fun: impl Fn(&dyn Scope) -> Result<T> + 'static) -> Self
    where
        T: Into<Dynamic>,
    {
        Self {
            fun: Rc::new(move |scope: &dyn Scope| fun(scope).map(Into::into)),
        }
    }
}

impl Debug for Computed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("fun", &Rc::as_ptr(&self.fun).cast::<()>())
            .finish()
    }
}

impl Value for Computed {
    fn get(&self, scope: &dyn Scope) -> Result<Dynamic> {
        (self.fun)(scope)
    }
}
