//! Values: the units of computation stored under a key.
//!
//! | Type          | Reads the scope | Description                                                      |
//! |---------------|-----------------|------------------------------------------------------------------|
//! | [`Literal`]   | no              | A constant.                                                      |
//! | [`Computed`]  | yes             | A function of the scope it is read from.                         |
//! | [`Coerced`]   | via its inner   | Converts another value's result to a declared [`Kind`].          |
//! | [`ValueList`] | via its items   | Evaluates several values against the same scope.                 |
//! | [`Lazy`]      | no              | A memoized zero-argument computation, invalidated by its owner.  |
//!
//! Any type implementing [`Value`] can be stored in a [`Context`](crate::Context).

mod coerced;
mod computed;
mod lazy;
mod list;
mod literal;

pub use coerced::*;
pub use computed::*;
pub use lazy::*;
pub use list::*;
pub use literal::*;

use crate::{
    dynamic::{Dynamic, Kind},
    error::Result,
    traits::Scope,
};
use std::{fmt::Debug, rc::Rc};

/// Produces a result, given the scope it is read from.
///
/// A value does not know which scope owns it. Every key it reads through `scope` while it is
/// being evaluated becomes one of its dependencies.
pub trait Value: 'static {
    /// The kind of result this value declares, if it declares one.
    fn kind(&self) -> Option<Kind> {
        None
    }

    /// Evaluates the value.
    fn get(&self, scope: &dyn Scope) -> Result<Dynamic>;
}

/// A type-erased, shareable [`Value`].
#[derive(Clone)]
pub struct AnyValue(Rc<dyn Value>);

impl AnyValue {
    /// Erases the type of a value.
    pub fn new(value: impl Value) -> Self {
        Self(Rc::new(value))
    }

    /// The kind of result this value declares, if it declares one.
    pub fn kind(&self) -> Option<Kind> {
        self.0.kind()
    }

    /// Evaluates the value.
    pub fn get(&self, scope: &dyn Scope) -> Result<Dynamic> {
        self.0.get(scope)
    }

    /// Wraps this value in a [`Coerced`] unless it already declares `kind`.
    pub fn coerce(self, kind: Kind) -> AnyValue {
        if self.kind() == Some(kind) {
            self
        } else {
            AnyValue::new(Coerced::new(self, kind))
        }
    }

    /// Whether both handles refer to the same value.
    pub fn ptr_eq(&self, other: &AnyValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for AnyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyValue")
            .field("kind", &self.kind())
            .field("data", &Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

impl<T: Value> From<T> for AnyValue {
    fn from(value: T) -> Self {
        AnyValue::new(value)
    }
}

macro_rules! literal_value_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AnyValue {
                fn from(value: $ty) -> Self {
                    AnyValue::new(Literal::new(value))
                }
            }
        )*
    };
}

literal_value_from!(bool, i64, i32, u32, f64, f32, &str, String, Dynamic);
