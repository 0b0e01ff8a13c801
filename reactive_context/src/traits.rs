//! Traits for reading from a scope.
//!
//! ## Base Trait
//! [`Scope`] is what a [`Value`](crate::Value) sees while it is evaluated: either a
//! [`Context`](crate::Context) itself, or the dependency tracker that wraps one during an
//! evaluation. It is object-safe and works in terms of untyped [`Dynamic`] results.
//!
//! ## Derived Trait
//! [`ScopeExt`] is implemented for every `Scope` (including `dyn Scope`) and adds typed access.
//!
//! | Method             | Returns               | Description
//! |--------------------|-----------------------|------------
//! | [`get`]            | `Result<T>`           | Reads a key as `T`, failing on a miss or a type mismatch.
//! | [`try_get`]        | `Result<Option<T>>`   | Reads a key as `T`, reporting a miss or a type mismatch as `None`.
//! | [`get_or`]         | `Result<T>`           | Like [`try_get`], with a default.
//! | [`get_f64_or`]     | `Result<f64>`         | Reads any numeric or textual value as `f64`, with a default.
//! | [`get_many`]       | `Result<Vec<T>>`      | Reads a single `T` or a list, keeping the items that are `T`.
//! | [`try_get_many`]   | `Result<Option<Vec<T>>>` | Like [`get_many`], reporting a miss as `None`.
//!
//! [`get`]: ScopeExt::get
//! [`try_get`]: ScopeExt::try_get
//! [`get_or`]: ScopeExt::get_or
//! [`get_f64_or`]: ScopeExt::get_f64_or
//! [`get_many`]: ScopeExt::get_many
//! [`try_get_many`]: ScopeExt::try_get_many

use crate::{
    dynamic::{Dynamic, FromDynamic, Kind},
    error::{ContextError, Result},
    key::Key,
};

/// Read access to a set of keyed values.
pub trait Scope {
    /// Reads the value of `key`.
    ///
    /// Fails with [`KeyNotFound`](ContextError::KeyNotFound) if nothing owns the key, or with
    /// whatever error the value's evaluation raised.
    fn get_dynamic(&self, key: &Key) -> Result<Dynamic>;

    /// Reads the value of `key`, reporting a miss as `None`.
    ///
    /// Only [`RecursiveEvaluation`](ContextError::RecursiveEvaluation) is returned as an error;
    /// every other failure is a miss.
    fn try_get_dynamic(&self, key: &Key) -> Result<Option<Dynamic>>;
}

impl<S: Scope + ?Sized> Scope for &S {
    fn get_dynamic(&self, key: &Key) -> Result<Dynamic> {
        (**self).get_dynamic(key)
    }

    fn try_get_dynamic(&self, key: &Key) -> Result<Option<Dynamic>> {
        (**self).try_get_dynamic(key)
    }
}

/// Typed access for every [`Scope`].
pub trait ScopeExt: Scope {
    /// Reads `key` as a `T`.
    ///
    /// The result is not coerced: reading an integer as a `String` fails with
    /// [`TypeMismatch`](ContextError::TypeMismatch).
    fn get<T: FromDynamic>(&self, key: impl Into<Key>) -> Result<T> {
        self.get_dynamic(&key.into())?.extract()
    }

    /// Reads `key` as a `T`, reporting a miss or a type mismatch as `None`.
    fn try_get<T: FromDynamic>(
        &self,
        key: impl Into<Key>,
    ) -> Result<Option<T>> {
        Ok(self
            .try_get_dynamic(&key.into())?
            .and_then(|value| T::from_dynamic(&value)))
    }

    /// Reads `key` as a `T`, or returns `default` on a miss or a type mismatch.
    fn get_or<T: FromDynamic>(
        &self,
        key: impl Into<Key>,
        default: T,
    ) -> Result<T> {
        Ok(self.try_get(key)?.unwrap_or(default))
    }

    /// Reads `key` as a number, converting booleans, integers and numeric text, or returns
    /// `default` if the key is missing or not convertible.
    fn get_f64_or(&self, key: impl Into<Key>, default: f64) -> Result<f64> {
        Ok(self
            .try_get_dynamic(&key.into())?
            .and_then(|value| value.coerce(Kind::Float).ok())
            .and_then(|value| f64::from_dynamic(&value))
            .unwrap_or(default))
    }

    /// Reads `key` as a sequence of `T`.
    ///
    /// A single `T` becomes a one-element sequence; a list keeps only its items that are `T`.
    /// Any other result fails with [`TypeMismatch`](ContextError::TypeMismatch).
    fn get_many<T: FromDynamic>(&self, key: impl Into<Key>) -> Result<Vec<T>> {
        let value = self.get_dynamic(&key.into())?;
        many(&value).ok_or_else(|| ContextError::TypeMismatch {
            expected: std::any::type_name::<Vec<T>>(),
            found: value.kind(),
        })
    }

    /// Reads `key` as a sequence of `T`, reporting a miss or an incompatible result as `None`.
    fn try_get_many<T: FromDynamic>(
        &self,
        key: impl Into<Key>,
    ) -> Result<Option<Vec<T>>> {
        Ok(self
            .try_get_dynamic(&key.into())?
            .and_then(|value| many(&value)))
    }
}

impl<S: Scope + ?Sized> ScopeExt for S {}

fn many<T: FromDynamic>(value: &Dynamic) -> Option<Vec<T>> {
    if let Some(single) = T::from_dynamic(value) {
        return Some(vec![single]);
    }
    match value {
        Dynamic::List(items) => {
            Some(items.iter().filter_map(T::from_dynamic).collect())
        }
        _ => None,
    }
}
