use super::{AnyValue, Value};
use crate::{
    dynamic::{Dynamic, Kind},
    error::Result,
    traits::Scope,
};

/// Converts the result of another value to a declared [`Kind`].
///
/// Fails with [`TypeMismatch`](crate::ContextError::TypeMismatch) if the inner result can
/// neither be used as-is nor converted; see [`Dynamic::coerce`] for the conversion table.
#[derive(Debug, Clone)]
pub struct Coerced {
    inner: AnyValue,
    kind: Kind,
}

impl Coerced {
    /// Wraps `inner` so that it always produces a `kind` result.
    pub fn new(inner: impl Into<AnyValue>, kind: Kind) -> Self {
        Self {
            inner: inner.into(),
            kind,
        }
    }

    /// The wrapped value.
    pub fn inner(&self) -> &AnyValue {
        &self.inner
    }
}

impl Value for Coerced {
    fn kind(&self) -> Option<Kind> {
        Some(self.kind)
    }

    fn get(&self, scope: &dyn Scope) -> Result<Dynamic> {
        self.inner.get(scope)?.coerce(self.kind)
    }
}
