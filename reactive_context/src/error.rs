use crate::{dynamic::Kind, key::Key};
use thiserror::Error;

/// A specialized [`Result`](std::result::Result) for reactive context operations.
pub type Result<T, E = ContextError> = std::result::Result<T, E>;

/// Errors that can occur when reading from or writing to a [`Context`](crate::Context).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    /// No scope in the ancestor chain owns the key.
    #[error("no value found for key `{0}`")]
    KeyNotFound(Key),

    /// A cached or computed result is incompatible with the requested type.
    #[error("expected a value of type `{expected}`, found {found}")]
    TypeMismatch {
        /// The requested type.
        expected: &'static str,
        /// The kind of the result that was actually produced.
        found: Kind,
    },

    /// A computation read a key that is currently being computed.
    #[error("recursive evaluation of key `{0}`")]
    RecursiveEvaluation(Key),

    /// An argument was empty or otherwise unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A subscription was read after it was disposed, or after its scope was dropped.
    #[error("tried to access a subscription that has already been disposed")]
    DisposedAccess,

    /// Tried to delete a key that cached computations still depend on.
    #[error(
        "cannot delete `{key}`: {} cached value(s) and {subscriptions} \
         subscription(s) depend on it",
        .dependents.len()
    )]
    DependentsExist {
        /// The key that was to be deleted.
        key: Key,
        /// The cached keys that still list it as a dependency.
        dependents: Vec<Key>,
        /// How many live subscriptions still list it as a dependency.
        subscriptions: usize,
    },

    /// A failure raised by a value's own computation.
    #[error("{0}")]
    Custom(String),
}

impl ContextError {
    /// Creates a [`ContextError::Custom`] error from any message.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Whether [`try_get`](crate::ScopeExt::try_get) should still surface this error instead of
    /// reporting a miss.
    pub(crate) fn is_fatal(&self) -> bool {
        matches!(self, Self::RecursiveEvaluation(_))
    }
}
