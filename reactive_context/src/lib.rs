//! A hierarchical, lazily-evaluated reactive value store.
//!
//! A [`Context`] is a scope in a tree of scopes. Each scope owns a set of named values, which
//! may be
//! 1. **literals**: constants that never read anything else,
//! 2. **computed values**: functions of the scope they are read from, and
//! 3. **externally supplied values**: anything implementing [`Value`], such as a [`Lazy`] whose
//!    state is managed by some collaborator outside the store.
//!
//! Reads are memoized per scope. While a value is computed, every key it reads is recorded, so
//! that a later write invalidates exactly those cached results that transitively depended on the
//! written key. Invalidation cascades into child scopes, unless the child owns (and therefore
//! shadows) the key itself.
//!
//! ```rust
//! use reactive_context::{Computed, Context, ScopeExt};
//!
//! let root = Context::new();
//! root.set("rate", 2).unwrap();
//! root.set(
//!     "double",
//!     Computed::new(|cx| Ok(cx.get::<i64>("rate")? * 2)),
//! )
//! .unwrap();
//!
//! let child = Context::child_of(&root);
//! assert_eq!(child.get::<i64>("double").unwrap(), 4);
//!
//! // updating `rate` invalidates `double` in both scopes
//! root.set("rate", 3).unwrap();
//! assert_eq!(root.get::<i64>("double").unwrap(), 6);
//! assert_eq!(child.get::<i64>("double").unwrap(), 6);
//! ```
//!
//! Values that are not bound to any key can be observed with [`Context::subscribe`]. The
//! resulting [`Subscription`] is held weakly by its scope: it is notified whenever one of the
//! keys it read changes, but the scope never keeps it alive.
//!
//! ## Design Principles and Assumptions
//! - **Lazy evaluation.** Nothing is computed until it is read. Invalidation only clears caches
//!   and fires notifications; recomputation happens on the next read.
//! - **Dynamic dependency tracking.** Dependencies are recorded at runtime, on every evaluation.
//!   A value that takes a different branch reads a different set of keys, and only the keys of
//!   its latest evaluation are tracked.
//! - **Single-threaded.** A scope tree lives on one thread. Notifications are delivered
//!   synchronously, and listeners are free to read from and write to the store while they run.

#![deny(missing_docs)]

use std::fmt::Arguments;

pub(crate) mod channel;
pub mod context;
mod dynamic;
mod error;
pub mod graph;
mod key;
#[cfg(feature = "serde")]
mod serde;
pub mod subscription;
pub mod traits;
pub mod value;

pub use context::{ChangeStream, Context, DeletePolicy, ListenerId};
pub use dynamic::{Dynamic, FromDynamic, Kind};
pub use error::{ContextError, Result};
pub use key::Key;
pub use subscription::Subscription;
pub use traits::{Scope, ScopeExt};
pub use value::{AnyValue, Coerced, Computed, Lazy, Literal, Value, ValueList};

/// Reexports frequently-used types and traits.
pub mod prelude {
    pub use crate::{
        traits::*,
        value::{Computed, Lazy, Literal, Value, ValueList},
        Context, Dynamic, Kind,
    };
}

#[allow(unused)]
#[doc(hidden)]
pub fn log_warning(text: Arguments) {
    #[cfg(feature = "tracing")]
    {
        tracing::warn!(text);
    }
    #[cfg(not(feature = "tracing"))]
    {
        eprintln!("{}", text);
    }
}
