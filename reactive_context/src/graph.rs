//! The dependency-tracking machinery shared by named keys and anonymous subscriptions.

mod registry;
mod tracker;

pub(crate) use registry::*;
pub use tracker::*;

use crate::key::Key;
use rustc_hash::FxHashSet;

/// The set of keys read during one evaluation.
pub type KeySet = FxHashSet<Key>;
