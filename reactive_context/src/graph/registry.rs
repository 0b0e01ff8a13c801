//! A list of weak references that never keeps its entries alive.
//!
//! Entries disappear in two ways: explicitly, through [`WeakRegistry::remove`], or implicitly,
//! when the last strong reference is dropped. Dead entries are compacted opportunistically,
//! whenever the registry is walked or a removal finds nothing to remove.

use std::{
    fmt::Debug,
    rc::{Rc, Weak},
};

pub(crate) struct WeakRegistry<T>(Vec<Weak<T>>);

impl<T> Default for WeakRegistry<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> WeakRegistry<T> {
    pub fn insert(&mut self, item: &Rc<T>) {
        self.0.push(Rc::downgrade(item));
    }

    /// Removes the entry pointing at `ptr`.
    ///
    /// Returns `false` if there was no such entry, in which case dead entries are purged
    /// instead. An entry that is already gone is not an error.
    pub fn remove(&mut self, ptr: *const T) -> bool {
        if let Some(pos) = self.0.iter().position(|w| Weak::as_ptr(w) == ptr) {
            self.0.remove(pos);
            true
        } else {
            self.purge();
            false
        }
    }

    /// Drops every entry whose target has been dropped, returning how many were removed.
    pub fn purge(&mut self) -> usize {
        let before = self.0.len();
        self.0.retain(|w| w.strong_count() > 0);
        let purged = before - self.0.len();
        #[cfg(feature = "tracing")]
        {
            if purged > 0 {
                tracing::trace!(purged, "purged dead registry entries");
            }
        }
        purged
    }

    /// Returns strong references to every live entry, purging dead ones on the way.
    pub fn live(&mut self) -> Vec<Rc<T>> {
        let mut live = Vec::with_capacity(self.0.len());
        self.0.retain(|w| match w.upgrade() {
            Some(item) => {
                live.push(item);
                true
            }
            None => false,
        });
        live
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<T> Debug for WeakRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WeakRegistry").field(&self.0.len()).finish()
    }
}
