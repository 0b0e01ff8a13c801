use std::{
    borrow::Borrow,
    fmt::{self, Debug, Display},
    sync::Arc,
};

/// A normalized key path.
///
/// Keys can be written with either `.` or `/` as the separator. Both spellings are normalized to
/// the dotted form before any lookup, so `"a.b"` and `"a/b"` denote the same key.
///
/// ```rust
/// use reactive_context::Key;
///
/// let key = Key::new("settings/theme");
/// assert_eq!(key.as_str(), "settings.theme");
/// assert_eq!(key.alternate(), "settings/theme");
/// assert_eq!(key, Key::new("settings.theme"));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Arc<str>);

impl Key {
    /// Normalizes the given path into a key.
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        if path.contains('/') {
            Self(Arc::from(path.replace('/', ".")))
        } else {
            Self(Arc::from(path))
        }
    }

    /// The canonical, dot-separated spelling of this key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The slash-separated spelling of this key.
    pub fn alternate(&self) -> String {
        self.0.replace('.', "/")
    }

    /// Whether this is the empty key, which never names a value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&Key> for Key {
    fn from(value: &Key) -> Self {
        value.clone()
    }
}
