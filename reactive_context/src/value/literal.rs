use super::Value;
use crate::{
    dynamic::{Dynamic, Kind},
    error::Result,
    traits::Scope,
};

/// A constant value. It never reads its scope, so it never has dependencies.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal(Dynamic);

impl Literal {
    /// Creates a literal from anything convertible into a [`Dynamic`].
    pub fn new(value: impl Into<Dynamic>) -> Self {
        Self(value.into())
    }

    /// The constant this literal returns.
    pub fn value(&self) -> &Dynamic {
        &self.0
    }
}

impl Value for Literal {
    fn kind(&self) -> Option<Kind> {
        Some(self.0.kind())
    }

    fn get(&self, _scope: &dyn Scope) -> Result<Dynamic> {
        Ok(self.0.clone())
    }
}
