use super::{AnyValue, Value};
use crate::{
    dynamic::{Dynamic, Kind},
    error::Result,
    traits::Scope,
};

/// Evaluates a sequence of values against the same scope, in order.
///
/// The dependencies of a list are the union of the dependencies of its items. If any item
/// fails, the whole list fails.
#[derive(Debug, Clone, Default)]
pub struct ValueList(Vec<AnyValue>);

impl ValueList {
    /// Creates a list from its items.
    pub fn new(values: impl IntoIterator<Item = impl Into<AnyValue>>) -> Self {
        Self(values.into_iter().map(Into::into).collect())
    }

    /// The items of this list.
    pub fn values(&self) -> &[AnyValue] {
        &self.0
    }
}

impl Value for ValueList {
    fn kind(&self) -> Option<Kind> {
        Some(Kind::List)
    }

    fn get(&self, scope: &dyn Scope) -> Result<Dynamic> {
        let items = self
            .0
            .iter()
            .map(|value| value.get(scope))
            .collect::<Result<Vec<_>>>()?;
        Ok(Dynamic::from(items))
    }
}

impl FromIterator<AnyValue> for ValueList {
    fn from_iter<T: IntoIterator<Item = AnyValue>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
