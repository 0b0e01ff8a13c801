use crate::error::{ContextError, Result};
use std::{
    any::{type_name, Any},
    fmt::{self, Debug, Display},
    rc::Rc,
};

/// The type-erased result of evaluating a [`Value`](crate::Value).
#[derive(Clone, Default)]
pub enum Dynamic {
    /// The absence of a meaningful result.
    #[default]
    Unit,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Text(Rc<str>),
    /// An ordered sequence of results.
    List(Rc<[Dynamic]>),
    /// Any other payload, compared by identity.
    Opaque(Rc<dyn Any>),
}

/// The kind of a [`Dynamic`] result, used to declare and check element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// [`Dynamic::Unit`]
    Unit,
    /// [`Dynamic::Bool`]
    Bool,
    /// [`Dynamic::Int`]
    Int,
    /// [`Dynamic::Float`]
    Float,
    /// [`Dynamic::Text`]
    Text,
    /// [`Dynamic::List`]
    List,
    /// [`Dynamic::Opaque`]
    Opaque,
}

impl Kind {
    /// A short, human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Unit => "unit",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Text => "text",
            Kind::List => "list",
            Kind::Opaque => "opaque",
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Dynamic {
    /// Wraps an arbitrary payload.
    pub fn opaque<T: Any>(value: T) -> Self {
        Self::Opaque(Rc::new(value))
    }

    /// The kind of this result.
    pub fn kind(&self) -> Kind {
        match self {
            Dynamic::Unit => Kind::Unit,
            Dynamic::Bool(_) => Kind::Bool,
            Dynamic::Int(_) => Kind::Int,
            Dynamic::Float(_) => Kind::Float,
            Dynamic::Text(_) => Kind::Text,
            Dynamic::List(_) => Kind::List,
            Dynamic::Opaque(_) => Kind::Opaque,
        }
    }

    /// Borrows the payload of an opaque result, if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Dynamic::Opaque(value) => value.downcast_ref(),
            _ => None,
        }
    }

    /// Converts this result to the given kind.
    ///
    /// Numbers, booleans and text convert into each other where the conversion is meaningful;
    /// any scalar converts into a single-element list. Lists and opaque payloads only convert
    /// to their own kind.
    pub fn coerce(&self, kind: Kind) -> Result<Dynamic> {
        if self.kind() == kind {
            return Ok(self.clone());
        }
        let mismatch = || ContextError::TypeMismatch {
            expected: kind.as_str(),
            found: self.kind(),
        };
        let coerced = match (kind, self) {
            (Kind::Bool, Dynamic::Int(n)) => Dynamic::Bool(*n != 0),
            (Kind::Bool, Dynamic::Float(n)) => Dynamic::Bool(*n != 0.0),
            (Kind::Bool, Dynamic::Text(s)) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Dynamic::Bool(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Dynamic::Bool(false)
                } else {
                    return Err(mismatch());
                }
            }
            (Kind::Int, Dynamic::Bool(b)) => Dynamic::Int(i64::from(*b)),
            (Kind::Int, Dynamic::Float(n)) => {
                let rounded = n.round_ties_even();
                if !rounded.is_finite()
                    || rounded < i64::MIN as f64
                    || rounded >= i64::MAX as f64
                {
                    return Err(mismatch());
                }
                Dynamic::Int(rounded as i64)
            }
            (Kind::Int, Dynamic::Text(s)) => {
                Dynamic::Int(s.trim().parse().map_err(|_| mismatch())?)
            }
            (Kind::Float, Dynamic::Bool(b)) => {
                Dynamic::Float(if *b { 1.0 } else { 0.0 })
            }
            (Kind::Float, Dynamic::Int(n)) => Dynamic::Float(*n as f64),
            (Kind::Float, Dynamic::Text(s)) => {
                Dynamic::Float(s.trim().parse().map_err(|_| mismatch())?)
            }
            (Kind::Text, Dynamic::Bool(_))
            | (Kind::Text, Dynamic::Int(_))
            | (Kind::Text, Dynamic::Float(_)) => {
                Dynamic::Text(Rc::from(self.to_string()))
            }
            (Kind::List, Dynamic::Unit) => Dynamic::List(Rc::new([])),
            (Kind::List, Dynamic::Opaque(_)) => return Err(mismatch()),
            (Kind::List, scalar) => Dynamic::List(Rc::new([scalar.clone()])),
            _ => return Err(mismatch()),
        };
        Ok(coerced)
    }

    /// Extracts a typed value without coercion.
    pub fn extract<T: FromDynamic>(&self) -> Result<T> {
        T::from_dynamic(self).ok_or_else(|| ContextError::TypeMismatch {
            expected: type_name::<T>(),
            found: self.kind(),
        })
    }
}

impl Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dynamic::Unit => f.write_str("Unit"),
            Dynamic::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Dynamic::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Dynamic::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Dynamic::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Dynamic::List(items) => {
                f.debug_list().entries(items.iter()).finish()
            }
            Dynamic::Opaque(value) => f
                .debug_tuple("Opaque")
                .field(&Rc::as_ptr(value).cast::<()>())
                .finish(),
        }
    }
}

impl Display for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dynamic::Unit => Ok(()),
            Dynamic::Bool(b) => Display::fmt(b, f),
            Dynamic::Int(n) => Display::fmt(n, f),
            Dynamic::Float(n) => Display::fmt(n, f),
            Dynamic::Text(s) => f.write_str(s),
            Dynamic::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    Display::fmt(item, f)?;
                }
                f.write_str("]")
            }
            Dynamic::Opaque(_) => f.write_str("<opaque>"),
        }
    }
}

impl PartialEq for Dynamic {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Dynamic::Unit, Dynamic::Unit) => true,
            (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
            (Dynamic::Int(a), Dynamic::Int(b)) => a == b,
            (Dynamic::Float(a), Dynamic::Float(b)) => a == b,
            (Dynamic::Text(a), Dynamic::Text(b)) => a == b,
            (Dynamic::List(a), Dynamic::List(b)) => a == b,
            (Dynamic::Opaque(a), Dynamic::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

macro_rules! dynamic_from {
    ($($ty:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$ty> for Dynamic {
                fn from(value: $ty) -> Self {
                    Dynamic::$variant($conv(value))
                }
            }
        )*
    };
}

dynamic_from! {
    bool => Bool(|b| b),
    i64 => Int(|n| n),
    i32 => Int(i64::from),
    u32 => Int(i64::from),
    f64 => Float(|n| n),
    f32 => Float(f64::from),
    &str => Text(Rc::from),
    String => Text(Rc::from),
    Rc<str> => Text(|s| s),
    Vec<Dynamic> => List(Rc::from),
}

impl From<()> for Dynamic {
    fn from(_: ()) -> Self {
        Dynamic::Unit
    }
}

/// Types that can be extracted from a [`Dynamic`] result.
///
/// Extraction is strict: an `Int` result is not a `f64`, and a `Text` result is not an `i64`.
/// To convert between kinds, wrap the value in a [`Coerced`](crate::Coerced).
pub trait FromDynamic: Sized {
    /// The kind this type is extracted from, if it is restricted to one.
    const KIND: Option<Kind>;

    /// Extracts the value, or returns `None` if the result has an incompatible kind.
    fn from_dynamic(value: &Dynamic) -> Option<Self>;
}

impl FromDynamic for Dynamic {
    const KIND: Option<Kind> = None;

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromDynamic for () {
    const KIND: Option<Kind> = Some(Kind::Unit);

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        matches!(value, Dynamic::Unit).then_some(())
    }
}

impl FromDynamic for bool {
    const KIND: Option<Kind> = Some(Kind::Bool);

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        match value {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromDynamic for i64 {
    const KIND: Option<Kind> = Some(Kind::Int);

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        match value {
            Dynamic::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl FromDynamic for i32 {
    const KIND: Option<Kind> = Some(Kind::Int);

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        match value {
            Dynamic::Int(n) => i32::try_from(*n).ok(),
            _ => None,
        }
    }
}

impl FromDynamic for f64 {
    const KIND: Option<Kind> = Some(Kind::Float);

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        match value {
            Dynamic::Float(n) => Some(*n),
            _ => None,
        }
    }
}

impl FromDynamic for String {
    const KIND: Option<Kind> = Some(Kind::Text);

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        match value {
            Dynamic::Text(s) => Some(s.to_string()),
            _ => None,
        }
    }
}

impl FromDynamic for Vec<Dynamic> {
    const KIND: Option<Kind> = Some(Kind::List);

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        match value {
            Dynamic::List(items) => Some(items.to_vec()),
            _ => None,
        }
    }
}

impl<T: Any> FromDynamic for Rc<T> {
    const KIND: Option<Kind> = Some(Kind::Opaque);

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        match value {
            Dynamic::Opaque(value) => Rc::clone(value).downcast().ok(),
            _ => None,
        }
    }
}
