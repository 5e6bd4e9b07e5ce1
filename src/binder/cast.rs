//! Conversion of raw attribute values into typed field values.
//!
//! Order: exact type, then semantic constructors (size, time, color, path, array wrap), then the
//! generic numeric/boolean/string conversion, then one retry from the value's string form.

use std::path::PathBuf;

use crate::color::Color;
use crate::units::{SizeUnit, TimeUnit};
use crate::value::Value;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("cannot convert {found} '{input}' to {expected}")]
pub struct CastError {
    pub expected: &'static str,
    pub found: &'static str,
    pub input: String,
}

/// A type a field can hold.
pub trait Castable: Sized + Clone + std::fmt::Debug + Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    fn from_exact(_v: &Value) -> Option<Self> {
        None
    }

    fn from_semantic(_v: &Value) -> Option<Self> {
        None
    }

    fn from_generic(v: &Value) -> Option<Self>;
}

pub fn cast<T: Castable>(v: &Value) -> Result<T, CastError> {
    if let Some(out) = T::from_exact(v)
        .or_else(|| T::from_semantic(v))
        .or_else(|| T::from_generic(v))
    {
        return Ok(out);
    }
    if !matches!(v, Value::String(_)) {
        let retry = Value::String(v.to_display_string());
        if let Some(out) = T::from_semantic(&retry).or_else(|| T::from_generic(&retry)) {
            return Ok(out);
        }
    }
    Err(CastError {
        expected: T::TYPE_NAME,
        found: v.type_name(),
        input: v.to_display_string(),
    })
}

impl Castable for Value {
    const TYPE_NAME: &'static str = "value";

    fn from_exact(v: &Value) -> Option<Self> {
        Some(v.clone())
    }

    fn from_generic(v: &Value) -> Option<Self> {
        Some(v.clone())
    }
}

impl Castable for f64 {
    const TYPE_NAME: &'static str = "number";

    fn from_exact(v: &Value) -> Option<Self> {
        v.as_number()
    }

    fn from_generic(v: &Value) -> Option<Self> {
        match v {
            Value::Bool(_) => Some(v.to_number()),
            Value::String(s) => {
                let n = Value::String(s.clone()).to_number();
                (!s.trim().is_empty() && n.is_finite()).then_some(n)
            }
            _ => None,
        }
    }
}

impl Castable for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_exact(v: &Value) -> Option<Self> {
        match v {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn from_generic(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => Some(*n != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" | "" => Some(true),
                "false" | "no" | "off" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Castable for String {
    const TYPE_NAME: &'static str = "string";

    fn from_exact(v: &Value) -> Option<Self> {
        v.as_str().map(str::to_owned)
    }

    fn from_generic(v: &Value) -> Option<Self> {
        match v {
            Value::Number(_) | Value::Bool(_) => Some(v.to_display_string()),
            _ => None,
        }
    }
}

impl Castable for SizeUnit {
    const TYPE_NAME: &'static str = "size";

    fn from_semantic(v: &Value) -> Option<Self> {
        v.as_str().and_then(|s| SizeUnit::parse(s).ok())
    }

    fn from_generic(v: &Value) -> Option<Self> {
        v.as_number().filter(|n| n.is_finite()).map(SizeUnit::Px)
    }
}

impl Castable for TimeUnit {
    const TYPE_NAME: &'static str = "duration";

    fn from_semantic(v: &Value) -> Option<Self> {
        v.as_str().and_then(|s| TimeUnit::parse(s).ok())
    }

    fn from_generic(v: &Value) -> Option<Self> {
        v.as_number()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(TimeUnit::from_millis)
    }
}

impl Castable for Color {
    const TYPE_NAME: &'static str = "color";

    fn from_semantic(v: &Value) -> Option<Self> {
        v.as_str().and_then(|s| Color::parse(s).ok())
    }

    fn from_generic(_v: &Value) -> Option<Self> {
        None
    }
}

impl Castable for PathBuf {
    const TYPE_NAME: &'static str = "path";

    fn from_semantic(v: &Value) -> Option<Self> {
        v.as_str().filter(|s| !s.is_empty()).map(PathBuf::from)
    }

    fn from_generic(_v: &Value) -> Option<Self> {
        None
    }
}

/// Arrays cast element-wise. A lone value is wrapped into a one-element array.
impl<T: Castable> Castable for Vec<T> {
    const TYPE_NAME: &'static str = "array";

    fn from_exact(v: &Value) -> Option<Self> {
        match v {
            Value::Array(items) => items.iter().map(|i| cast::<T>(i).ok()).collect(),
            _ => None,
        }
    }

    fn from_semantic(v: &Value) -> Option<Self> {
        match v {
            Value::Array(_) => None,
            other => cast::<T>(other).ok().map(|one| vec![one]),
        }
    }

    fn from_generic(_v: &Value) -> Option<Self> {
        None
    }
}

/// Implements [`Castable`] for a fieldless enum parsed from case-insensitive keywords.
macro_rules! keyword_enum {
    ($ty:ty, $name:literal, { $($kw:literal => $variant:expr),+ $(,)? }) => {
        impl $crate::binder::cast::Castable for $ty {
            const TYPE_NAME: &'static str = $name;

            fn from_generic(v: &$crate::value::Value) -> Option<Self> {
                let s = v.as_str()?.trim().to_ascii_lowercase();
                match s.as_str() {
                    $($kw => Some($variant),)+
                    _ => None,
                }
            }
        }
    };
}

pub(crate) use keyword_enum;
