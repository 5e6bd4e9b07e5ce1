//! Element field storage: bindable [`Field`]s and bind-time-only [`Fixed`] values.

use std::sync::Arc;

use crate::binder::cast::{CastError, Castable, cast};
use crate::document::{AttributeKind, NodeAttribute};
use crate::error::{RenderError, RenderResult};
use crate::expression::Environment;
use crate::value::Value;

/// The value carried by a source attribute before casting.
pub(crate) fn raw_value(attr: &NodeAttribute) -> Value {
    match attr.kind {
        AttributeKind::BooleanTrue => Value::Bool(true),
        _ => Value::String(attr.value.clone()),
    }
}

/// A bindable value. Literals are cast once at bind time; binds re-evaluate every frame.
#[derive(Debug, Clone)]
pub enum Dynamic<T> {
    Literal {
        value: T,
        origin: Arc<NodeAttribute>,
    },
    Bound(Arc<NodeAttribute>),
}

impl<T: Castable> Dynamic<T> {
    pub fn origin(&self) -> &Arc<NodeAttribute> {
        match self {
            Self::Literal { origin, .. } | Self::Bound(origin) => origin,
        }
    }

    /// Resolve against `env`. A bind yielding `undefined` leaves the field unset.
    pub fn resolve(&self, env: &dyn Environment) -> RenderResult<Option<T>> {
        match self {
            Self::Literal { value, .. } => Ok(Some(value.clone())),
            Self::Bound(attr) => {
                let expr = attr.compiled().map_err(|e| {
                    RenderError::expression(format!(
                        "malformed expression for '{}': {e}",
                        attr.name
                    ))
                    .with_source(e)
                })?;
                let v = expr.eval(env).map_err(|e| {
                    RenderError::expression(format!(
                        "evaluating '{}' for '{}' failed",
                        attr.value, attr.name
                    ))
                    .with_source(e)
                })?;
                if matches!(v, Value::Undefined) {
                    return Ok(None);
                }
                cast::<T>(&v).map(Some).map_err(|e| {
                    RenderError::attribute(format!("attribute '{}': {e}", attr.name))
                })
            }
        }
    }
}

/// A field slot on an element. Object safe so the binder can drive any field type.
pub trait FieldSlot {
    fn bindable(&self) -> bool;

    /// Apply a literal, flag or bind attribute.
    fn assign(&mut self, attr: &Arc<NodeAttribute>) -> Result<(), CastError>;

    /// Apply an already evaluated value through the literal path (spread expansion).
    fn assign_value(&mut self, value: &Value, origin: &Arc<NodeAttribute>) -> Result<(), CastError>;
}

#[derive(Debug, Clone)]
pub struct Field<T>(Option<Dynamic<T>>);

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T: Castable> Field<T> {
    pub fn literal(value: T, origin: Arc<NodeAttribute>) -> Self {
        Self(Some(Dynamic::Literal { value, origin }))
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn dynamic(&self) -> Option<&Dynamic<T>> {
        self.0.as_ref()
    }

    pub fn resolve(&self, env: &dyn Environment) -> RenderResult<Option<T>> {
        match &self.0 {
            None => Ok(None),
            Some(d) => d.resolve(env),
        }
    }

    pub fn resolve_or(&self, env: &dyn Environment, default: T) -> RenderResult<T> {
        Ok(self.resolve(env)?.unwrap_or(default))
    }

    /// Resolve a field the element cannot do without.
    pub fn require(&self, env: &dyn Environment, name: &str) -> RenderResult<T> {
        self.resolve(env)?
            .ok_or_else(|| RenderError::attribute(format!("required attribute '{name}' is missing")))
    }
}

impl<T: Castable> FieldSlot for Field<T> {
    fn bindable(&self) -> bool {
        true
    }

    fn assign(&mut self, attr: &Arc<NodeAttribute>) -> Result<(), CastError> {
        self.0 = Some(match attr.kind {
            AttributeKind::Bind => Dynamic::Bound(Arc::clone(attr)),
            _ => Dynamic::Literal {
                value: cast::<T>(&raw_value(attr))?,
                origin: Arc::clone(attr),
            },
        });
        Ok(())
    }

    fn assign_value(&mut self, value: &Value, origin: &Arc<NodeAttribute>) -> Result<(), CastError> {
        self.0 = Some(Dynamic::Literal {
            value: cast::<T>(value)?,
            origin: Arc::clone(origin),
        });
        Ok(())
    }
}

/// A value fixed at bind time. Bind attributes are rejected for these.
#[derive(Debug, Clone)]
pub struct Fixed<T>(Option<T>);

impl<T> Default for Fixed<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T: Castable> Fixed<T> {
    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl<T: Castable> FieldSlot for Fixed<T> {
    fn bindable(&self) -> bool {
        false
    }

    fn assign(&mut self, attr: &Arc<NodeAttribute>) -> Result<(), CastError> {
        self.0 = Some(cast::<T>(&raw_value(attr))?);
        Ok(())
    }

    fn assign_value(&mut self, value: &Value, _origin: &Arc<NodeAttribute>) -> Result<(), CastError> {
        self.0 = Some(cast::<T>(value)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::SizeUnit;
    use crate::value::Variables;

    fn env(pairs: &[(&str, Value)]) -> Variables {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
    }

    #[test]
    fn literal_is_cast_at_assignment() {
        let mut f = Field::<SizeUnit>::default();
        f.assign(&Arc::new(NodeAttribute::literal("x", "10%"))).unwrap();
        assert_eq!(f.resolve(&env(&[])).unwrap(), Some(SizeUnit::Percent(10.0)));
        assert!(f.assign(&Arc::new(NodeAttribute::literal("x", "ten"))).is_err());
    }

    #[test]
    fn bound_value_resolves_per_environment() {
        let mut f = Field::<f64>::default();
        f.assign(&Arc::new(NodeAttribute::bind("x", "frame * 10"))).unwrap();
        assert_eq!(f.resolve(&env(&[("frame", 2.0.into())])).unwrap(), Some(20.0));
        assert_eq!(f.resolve(&env(&[("frame", 3.0.into())])).unwrap(), Some(30.0));
    }

    #[test]
    fn undefined_bind_leaves_field_unset() {
        let mut f = Field::<f64>::default();
        f.assign(&Arc::new(NodeAttribute::bind("x", "missing"))).unwrap();
        assert_eq!(f.resolve(&env(&[])).unwrap(), None);
        assert_eq!(f.resolve_or(&env(&[]), 7.0).unwrap(), 7.0);
        assert!(f.require(&env(&[]), "x").is_err());
    }

    #[test]
    fn bound_cast_failure_is_an_attribute_error() {
        let mut f = Field::<f64>::default();
        f.assign(&Arc::new(NodeAttribute::bind("x", "'wide'"))).unwrap();
        let err = f.resolve(&env(&[])).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Attribute);
    }

    #[test]
    fn malformed_bind_fails_on_first_resolve() {
        let mut f = Field::<f64>::default();
        f.assign(&Arc::new(NodeAttribute::bind("x", "1 +"))).unwrap();
        let err = f.resolve(&env(&[])).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Expression);
    }

    #[test]
    fn flags_cast_from_true() {
        let mut f = Fixed::<bool>::default();
        f.assign(&Arc::new(NodeAttribute::flag("setup"))).unwrap();
        assert_eq!(f.get(), Some(&true));
        assert!(!f.bindable());
    }
}
