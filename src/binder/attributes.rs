//! Applying node attributes to element fields.

use std::sync::Arc;

use crate::binder::registry::{ElementDescriptor, FieldDescriptor};
use crate::binder::{BindContext, BoundElement};
use crate::document::{AttributeKind, Node, NodeAttribute};
use crate::elements::ElementBody;
use crate::error::{RenderError, RenderResult};
use crate::expression::Environment;
use crate::value::Value;

/// Result of routing one attribute to the element's field table.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Applied {
    Assigned,
    /// Spread attributes are collected and expanded per frame.
    Spread,
    /// No field accepts the name.
    Unmatched,
    /// Policy said skip.
    Skipped,
}

pub(crate) fn apply_attribute(
    ctx: &BindContext<'_>,
    node: &Node,
    descriptor: &ElementDescriptor,
    body: &mut ElementBody,
    attr: &Arc<NodeAttribute>,
) -> RenderResult<Applied> {
    if attr.kind == AttributeKind::Spread {
        return Ok(Applied::Spread);
    }

    let field = match descriptor.fields_for(&attr.name).as_slice() {
        [] => return Ok(Applied::Unmatched),
        [one] => *one,
        many => {
            let names: Vec<&str> = many.iter().map(|f| f.name).collect();
            let err = RenderError::attribute(format!(
                "attribute '{}' matches several properties: {}",
                attr.name,
                names.join(", ")
            ))
            .with_element(node);
            ctx.gate(ctx.policy.attribute_ambiguous, err)?;
            return Ok(Applied::Skipped);
        }
    };

    if attr.kind == AttributeKind::Bind && !field.bindable {
        let err = RenderError::attribute(format!(
            "attribute '{}' cannot be bound; give it a literal value",
            attr.name
        ))
        .with_element(node);
        ctx.gate(ctx.policy.attribute_bind_invalid, err)?;
        return Ok(Applied::Skipped);
    }

    assign(node, body, field, attr)?;
    Ok(Applied::Assigned)
}

fn assign(
    node: &Node,
    body: &mut ElementBody,
    field: &FieldDescriptor,
    attr: &Arc<NodeAttribute>,
) -> RenderResult<()> {
    let slot = body.slot(field.name).ok_or_else(|| {
        RenderError::binding(format!(
            "element has no storage for field '{}'",
            field.name
        ))
        .with_element(node)
    })?;
    slot.assign(attr).map_err(|e| {
        RenderError::attribute(format!("attribute '{}': {e}", attr.name))
            .with_source(e)
            .with_element(node)
    })
}

/// A copy of `el` with every spread attribute evaluated against `env` and applied as literals.
///
/// Returns `None` when the element has no spreads, so callers can keep using the original.
pub(crate) fn expand_spreads(
    el: &BoundElement,
    env: &dyn Environment,
) -> RenderResult<Option<BoundElement>> {
    if el.spreads.is_empty() {
        return Ok(None);
    }

    let mut out = el.clone();
    for spread in &el.spreads {
        let expr = spread.compiled().map_err(|e| {
            RenderError::expression(format!("malformed spread expression '{}'", spread.value))
                .with_source(e)
                .with_element(&el.node)
        })?;
        let value = expr.eval(env).map_err(|e| {
            RenderError::expression(format!("evaluating spread '{}' failed", spread.value))
                .with_source(e)
                .with_element(&el.node)
        })?;
        let entries = match value {
            Value::Object(map) => map,
            Value::Undefined | Value::Null => continue,
            other => {
                return Err(RenderError::attribute(format!(
                    "spread '{}' must evaluate to an object, got {}",
                    spread.value,
                    other.type_name()
                ))
                .with_element(&el.node));
            }
        };

        for (key, v) in &entries {
            let field = match el.descriptor.fields_for(key).as_slice() {
                [] => {
                    tracing::debug!(tag = %el.node.tag, key = %key, "spread key matches no property");
                    continue;
                }
                [one] => *one,
                _ => {
                    return Err(RenderError::attribute(format!(
                        "spread key '{key}' matches several properties"
                    ))
                    .with_element(&el.node));
                }
            };
            let slot = out.body.slot(field.name).ok_or_else(|| {
                RenderError::binding(format!("element has no storage for field '{}'", field.name))
                    .with_element(&el.node)
            })?;
            slot.assign_value(v, spread).map_err(|e| {
                RenderError::attribute(format!("spread key '{key}': {e}"))
                    .with_source(e)
                    .with_element(&el.node)
            })?;
        }
    }
    Ok(Some(out))
}
