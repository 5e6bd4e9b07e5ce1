//! Control-flow elements: `if`, `for-each` and `range`.

use crate::binder::BoundElement;
use crate::binder::field::{Field, Fixed};
use crate::binder::registry::FieldDescriptor;
use crate::error::{RenderError, RenderResult};
use crate::frame::RenderFrame;
use crate::scope::ScopeFrame;
use crate::value::Value;

pub(crate) const IF_FIELDS: &[FieldDescriptor] = &[FieldDescriptor::bindable(
    "condition",
    &["condition", "con"],
    "value",
)];

pub(crate) const FOR_EACH_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::bindable("each", &["each", "in", "of"], "value"),
    FieldDescriptor::fixed("let", &["let", "as"], "string"),
];

pub(crate) const RANGE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::bindable("start", &["start", "from"], "number"),
    FieldDescriptor::bindable("end", &["end", "to"], "number"),
    FieldDescriptor::bindable("step", &["step"], "number"),
    FieldDescriptor::fixed("let", &["let", "as"], "string"),
];

/// Renders its children only when `condition` is truthy.
#[derive(Debug, Clone, Default)]
pub struct If {
    pub condition: Field<Value>,
}

field_slots!(If { "condition" => condition });

impl If {
    pub(crate) fn render(&self, el: &BoundElement, frame: &mut RenderFrame<'_>) -> RenderResult<()> {
        let condition = self.condition.resolve(frame.env())?.unwrap_or_default();
        if !condition.is_truthy() {
            return Ok(());
        }
        let scope = ScopeFrame::new(Some(el.tag()), frame.layout());
        frame.with_scope(scope, |f| f.render_children(el))
    }
}

/// Renders its children once per item of `each`, with the item bound to `let`.
#[derive(Debug, Clone, Default)]
pub struct ForEach {
    pub each: Field<Value>,
    pub binding: Fixed<String>,
}

field_slots!(ForEach {
    "each" => each,
    "let" => binding,
});

impl ForEach {
    pub(crate) fn render(&self, el: &BoundElement, frame: &mut RenderFrame<'_>) -> RenderResult<()> {
        let name = loop_variable(&self.binding).ok_or_else(|| {
            RenderError::attribute("for-each requires a loop variable name ('let')")
        })?;
        let iterable = self.each.resolve(frame.env())?.unwrap_or_default();
        for item in items(iterable)? {
            frame.check_cancelled()?;
            let scope = ScopeFrame::new(Some(el.tag()), frame.layout()).with_var(name, item);
            frame.with_scope(scope, |f| f.render_children(el))?;
        }
        Ok(())
    }
}

fn loop_variable(binding: &Fixed<String>) -> Option<&str> {
    binding
        .get()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// The values a for-each iterates over. Strings iterate by character; a missing iterable
/// iterates nothing.
pub(crate) fn items(iterable: Value) -> RenderResult<Vec<Value>> {
    match iterable {
        Value::Undefined | Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        other => Err(RenderError::attribute(format!(
            "for-each 'each' must be an array or string, got {}",
            other.type_name()
        ))),
    }
}

/// Renders its children for each number from `start` (inclusive) to `end` (exclusive).
#[derive(Debug, Clone, Default)]
pub struct Range {
    pub start: Field<f64>,
    pub end: Field<f64>,
    pub step: Field<f64>,
    pub binding: Fixed<String>,
}

field_slots!(Range {
    "start" => start,
    "end" => end,
    "step" => step,
    "let" => binding,
});

impl Range {
    pub(crate) fn render(&self, el: &BoundElement, frame: &mut RenderFrame<'_>) -> RenderResult<()> {
        let env = frame.env();
        let start = self.start.resolve_or(env, 0.0)?;
        let end = self.end.require(env, "end")?;
        let step = self.step.resolve_or(env, 1.0)?;
        let name = loop_variable(&self.binding);

        for value in steps(start, end, step)? {
            frame.check_cancelled()?;
            let mut scope = ScopeFrame::new(Some(el.tag()), frame.layout());
            if let Some(name) = name {
                scope = scope.with_var(name, Value::Number(value));
            }
            frame.with_scope(scope, |f| f.render_children(el))?;
        }
        Ok(())
    }
}

/// The values of a half-open numeric range, counting up from `start` while below `end`.
/// A step that would never leave a non-empty range is rejected.
pub(crate) fn steps(start: f64, end: f64, step: f64) -> RenderResult<impl Iterator<Item = f64>> {
    if !(start.is_finite() && end.is_finite() && step.is_finite()) {
        return Err(RenderError::attribute(format!(
            "range bounds must be finite numbers (start={start}, end={end}, step={step})"
        )));
    }
    let count = if start >= end {
        0
    } else if step <= 0.0 {
        return Err(RenderError::attribute(format!(
            "range step {step} never reaches {end} from {start}"
        )));
    } else {
        ((end - start) / step).ceil() as u64
    };
    Ok((0..count).map(move |i| start + i as f64 * step))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(start: f64, end: f64, step: f64) -> Vec<f64> {
        steps(start, end, step).unwrap().collect()
    }

    #[test]
    fn range_is_half_open() {
        assert_eq!(collect(0.0, 5.0, 1.0), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(collect(0.0, 5.0, 2.0), vec![0.0, 2.0, 4.0]);
        assert!(collect(3.0, 3.0, 1.0).is_empty());
    }

    #[test]
    fn ranges_that_start_past_the_end_are_empty() {
        assert!(collect(5.0, 0.0, 1.0).is_empty());
        assert!(collect(5.0, 0.0, -2.5).is_empty());
        assert!(collect(5.0, 0.0, 0.0).is_empty());
    }

    #[test]
    fn range_rejects_unreachable_steps() {
        assert!(steps(0.0, 5.0, 0.0).is_err());
        assert!(steps(0.0, 5.0, -1.0).is_err());
        assert!(steps(0.0, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn for_each_items() {
        assert_eq!(items(Value::Array(vec![])).unwrap(), vec![]);
        assert_eq!(items(Value::from("ab")).unwrap(), vec![Value::from("a"), Value::from("b")]);
        assert!(items(Value::Undefined).unwrap().is_empty());
        assert!(items(Value::Null).unwrap().is_empty());
        assert!(items(Value::Number(3.0)).is_err());
    }

    #[test]
    fn blank_loop_variable_counts_as_missing() {
        assert_eq!(loop_variable(&Fixed::default()), None);
    }
}
