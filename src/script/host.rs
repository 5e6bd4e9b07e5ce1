//! The `system` module: `drawing`, `context` and `logger` host objects.
//!
//! Native functions hang off one hidden global; the module itself is plain JavaScript that wraps
//! them into frozen objects.

use std::sync::Arc;

use rquickjs::{Ctx, Exception, Function, Object};

use crate::scope::{Axis, LayoutBox};
use crate::units::SizeUnit;
use crate::value::Variables;

pub(crate) const HOST_GLOBAL: &str = "__framewright_host";

pub(crate) const SYSTEM_MODULE: &str = r#"
const host = globalThis.__framewright_host;
const fmt = (args) => args
  .map((a) => (typeof a === 'string' ? a : JSON.stringify(a)))
  .join(' ');

export const drawing = Object.freeze({
  unit: (value, axis) => host.unit(String(value), axis === undefined ? 'width' : String(axis)),
  left: (value) => host.left(String(value)),
  right: (value) => host.right(String(value)),
  top: (value) => host.top(String(value)),
  bottom: (value) => host.bottom(String(value)),
});

export const context = Object.freeze({
  get: (name) => {
    const json = host.contextGet(String(name));
    return json === undefined ? null : JSON.parse(json);
  },
});

export const logger = Object.freeze({
  debug: (...args) => host.log('debug', fmt(args)),
  info: (...args) => host.log('info', fmt(args)),
  warn: (...args) => host.log('warn', fmt(args)),
  error: (...args) => host.log('error', fmt(args)),
});

export default Object.freeze({ drawing, context, logger });
"#;

/// What the host objects see during one execution.
#[derive(Debug, Clone)]
pub struct HostEnv {
    /// The box `drawing` resolves against.
    pub layout: LayoutBox,
    /// Every variable visible to `context.get`.
    pub variables: Variables,
}

fn axis_named(name: &str) -> Option<Axis> {
    match name.to_ascii_lowercase().as_str() {
        "width" | "x" | "horizontal" => Some(Axis::Horizontal),
        "height" | "y" | "vertical" => Some(Axis::Vertical),
        "font" | "font-size" => Some(Axis::Font),
        "min" => Some(Axis::Min),
        _ => None,
    }
}

pub(crate) fn measure(layout: &LayoutBox, value: &str, axis: Axis) -> Result<f64, String> {
    SizeUnit::parse(value)
        .map(|u| layout.resolve(u, axis))
        .map_err(|e| e.to_string())
}

fn edge_fn<'js>(
    ctx: &Ctx<'js>,
    layout: LayoutBox,
    axis: Axis,
    from_far_edge: bool,
) -> rquickjs::Result<Function<'js>> {
    Function::new(ctx.clone(), move |ctx: Ctx<'_>, value: String| {
        let px = measure(&layout, &value, axis).map_err(|m| Exception::throw_message(&ctx, &m))?;
        if !from_far_edge {
            return Ok(px);
        }
        let extent = match axis {
            Axis::Vertical => layout.root.height,
            _ => layout.root.width,
        };
        Ok::<f64, rquickjs::Error>(extent - px)
    })
}

pub(crate) fn install<'js>(ctx: &Ctx<'js>, env: &HostEnv) -> rquickjs::Result<()> {
    let host = Object::new(ctx.clone())?;
    let layout = env.layout;

    host.set(
        "unit",
        Function::new(ctx.clone(), move |ctx: Ctx<'_>, value: String, axis: String| {
            let axis = axis_named(&axis)
                .ok_or_else(|| Exception::throw_message(&ctx, &format!("unknown axis '{axis}'")))?;
            measure(&layout, &value, axis).map_err(|m| Exception::throw_message(&ctx, &m))
        })?,
    )?;
    host.set("left", edge_fn(ctx, layout, Axis::Horizontal, false)?)?;
    host.set("right", edge_fn(ctx, layout, Axis::Horizontal, true)?)?;
    host.set("top", edge_fn(ctx, layout, Axis::Vertical, false)?)?;
    host.set("bottom", edge_fn(ctx, layout, Axis::Vertical, true)?)?;

    let vars = Arc::new(env.variables.clone());
    host.set(
        "contextGet",
        Function::new(ctx.clone(), move |name: String| -> Option<String> {
            vars.get(&name).map(|v| v.to_json().to_string())
        })?,
    )?;

    host.set(
        "log",
        Function::new(ctx.clone(), |level: String, message: String| {
            match level.as_str() {
                "debug" => tracing::debug!(target: "framewright::script", "{message}"),
                "warn" => tracing::warn!(target: "framewright::script", "{message}"),
                "error" => tracing::error!(target: "framewright::script", "{message}"),
                _ => tracing::info!(target: "framewright::script", "{message}"),
            }
        })?,
    )?;

    ctx.globals().set(HOST_GLOBAL, host)
}
