//! `animation-bezier`: moves its content along a Bézier curve over the animation.

use kurbo::{Point as KPoint, Rect};

use crate::binder::BoundElement;
use crate::binder::field::Field;
use crate::binder::registry::FieldDescriptor;
use crate::color::Color;
use crate::elements::{ElementBody, Positional};
use crate::error::RenderResult;
use crate::frame::RenderFrame;
use crate::scope::{Axis, LayoutBox, ScopeFrame};
use crate::units::SizeUnit;

pub(crate) const POINT_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::bindable("x", &["x"], "size"),
    FieldDescriptor::bindable("y", &["y"], "size"),
];

pub(crate) const FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::bindable("path-color", &["path-color", "pathColor"], "color"),
    FieldDescriptor::bindable("path-width", &["path-width", "pathWidth"], "size"),
];

/// Segments used when tracing the curve.
const PATH_SAMPLES: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct BezierAnimation {
    pub positional: Positional,
    /// When set, the whole curve is stroked before the children are drawn.
    pub path_color: Field<Color>,
    pub path_width: Field<SizeUnit>,
}

field_slots!(BezierAnimation, inherit positional {
    "path-color" => path_color,
    "path-width" => path_width,
});

/// A control point, relative to the enclosing `animation-bezier` box.
#[derive(Debug, Clone, Default)]
pub struct Point {
    pub x: Field<SizeUnit>,
    pub y: Field<SizeUnit>,
}

field_slots!(Point {
    "x" => x,
    "y" => y,
});

impl BezierAnimation {
    pub(crate) fn render(&self, el: &BoundElement, frame: &mut RenderFrame<'_>) -> RenderResult<()> {
        let t = frame.progress();
        frame.positioned(el, &self.positional, |frame, layout| {
            let mut points = Vec::new();
            for child in el.children.iter() {
                if let ElementBody::Point(p) = &child.body {
                    let env = frame.env();
                    let x = p.x.resolve(env)?.map_or(0.0, |u| layout.resolve(u, Axis::Horizontal));
                    let y = p.y.resolve(env)?.map_or(0.0, |u| layout.resolve(u, Axis::Vertical));
                    points.push(KPoint::new(layout.rect.x0 + x, layout.rect.y0 + y));
                }
            }

            let env = frame.env();
            if let Some(color) = self.path_color.resolve(env)? {
                let width = self
                    .path_width
                    .resolve(env)?
                    .map_or(1.0, |u| layout.resolve(u, Axis::Min));
                let trace = sample_curve(&points, PATH_SAMPLES);
                frame.surface().stroke_polyline(&trace, width, color);
            }

            let inner = match de_casteljau(&points, t) {
                Some(at) => offset_box(layout, at),
                None => *layout,
            };
            let scope = ScopeFrame::new(Some(el.tag()), inner);
            frame.with_scope(scope, |frame| {
                for child in el.children.iter() {
                    if !matches!(child.body, ElementBody::Point(_)) {
                        frame.render(child)?;
                    }
                }
                Ok(())
            })
        })
    }
}

/// The box moved so its origin sits at `at`, keeping its size.
fn offset_box(layout: &LayoutBox, at: KPoint) -> LayoutBox {
    LayoutBox {
        rect: Rect::from_origin_size(at, layout.rect.size()),
        ..*layout
    }
}

/// Evaluate the Bézier curve with the given control points at `t` in `[0, 1]`.
fn sample_curve(points: &[KPoint], segments: usize) -> Vec<KPoint> {
    if points.len() < 2 {
        return Vec::new();
    }
    (0..=segments)
        .filter_map(|i| de_casteljau(points, i as f64 / segments as f64))
        .collect()
}

pub(crate) fn de_casteljau(points: &[KPoint], t: f64) -> Option<KPoint> {
    let t = t.clamp(0.0, 1.0);
    let mut work = points.to_vec();
    if work.is_empty() {
        return None;
    }
    while work.len() > 1 {
        for i in 0..work.len() - 1 {
            work[i] = work[i].lerp(work[i + 1], t);
        }
        work.pop();
    }
    work.first().copied()
}
