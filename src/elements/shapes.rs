use crate::binder::BoundElement;
use crate::binder::field::Field;
use crate::binder::registry::FieldDescriptor;
use crate::color::Color;
use crate::elements::Positional;
use crate::error::RenderResult;
use crate::frame::RenderFrame;
use crate::scope::Axis;
use crate::units::SizeUnit;

pub(crate) const CLEAR_FIELDS: &[FieldDescriptor] = &[FieldDescriptor::bindable(
    "color",
    &["color", "colour", "background"],
    "color",
)];

pub(crate) const RECTANGLE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::bindable("radius", &["radius", "border-radius"], "size"),
    FieldDescriptor::bindable("color", &["color", "colour", "background"], "color"),
    FieldDescriptor::bindable("border-color", &["border-color", "borderColor"], "color"),
    FieldDescriptor::bindable("border-width", &["border-width", "borderWidth"], "size"),
];

/// Fills the whole canvas, discarding whatever was drawn before.
#[derive(Debug, Clone, Default)]
pub struct Clear {
    pub color: Field<Color>,
}

field_slots!(Clear { "color" => color });

impl Clear {
    pub(crate) fn render(&self, _el: &BoundElement, frame: &mut RenderFrame<'_>) -> RenderResult<()> {
        let color = self.color.resolve_or(frame.env(), Color::TRANSPARENT)?;
        frame.surface().clear(color);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Rectangle {
    pub positional: Positional,
    pub radius: Field<SizeUnit>,
    pub color: Field<Color>,
    pub border_color: Field<Color>,
    pub border_width: Field<SizeUnit>,
}

field_slots!(Rectangle, inherit positional {
    "radius" => radius,
    "color" => color,
    "border-color" => border_color,
    "border-width" => border_width,
});

impl Rectangle {
    pub(crate) fn render(&self, el: &BoundElement, frame: &mut RenderFrame<'_>) -> RenderResult<()> {
        frame.positioned(el, &self.positional, |frame, layout| {
            let env = frame.env();
            let radius = self
                .radius
                .resolve(env)?
                .map_or(0.0, |u| layout.resolve(u, Axis::Min));
            let fill = self.color.resolve(env)?;
            let border = self.border_color.resolve(env)?;
            let border_width = self
                .border_width
                .resolve(env)?
                .map_or(1.0, |u| layout.resolve(u, Axis::Min));

            if let Some(color) = fill {
                frame.surface().fill_rect(layout.rect, radius, color);
            }
            if let Some(color) = border {
                frame
                    .surface()
                    .stroke_rect(layout.rect, radius, border_width, color);
            }
            frame.render_children(el)
        })
    }
}
