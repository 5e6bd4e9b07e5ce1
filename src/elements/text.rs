use crate::binder::BoundElement;
use crate::binder::field::Field;
use crate::binder::registry::FieldDescriptor;
use crate::color::Color;
use crate::elements::Positional;
use crate::error::RenderResult;
use crate::frame::RenderFrame;
use crate::surface::{HAlign, TextRun, VAlign};

pub(crate) const FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::bindable("value", &["value", "text"], "string"),
    FieldDescriptor::bindable("color", &["color", "colour"], "color"),
    FieldDescriptor::bindable(
        "align-vertical",
        &["align-vertical", "alignVertical", "valign"],
        "vertical alignment",
    ),
    FieldDescriptor::bindable(
        "align-horizontal",
        &["align-horizontal", "alignHorizontal", "align"],
        "horizontal alignment",
    ),
];

/// A block of text wrapped to its box. `value` wins over the element's text content.
#[derive(Debug, Clone, Default)]
pub struct Text {
    pub positional: Positional,
    pub value: Field<String>,
    pub color: Field<Color>,
    pub align_vertical: Field<VAlign>,
    pub align_horizontal: Field<HAlign>,
}

field_slots!(Text, inherit positional {
    "value" => value,
    "color" => color,
    "align-vertical" => align_vertical,
    "align-horizontal" => align_horizontal,
});

impl Text {
    pub(crate) fn render(&self, el: &BoundElement, frame: &mut RenderFrame<'_>) -> RenderResult<()> {
        frame.positioned(el, &self.positional, |frame, layout| {
            let env = frame.env();
            let value = match self.value.resolve(env)? {
                Some(v) => v,
                None => el.text.clone().unwrap_or_default(),
            };
            if value.is_empty() {
                return Ok(());
            }
            let color = self.color.resolve_or(env, Color::BLACK)?;
            let v_align = self.align_vertical.resolve_or(env, VAlign::Top)?;
            let h_align = self.align_horizontal.resolve_or(env, HAlign::Left)?;

            let font = frame.font()?;
            let style = frame.scope().font_style();
            let run = TextRun {
                text: &value,
                font: &font,
                size: layout.font_size,
                color,
                style,
                bounds: layout.rect,
                h_align,
                v_align,
            };
            frame.surface().draw_text(&run)
        })
    }
}
