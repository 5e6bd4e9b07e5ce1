use crate::binder::BoundElement;
use crate::binder::field::Fixed;
use crate::binder::registry::FieldDescriptor;
use crate::error::RenderResult;
use crate::frame::RenderFrame;
use crate::units::{SizeUnit, TimeUnit};

pub(crate) const FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::fixed("width", &["width"], "size"),
    FieldDescriptor::fixed("height", &["height"], "size"),
    FieldDescriptor::fixed("font-size", &["font-size", "fontSize"], "size"),
    FieldDescriptor::fixed("font-family", &["font-family", "fontFamily"], "string"),
    FieldDescriptor::fixed("animate", &["animate", "animated"], "boolean"),
    FieldDescriptor::fixed("duration", &["animate-duration", "duration"], "duration"),
    FieldDescriptor::fixed("fps", &["animate-fps", "fps"], "number"),
    FieldDescriptor::fixed("repeat", &["animate-repeat", "repeat"], "number"),
];

/// The document root. Its attributes are read once when the session is generated.
#[derive(Debug, Clone, Default)]
pub struct Template {
    pub width: Fixed<SizeUnit>,
    pub height: Fixed<SizeUnit>,
    pub font_size: Fixed<SizeUnit>,
    pub font_family: Fixed<String>,
    pub animate: Fixed<bool>,
    pub duration: Fixed<TimeUnit>,
    pub fps: Fixed<f64>,
    pub repeat: Fixed<f64>,
}

field_slots!(Template {
    "width" => width,
    "height" => height,
    "font-size" => font_size,
    "font-family" => font_family,
    "animate" => animate,
    "duration" => duration,
    "fps" => fps,
    "repeat" => repeat,
});

impl Template {
    pub(crate) fn render(&self, el: &BoundElement, frame: &mut RenderFrame<'_>) -> RenderResult<()> {
        frame.render_children(el)
    }
}
