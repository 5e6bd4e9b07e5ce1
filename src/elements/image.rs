use crate::binder::BoundElement;
use crate::binder::field::Field;
use crate::binder::registry::FieldDescriptor;
use crate::elements::Positional;
use crate::error::RenderResult;
use crate::frame::RenderFrame;
use crate::surface::ImageFit;

pub(crate) const FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::bindable("src", &["src", "source"], "string"),
    FieldDescriptor::bindable("position", &["position", "fit"], "image position"),
];

/// Draws an image file, or a `remote-resource` by key, into its box.
#[derive(Debug, Clone, Default)]
pub struct Image {
    pub positional: Positional,
    pub src: Field<String>,
    pub position: Field<ImageFit>,
}

field_slots!(Image, inherit positional {
    "src" => src,
    "position" => position,
});

impl Image {
    pub(crate) fn render(&self, el: &BoundElement, frame: &mut RenderFrame<'_>) -> RenderResult<()> {
        frame.positioned(el, &self.positional, |frame, layout| {
            let env = frame.env();
            let src = self.src.require(env, "src")?;
            let fit = self.position.resolve_or(env, ImageFit::Stretch)?;
            let image = frame.image(&src)?;
            frame.surface().draw_image(&image, layout.rect, fit)
        })
    }
}
