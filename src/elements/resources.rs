//! Resource declarations. These are consumed while the session is generated and draw nothing.

use crate::binder::field::Fixed;
use crate::binder::registry::FieldDescriptor;
use crate::units::SizeUnit;

pub(crate) const FONT_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::fixed("name", &["name", "family"], "string"),
    FieldDescriptor::fixed("src", &["src", "source", "path"], "string"),
];

pub(crate) const REMOTE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::fixed("key", &["key", "name"], "string"),
    FieldDescriptor::fixed("src", &["src", "source", "url"], "string"),
    FieldDescriptor::fixed("width", &["width"], "size"),
    FieldDescriptor::fixed("height", &["height"], "size"),
];

/// Groups `font-family` and `remote-resource` declarations.
#[derive(Debug, Clone, Default)]
pub struct Resources;

impl Resources {
    pub(crate) fn slot(&mut self, _name: &str) -> Option<&mut dyn crate::binder::FieldSlot> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct FontFamily {
    pub name: Fixed<String>,
    pub src: Fixed<String>,
}

field_slots!(FontFamily {
    "name" => name,
    "src" => src,
});

/// An image fetched once per session and addressable by `key` from `image src`.
#[derive(Debug, Clone, Default)]
pub struct RemoteResource {
    pub key: Fixed<String>,
    pub src: Fixed<String>,
    pub width: Fixed<SizeUnit>,
    pub height: Fixed<SizeUnit>,
}

field_slots!(RemoteResource {
    "key" => key,
    "src" => src,
    "width" => width,
    "height" => height,
});
