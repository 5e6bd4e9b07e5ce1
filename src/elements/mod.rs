//! Element variants and their field tables.

use crate::binder::field::{Field, FieldSlot};
use crate::binder::registry::FieldDescriptor;
use crate::error::RenderResult;
use crate::expression::Environment;
use crate::scope::{Axis, LayoutBox};
use crate::units::SizeUnit;

/// Generates `slot(name)` for an element struct, mapping canonical field names to fields.
/// `inherit base` falls back to `self.base.slot(name)`.
macro_rules! field_slots {
    (@fallback $self:ident, $name:ident) => {{
        let _ = $name;
        None
    }};
    (@fallback $self:ident, $name:ident, $base:ident) => {
        $self.$base.slot($name)
    };
    ($ty:ty $(, inherit $base:ident)? { $($name:literal => $($f:ident).+),* $(,)? }) => {
        impl $ty {
            pub(crate) fn slot(
                &mut self,
                name: &str,
            ) -> Option<&mut dyn $crate::binder::field::FieldSlot> {
                match name {
                    $($name => Some(&mut self.$($f).+),)*
                    _ => field_slots!(@fallback self, name $(, $base)?),
                }
            }
        }
    };
}

pub mod bezier;
pub mod directives;
pub mod image;
pub mod resources;
pub mod script;
pub mod shapes;
pub mod template;
pub mod text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Template,
    If,
    ForEach,
    Range,
    Clear,
    Rectangle,
    Text,
    Image,
    BezierAnimation,
    Point,
    Resources,
    FontFamily,
    RemoteResource,
    Script,
}

macro_rules! element_bodies {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        /// Typed storage of one element's fields.
        #[derive(Debug, Clone)]
        pub enum ElementBody {
            $($variant($ty),)+
        }

        impl ElementBody {
            pub fn kind(&self) -> ElementKind {
                match self {
                    $(Self::$variant(_) => ElementKind::$variant,)+
                }
            }

            pub(crate) fn slot(&mut self, name: &str) -> Option<&mut dyn FieldSlot> {
                match self {
                    $(Self::$variant(b) => b.slot(name),)+
                }
            }
        }

        $(
            impl From<$ty> for ElementBody {
                fn from(b: $ty) -> Self {
                    Self::$variant(b)
                }
            }
        )+
    };
}

element_bodies! {
    Template(template::Template),
    If(directives::If),
    ForEach(directives::ForEach),
    Range(directives::Range),
    Clear(shapes::Clear),
    Rectangle(shapes::Rectangle),
    Text(text::Text),
    Image(image::Image),
    BezierAnimation(bezier::BezierAnimation),
    Point(bezier::Point),
    Resources(resources::Resources),
    FontFamily(resources::FontFamily),
    RemoteResource(resources::RemoteResource),
    Script(script::Script),
}

pub(crate) const POSITIONAL_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::bindable("x", &["x", "left"], "size"),
    FieldDescriptor::bindable("y", &["y", "top"], "size"),
    FieldDescriptor::bindable("width", &["width", "w"], "size"),
    FieldDescriptor::bindable("height", &["height", "h"], "size"),
    FieldDescriptor::bindable("font-size", &["font-size", "fontSize"], "size"),
    FieldDescriptor::bindable("font-family", &["font-family", "fontFamily", "font"], "string"),
    FieldDescriptor::bindable("font-style", &["font-style", "fontStyle"], "font style"),
];

/// Synthesized font styles. Only one face per family is loaded, so italics are slanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

crate::binder::cast::keyword_enum!(FontStyle, "font style", {
    "normal" => FontStyle::Normal,
    "italic" => FontStyle::Italic,
    "oblique" => FontStyle::Italic,
});

/// The fields shared by every element that owns a layout box.
#[derive(Debug, Clone, Default)]
pub struct Positional {
    pub x: Field<SizeUnit>,
    pub y: Field<SizeUnit>,
    pub width: Field<SizeUnit>,
    pub height: Field<SizeUnit>,
    pub font_size: Field<SizeUnit>,
    pub font_family: Field<String>,
    pub font_style: Field<FontStyle>,
}

field_slots!(Positional {
    "x" => x,
    "y" => y,
    "width" => width,
    "height" => height,
    "font-size" => font_size,
    "font-family" => font_family,
    "font-style" => font_style,
});

/// A positional element's resolved box and font settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBox {
    pub layout: LayoutBox,
    pub font_family: Option<String>,
    pub font_style: Option<FontStyle>,
}

impl Positional {
    /// Resolve against the parent box. Font sizes are relative to the parent's font size.
    pub fn resolve(&self, parent: &LayoutBox, env: &dyn Environment) -> RenderResult<ResolvedBox> {
        let font_size = self
            .font_size
            .resolve(env)?
            .map(|u| parent.resolve(u, Axis::Font));
        let x = self
            .x
            .resolve(env)?
            .map_or(0.0, |u| parent.resolve(u, Axis::Horizontal));
        let y = self
            .y
            .resolve(env)?
            .map_or(0.0, |u| parent.resolve(u, Axis::Vertical));
        let width = self
            .width
            .resolve(env)?
            .map(|u| parent.resolve(u, Axis::Horizontal));
        let height = self
            .height
            .resolve(env)?
            .map(|u| parent.resolve(u, Axis::Vertical));

        Ok(ResolvedBox {
            layout: parent.child(x, y, width, height, font_size),
            font_family: self.font_family.resolve(env)?,
            font_style: self.font_style.resolve(env)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::document::NodeAttribute;
    use crate::value::{Value, Variables};

    fn set(p: &mut Positional, name: &str, attr: NodeAttribute) {
        p.slot(name).unwrap().assign(&Arc::new(attr)).unwrap();
    }

    #[test]
    fn resolves_box_relative_to_parent() {
        let mut p = Positional::default();
        set(&mut p, "x", NodeAttribute::literal("x", "10%"));
        set(&mut p, "y", NodeAttribute::bind("y", "offset"));
        set(&mut p, "font-size", NodeAttribute::literal("font-size", "2em"));
        let parent = LayoutBox::root(200.0, 100.0, 10.0);
        let mut env = Variables::new();
        env.insert("offset".to_owned(), Value::Number(5.0));

        let r = p.resolve(&parent, &env).unwrap();
        assert_eq!(r.layout.rect.x0, 20.0);
        assert_eq!(r.layout.rect.y0, 5.0);
        assert_eq!(r.layout.width(), 180.0);
        assert_eq!(r.layout.font_size, 20.0);
        assert_eq!(r.font_family, None);
    }

    #[test]
    fn unknown_slot_names_fall_through() {
        let mut p = Positional::default();
        assert!(p.slot("colour").is_none());
    }
}
