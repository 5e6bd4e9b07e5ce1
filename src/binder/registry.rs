//! The static element table: tag aliases, child handling, capabilities and field descriptors.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::binder::BindContext;
use crate::elements::{self, ElementBody, ElementKind};
use crate::error::RenderResult;

/// How a node's content is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildMode {
    /// Children are not allowed.
    None,
    /// Child nodes are bound as child elements.
    ChildList,
    /// The node's text becomes the element's text value.
    TextValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Carries `x`/`y`/`width`/`height`/font fields and introduces a layout box.
    pub positional: bool,
    pub parent: bool,
    pub text: bool,
    pub renderable: bool,
    /// Children are left unbound by a shallow pass.
    pub deferred_children: bool,
}

impl Capabilities {
    const NONE: Self = Self {
        positional: false,
        parent: false,
        text: false,
        renderable: false,
        deferred_children: false,
    };
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// Canonical field name, used to address the slot.
    pub name: &'static str,
    /// Attribute names accepted for this field, matched case-insensitively.
    pub aliases: &'static [&'static str],
    pub bindable: bool,
    /// Contained semantic type, for diagnostics.
    pub ty: &'static str,
}

impl FieldDescriptor {
    pub const fn bindable(name: &'static str, aliases: &'static [&'static str], ty: &'static str) -> Self {
        Self {
            name,
            aliases,
            bindable: true,
            ty,
        }
    }

    pub const fn fixed(name: &'static str, aliases: &'static [&'static str], ty: &'static str) -> Self {
        Self {
            name,
            aliases,
            bindable: false,
            ty,
        }
    }

    pub fn matches(&self, attr: &str) -> bool {
        self.aliases.iter().any(|a| a.eq_ignore_ascii_case(attr))
    }
}

pub type Factory = fn(&BindContext<'_>) -> RenderResult<ElementBody>;

pub struct ElementDescriptor {
    pub kind: ElementKind,
    pub tags: &'static [&'static str],
    pub children: ChildMode,
    pub capabilities: Capabilities,
    pub fields: &'static [FieldDescriptor],
    pub factory: Factory,
}

impl std::fmt::Debug for ElementDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementDescriptor")
            .field("kind", &self.kind)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl ElementDescriptor {
    /// Own fields followed by the shared positional fields when the element is positional.
    pub fn all_fields(&self) -> impl Iterator<Item = &'static FieldDescriptor> + '_ {
        let positional: &'static [FieldDescriptor] = if self.capabilities.positional {
            elements::POSITIONAL_FIELDS
        } else {
            &[]
        };
        self.fields.iter().chain(positional.iter())
    }

    /// Every field accepting the attribute name `attr`.
    pub fn fields_for(&self, attr: &str) -> Vec<&'static FieldDescriptor> {
        self.all_fields().filter(|f| f.matches(attr)).collect()
    }
}

fn make<T: Default + Into<ElementBody>>(_ctx: &BindContext<'_>) -> RenderResult<ElementBody> {
    Ok(T::default().into())
}

const RENDERABLE: Capabilities = Capabilities {
    renderable: true,
    ..Capabilities::NONE
};

const POSITIONAL: Capabilities = Capabilities {
    positional: true,
    renderable: true,
    ..Capabilities::NONE
};

const PARENT: Capabilities = Capabilities {
    parent: true,
    renderable: true,
    ..Capabilities::NONE
};

pub static BUILTIN_ELEMENTS: &[ElementDescriptor] = &[
    ElementDescriptor {
        kind: ElementKind::Template,
        tags: &["template"],
        children: ChildMode::ChildList,
        capabilities: Capabilities {
            deferred_children: true,
            ..PARENT
        },
        fields: elements::template::FIELDS,
        factory: make::<elements::template::Template>,
    },
    ElementDescriptor {
        kind: ElementKind::If,
        tags: &["if"],
        children: ChildMode::ChildList,
        capabilities: PARENT,
        fields: elements::directives::IF_FIELDS,
        factory: make::<elements::directives::If>,
    },
    ElementDescriptor {
        kind: ElementKind::ForEach,
        tags: &["for-each", "foreach", "for"],
        children: ChildMode::ChildList,
        capabilities: PARENT,
        fields: elements::directives::FOR_EACH_FIELDS,
        factory: make::<elements::directives::ForEach>,
    },
    ElementDescriptor {
        kind: ElementKind::Range,
        tags: &["range"],
        children: ChildMode::ChildList,
        capabilities: PARENT,
        fields: elements::directives::RANGE_FIELDS,
        factory: make::<elements::directives::Range>,
    },
    ElementDescriptor {
        kind: ElementKind::Clear,
        tags: &["clear"],
        children: ChildMode::None,
        capabilities: RENDERABLE,
        fields: elements::shapes::CLEAR_FIELDS,
        factory: make::<elements::shapes::Clear>,
    },
    ElementDescriptor {
        kind: ElementKind::Rectangle,
        tags: &["rectangle", "rect", "box"],
        children: ChildMode::ChildList,
        capabilities: Capabilities {
            parent: true,
            ..POSITIONAL
        },
        fields: elements::shapes::RECTANGLE_FIELDS,
        factory: make::<elements::shapes::Rectangle>,
    },
    ElementDescriptor {
        kind: ElementKind::Text,
        tags: &["text"],
        children: ChildMode::TextValue,
        capabilities: Capabilities {
            text: true,
            ..POSITIONAL
        },
        fields: elements::text::FIELDS,
        factory: make::<elements::text::Text>,
    },
    ElementDescriptor {
        kind: ElementKind::Image,
        tags: &["image", "img"],
        children: ChildMode::None,
        capabilities: POSITIONAL,
        fields: elements::image::FIELDS,
        factory: make::<elements::image::Image>,
    },
    ElementDescriptor {
        kind: ElementKind::BezierAnimation,
        tags: &["animation-bezier"],
        children: ChildMode::ChildList,
        capabilities: Capabilities {
            parent: true,
            ..POSITIONAL
        },
        fields: elements::bezier::FIELDS,
        factory: make::<elements::bezier::BezierAnimation>,
    },
    ElementDescriptor {
        kind: ElementKind::Point,
        tags: &["point"],
        children: ChildMode::None,
        capabilities: Capabilities::NONE,
        fields: elements::bezier::POINT_FIELDS,
        factory: make::<elements::bezier::Point>,
    },
    ElementDescriptor {
        kind: ElementKind::Resources,
        tags: &["resources", "cache"],
        children: ChildMode::ChildList,
        capabilities: Capabilities {
            parent: true,
            ..Capabilities::NONE
        },
        fields: &[],
        factory: make::<elements::resources::Resources>,
    },
    ElementDescriptor {
        kind: ElementKind::FontFamily,
        tags: &["font-family", "font"],
        children: ChildMode::None,
        capabilities: Capabilities::NONE,
        fields: elements::resources::FONT_FIELDS,
        factory: make::<elements::resources::FontFamily>,
    },
    ElementDescriptor {
        kind: ElementKind::RemoteResource,
        tags: &["remote-resource"],
        children: ChildMode::None,
        capabilities: Capabilities::NONE,
        fields: elements::resources::REMOTE_FIELDS,
        factory: make::<elements::resources::RemoteResource>,
    },
    ElementDescriptor {
        kind: ElementKind::Script,
        tags: &["script"],
        children: ChildMode::TextValue,
        capabilities: Capabilities {
            text: true,
            ..Capabilities::NONE
        },
        fields: elements::script::FIELDS,
        factory: make::<elements::script::Script>,
    },
];

/// Tag lookup over a descriptor table.
#[derive(Debug)]
pub struct Registry {
    by_tag: HashMap<String, Vec<&'static ElementDescriptor>>,
}

impl Registry {
    pub fn new(descriptors: impl IntoIterator<Item = &'static ElementDescriptor>) -> Self {
        let mut by_tag: HashMap<String, Vec<&'static ElementDescriptor>> = HashMap::new();
        for d in descriptors {
            for tag in d.tags {
                by_tag.entry(tag.to_ascii_lowercase()).or_default().push(d);
            }
        }
        Self { by_tag }
    }

    /// The registry of built-in elements, built on first use.
    pub fn builtin() -> &'static Registry {
        static REGISTRY: OnceLock<Registry> = OnceLock::new();
        REGISTRY.get_or_init(|| Registry::new(BUILTIN_ELEMENTS))
    }

    pub fn lookup(&self, tag: &str) -> &[&'static ElementDescriptor] {
        self.by_tag
            .get(&tag.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn every_builtin_tag_is_unambiguous() {
        let r = Registry::builtin();
        for d in BUILTIN_ELEMENTS {
            for tag in d.tags {
                assert_eq!(r.lookup(tag).len(), 1, "tag {tag}");
                assert_eq!(r.lookup(&tag.to_uppercase()).len(), 1);
            }
        }
        assert!(r.lookup("marquee").is_empty());
    }

    #[test]
    fn descriptor_fields_address_real_slots() {
        let cfg = EngineConfig::default();
        let ctx = BindContext::new(&cfg);
        for d in BUILTIN_ELEMENTS {
            let mut body = (d.factory)(&ctx).unwrap();
            assert_eq!(body.kind(), d.kind);
            for f in d.all_fields() {
                let slot = body
                    .slot(f.name)
                    .unwrap_or_else(|| panic!("{:?} has no slot {}", d.kind, f.name));
                assert_eq!(slot.bindable(), f.bindable, "{:?}.{}", d.kind, f.name);
            }
        }
    }

    #[test]
    fn aliases_match_case_insensitively() {
        let d = Registry::builtin().lookup("script")[0];
        assert_eq!(d.fields_for("SRC").len(), 1);
        assert_eq!(d.fields_for("path")[0].name, "src");
        assert!(d.fields_for("nonsense").is_empty());
    }
}
