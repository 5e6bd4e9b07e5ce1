use super::*;
use crate::document::SourcePos;
use crate::elements::ElementKind;
use crate::error::ErrorKind;
use registry::BUILTIN_ELEMENTS;

fn node(tag: &str) -> Node {
    Node::new(tag, SourcePos::new(0, 1, 1))
}

fn bind_one(config: &EngineConfig, n: Node, mode: BindMode) -> RenderResult<Option<BoundElement>> {
    Binder::new(BindContext::new(config)).bind(&Arc::new(n), mode)
}

#[test]
fn unknown_tag_raises_by_default() {
    let cfg = EngineConfig::default();
    let err = bind_one(&cfg, node("marquee"), BindMode::Deep).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Binding);
    assert_eq!(err.elements().len(), 1);
    assert_eq!(err.elements()[0].tag, "marquee");
}

#[test]
fn unknown_tag_is_dropped_whole_when_lenient() {
    let cfg = EngineConfig {
        policy: ErrorPolicy::lenient(),
        ..EngineConfig::default()
    };
    let parent = node("rect").with_child(node("marquee").with_child(node("text")));
    let bound = bind_one(&cfg, parent, BindMode::Deep).unwrap().unwrap();
    assert!(bound.children.is_empty());
}

#[test]
fn tags_match_case_insensitively_through_aliases() {
    let cfg = EngineConfig::default();
    let bound = bind_one(&cfg, node("ForEach"), BindMode::Deep).unwrap().unwrap();
    assert_eq!(bound.kind(), ElementKind::ForEach);
    let bound = bind_one(&cfg, node("IMG"), BindMode::Deep).unwrap().unwrap();
    assert_eq!(bound.kind(), ElementKind::Image);
}

#[test]
fn ambiguous_tags_follow_policy() {
    static_registry_test(EngineConfig::default(), true);
    static_registry_test(
        EngineConfig {
            policy: ErrorPolicy::lenient(),
            ..EngineConfig::default()
        },
        false,
    );
}

fn static_registry_test(cfg: EngineConfig, raises: bool) {
    let clear = BUILTIN_ELEMENTS
        .iter()
        .filter(|d| d.kind == ElementKind::Clear);
    let registry = Registry::new(BUILTIN_ELEMENTS.iter().chain(clear));
    let binder = Binder::new(BindContext::new(&cfg).with_registry(&registry));
    let out = binder.bind(&Arc::new(node("clear")), BindMode::Deep);
    if raises {
        let err = out.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Binding);
        assert!(err.message().contains("matches 2 elements"));
    } else {
        assert!(out.unwrap().is_none());
    }
}

#[test]
fn binding_a_fixed_field_is_an_attribute_error() {
    let cfg = EngineConfig::default();
    let n = node("template").with_attribute(NodeAttribute::bind("width", "400"));
    let err = bind_one(&cfg, n, BindMode::Shallow).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Attribute);
    assert!(err.message().contains("cannot be bound"));

    let lenient = EngineConfig {
        policy: ErrorPolicy::lenient(),
        ..EngineConfig::default()
    };
    let n = node("template").with_attribute(NodeAttribute::bind("width", "400"));
    let bound = bind_one(&lenient, n, BindMode::Shallow).unwrap().unwrap();
    let ElementBody::Template(t) = &bound.body else {
        panic!("expected a template body");
    };
    assert!(!t.width.is_set());
}

#[test]
fn literals_cast_at_bind_time() {
    let cfg = EngineConfig::default();
    let n = node("template").with_attribute(NodeAttribute::literal("width", "wide"));
    let err = bind_one(&cfg, n, BindMode::Shallow).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Attribute);

    let n = node("template")
        .with_attribute(NodeAttribute::literal("width", "320"))
        .with_attribute(NodeAttribute::flag("animate"));
    let bound = bind_one(&cfg, n, BindMode::Shallow).unwrap().unwrap();
    let ElementBody::Template(t) = &bound.body else {
        panic!("expected a template body");
    };
    assert_eq!(t.width.get(), Some(&crate::units::SizeUnit::Px(320.0)));
    assert_eq!(t.animate.get(), Some(&true));
}

#[test]
fn shallow_binding_defers_template_children() {
    let cfg = EngineConfig::default();
    let tree = || node("template").with_child(node("rect").with_child(node("text")));

    let shallow = bind_one(&cfg, tree(), BindMode::Shallow).unwrap().unwrap();
    assert!(shallow.children.is_empty());

    let deep = bind_one(&cfg, tree(), BindMode::Deep).unwrap().unwrap();
    let tags: Vec<&str> = deep.walk().iter().map(|el| el.tag()).collect();
    assert_eq!(tags, ["template", "rect", "text"]);
}

#[test]
fn shallow_binding_still_descends_into_non_deferred_parents() {
    let cfg = EngineConfig::default();
    let group = node("resources").with_child(
        node("font-family")
            .with_attribute(NodeAttribute::literal("name", "Body"))
            .with_attribute(NodeAttribute::literal("src", "body.ttf")),
    );
    let bound = bind_one(&cfg, group, BindMode::Shallow).unwrap().unwrap();
    assert_eq!(bound.children.len(), 1);
    assert_eq!(bound.children[0].kind(), ElementKind::FontFamily);
}

#[test]
fn unmatched_and_spread_attributes_are_kept_aside() {
    let cfg = EngineConfig::default();
    let n = node("rect")
        .with_attribute(NodeAttribute::literal("data-id", "7"))
        .with_attribute(NodeAttribute::spread("style"))
        .with_attribute(NodeAttribute::literal("color", "red"));
    let bound = bind_one(&cfg, n, BindMode::Deep).unwrap().unwrap();
    assert_eq!(bound.unmatched.len(), 1);
    assert_eq!(bound.unmatched[0].name, "data-id");
    assert_eq!(bound.spreads.len(), 1);
    assert_eq!(bound.spreads[0].value, "style");
}

#[test]
fn children_of_leaf_elements_follow_policy() {
    let cfg = EngineConfig::default();
    let n = node("clear").with_child(node("text"));
    let err = bind_one(&cfg, n, BindMode::Deep).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Binding);
    assert!(err.message().contains("does not accept child elements"));

    let lenient = EngineConfig {
        policy: ErrorPolicy::lenient(),
        ..EngineConfig::default()
    };
    let n = node("clear").with_child(node("text"));
    let bound = bind_one(&lenient, n, BindMode::Deep).unwrap().unwrap();
    assert!(bound.children.is_empty());
}

#[test]
fn text_content_becomes_the_text_value() {
    let cfg = EngineConfig::default();
    let bound = bind_one(&cfg, node("text").with_text("hello"), BindMode::Deep)
        .unwrap()
        .unwrap();
    assert_eq!(bound.text.as_deref(), Some("hello"));
}

#[test]
fn nested_failures_carry_the_element_chain() {
    let cfg = EngineConfig::default();
    let n = node("template").with_child(node("rect").with_child(node("marquee")));
    let err = bind_one(&cfg, n, BindMode::Deep).unwrap_err();
    let tags: Vec<&str> = err.elements().iter().map(|e| e.tag.as_str()).collect();
    assert_eq!(tags, ["marquee", "rect", "template"]);
}
