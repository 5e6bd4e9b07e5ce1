use framewright::frame::RenderFrame;
use framewright::surface::{DrawOp, RecordingSurface};
use framewright::{CancelToken, Color, Engine, EngineConfig, RenderSession, Value, Variables};

fn session(markup: &str) -> RenderSession {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let doc = engine
        .load_str(markup, std::env::temp_dir(), "test.bi")
        .unwrap();
    engine.generate(&doc).unwrap()
}

fn record(session: &RenderSession, ordinal: u32, vars: Variables) -> Vec<DrawOp> {
    let m = session.metrics();
    let mut surface = RecordingSurface::new(m.width, m.height);
    let cancel = CancelToken::new();
    RenderFrame::new(session, ordinal, &mut surface, vars, &cancel)
        .run()
        .unwrap();
    surface.take_ops()
}

fn fill_xs(ops: &[DrawOp]) -> Vec<f64> {
    ops.iter()
        .filter_map(|op| match op {
            DrawOp::FillRect { rect, .. } => Some(rect.x0),
            _ => None,
        })
        .collect()
}

#[test]
fn range_repeats_children_with_the_loop_variable() {
    let s = session(
        r##"<template width="100" height="20">
  <range start="0" end="5" step="2" let="i">
    <rect :x="i * 10" width="5" height="5" color="#ff0000"/>
  </range>
</template>"##,
    );
    assert_eq!(fill_xs(&record(&s, 1, Variables::new())), vec![0.0, 20.0, 40.0]);
}

#[test]
fn for_each_iterates_render_variables() {
    let s = session(
        r##"<template width="100" height="20">
  <for-each :each="items" let="item">
    <rect :x="item.x" width="5" height="5" :color="item.color"/>
  </for-each>
</template>"##,
    );
    let mut vars = Variables::new();
    vars.insert(
        "items".to_owned(),
        Value::from_json(serde_json::json!([
            { "x": 3, "color": "#00ff00" },
            { "x": 9, "color": "#0000ff" },
        ])),
    );
    let ops = record(&s, 1, vars);
    assert_eq!(fill_xs(&ops), vec![3.0, 9.0]);
    let colors: Vec<Color> = ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::FillRect { color, .. } => Some(*color),
            _ => None,
        })
        .collect();
    assert_eq!(colors, vec![Color::rgba(0, 255, 0, 255), Color::rgba(0, 0, 255, 255)]);
}

#[test]
fn for_each_over_nothing_draws_nothing() {
    let s = session(
        r##"<template width="10" height="10">
  <for-each :each="[]" let="item"><rect width="5" height="5" color="red"/></for-each>
</template>"##,
    );
    assert!(record(&s, 1, Variables::new()).is_empty());
}

#[test]
fn if_gates_on_truthiness() {
    let s = session(
        r##"<template width="10" height="10">
  <if :condition="show"><clear color="black"/></if>
</template>"##,
    );
    let mut vars = Variables::new();
    vars.insert("show".to_owned(), Value::Bool(false));
    assert!(record(&s, 1, vars.clone()).is_empty());
    vars.insert("show".to_owned(), Value::Bool(true));
    assert_eq!(record(&s, 1, vars), vec![DrawOp::Clear(Color::BLACK)]);
}

#[test]
fn undefined_binds_fall_back_to_defaults() {
    let s = session(
        r##"<template width="50" height="10">
  <rect :x="missing" width="5" height="5" color="red"/>
</template>"##,
    );
    assert_eq!(fill_xs(&record(&s, 1, Variables::new())), vec![0.0]);
}

#[test]
fn spreads_apply_object_entries_per_frame() {
    let s = session(
        r##"<template width="50" height="10">
  <rect {style} width="5" height="5" color="red"/>
</template>"##,
    );
    let mut vars = Variables::new();
    vars.insert(
        "style".to_owned(),
        Value::from_json(serde_json::json!({ "x": 12, "unknown": 1 })),
    );
    assert_eq!(fill_xs(&record(&s, 1, vars)), vec![12.0]);
}

#[test]
fn nested_boxes_are_relative_to_their_parent() {
    let s = session(
        r##"<template width="200" height="100">
  <rect x="50%" y="10" width="50%" height="50%">
    <rect x="10%" width="10" height="10" color="white"/>
  </rect>
</template>"##,
    );
    let ops = record(&s, 1, Variables::new());
    let DrawOp::FillRect { rect, .. } = &ops[0] else {
        panic!("expected a fill, got {ops:?}");
    };
    assert_eq!((rect.x0, rect.y0), (110.0, 10.0));
    assert_eq!((rect.width(), rect.height()), (10.0, 10.0));
}

#[test]
fn frame_constants_are_visible_to_binds() {
    let s = session(
        r##"<template width="100" height="10" animate animate-duration="1s" animate-fps="10">
  <rect :x="frame * 2" :width="frameTotal" height="5" color="red"/>
</template>"##,
    );
    let ops = record(&s, 4, Variables::new());
    let DrawOp::FillRect { rect, .. } = &ops[0] else {
        panic!("expected a fill, got {ops:?}");
    };
    assert_eq!(rect.x0, 8.0);
    assert_eq!(rect.width(), 10.0);
}

#[test]
fn setup_script_results_are_visible_to_binds() {
    let s = session(
        r##"<script setup>
import { drawing } from 'system';
import { offset } from 'layout';
export default function (args) {
  return { left: offset(args.base) + drawing.unit('10%') };
}
</script>
<script module="layout">export function offset(v) { return v * 2; }</script>
<template width="100" height="10">
  <rect :x="left" width="5" height="5" color="red"/>
</template>"##,
    );
    let mut vars = Variables::new();
    vars.insert("base".to_owned(), Value::Number(3.0));
    assert_eq!(fill_xs(&record(&s, 1, vars)), vec![16.0]);
}

#[test]
fn failing_elements_report_their_chain() {
    let s = session(
        r##"<template width="10" height="10">
  <rect><range :end="bad.value" let="i"/></rect>
</template>"##,
    );
    let mut surface = RecordingSurface::new(10, 10);
    let cancel = CancelToken::new();
    let mut vars = Variables::new();
    vars.insert("bad".to_owned(), Value::from("not a number"));
    let err = RenderFrame::new(&s, 1, &mut surface, vars, &cancel)
        .run()
        .unwrap_err();
    let tags: Vec<&str> = err.elements().iter().map(|e| e.tag.as_str()).collect();
    assert_eq!(tags, ["range", "rect", "template"]);
    assert_eq!(err.document().unwrap().file_name, "test.bi");
}

#[test]
fn cancelled_frames_stop_early() {
    let s = session(
        r##"<template width="10" height="10"><clear color="black"/></template>"##,
    );
    let mut surface = RecordingSurface::new(10, 10);
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = RenderFrame::new(&s, 1, &mut surface, Variables::new(), &cancel)
        .run()
        .unwrap_err();
    assert_eq!(err.kind(), framewright::ErrorKind::Cancelled);
    assert!(surface.ops().is_empty());
}

#[test]
fn ranges_starting_past_their_end_render_nothing() {
    for attrs in [r#"start="5" end="0""#, r#"start="5" end="0" step="-2.5""#] {
        let s = session(&format!(
            r##"<template width="10" height="10">
  <range {attrs} let="i"><rect width="5" height="5" color="red"/></range>
</template>"##
        ));
        assert!(record(&s, 1, Variables::new()).is_empty(), "{attrs}");
    }
}

#[test]
fn computed_range_ends_below_start_render_nothing() {
    let s = session(
        r##"<template width="10" height="10">
  <range start="1" :end="items.length" let="i"><rect width="5" height="5" color="red"/></range>
  <rect x="2" width="5" height="5" color="red"/>
</template>"##,
    );
    let mut vars = Variables::new();
    vars.insert("items".to_owned(), Value::from_json(serde_json::json!([])));
    assert_eq!(fill_xs(&record(&s, 1, vars)), vec![2.0]);
}

#[test]
fn for_each_over_undefined_draws_nothing() {
    let s = session(
        r##"<template width="10" height="10">
  <for-each :each="missing" let="item"><rect width="5" height="5" color="red"/></for-each>
  <rect x="3" width="5" height="5" color="red"/>
</template>"##,
    );
    assert_eq!(fill_xs(&record(&s, 1, Variables::new())), vec![3.0]);
}

#[test]
fn loop_variables_do_not_leak_to_siblings() {
    let s = session(
        r##"<template width="50" height="10">
  <for-each :each="items" let="item"><rect :x="item" width="2" height="2" color="red"/></for-each>
  <for-each :each="[]" let="item"><rect :x="item" width="2" height="2" color="red"/></for-each>
  <range start="0" end="1" let="i"><rect :x="20 + i" width="2" height="2" color="red"/></range>
  <rect :x="item" width="2" height="2" color="red"/>
  <rect :x="i" y="5" width="2" height="2" color="red"/>
</template>"##,
    );
    let mut vars = Variables::new();
    vars.insert("items".to_owned(), Value::from_json(serde_json::json!([5, 9])));
    assert_eq!(fill_xs(&record(&s, 1, vars)), vec![5.0, 9.0, 20.0, 0.0, 0.0]);
}
