use super::*;
use crate::error::ErrorKind;
use crate::scope::LayoutBox;

fn env() -> HostEnv {
    let mut variables = Variables::new();
    variables.insert("who".to_owned(), Value::from("world"));
    HostEnv {
        layout: LayoutBox::root(200.0, 100.0, 10.0),
        variables,
    }
}

fn run(setup: &str, modules: Vec<ScriptModule>, args: Variables) -> RenderResult<Variables> {
    ScriptRunner::new(setup, modules, ScriptLimits::default())?.execute(&args, &env())
}

fn limits(timeout_ms: u64) -> ScriptLimits {
    ScriptLimits {
        timeout_ms,
        ..ScriptLimits::default()
    }
}

#[test]
fn setup_result_becomes_variables() {
    let mut args = Variables::new();
    args.insert("name".to_owned(), Value::from("Ada"));
    let out = run(
        "export default function (args) { return { greeting: 'hi ' + args.name, n: 2 }; }",
        Vec::new(),
        args,
    )
    .unwrap();
    assert_eq!(out.get("greeting"), Some(&Value::from("hi Ada")));
    assert_eq!(out.get("n"), Some(&Value::Number(2.0)));
}

#[test]
fn named_modules_are_importable() {
    let helpers = ScriptModule::new("helpers", "export function double(x) { return x * 2; }");
    let out = run(
        "import { double } from 'helpers';\nexport default function () { return { v: double(21) }; }",
        vec![helpers],
        Variables::new(),
    )
    .unwrap();
    assert_eq!(out.get("v"), Some(&Value::Number(42.0)));
}

#[test]
fn host_objects_see_the_frame() {
    let out = run(
        r#"
import { drawing, context, logger } from 'system';
export default function () {
  logger.info('measuring', 1);
  return {
    half: drawing.unit('50%'),
    tall: drawing.unit('50%', 'height'),
    right: drawing.right('20px'),
    who: context.get('who'),
    missing: context.get('nope'),
  };
}
"#,
        Vec::new(),
        Variables::new(),
    )
    .unwrap();
    assert_eq!(out.get("half"), Some(&Value::Number(100.0)));
    assert_eq!(out.get("tall"), Some(&Value::Number(50.0)));
    assert_eq!(out.get("right"), Some(&Value::Number(180.0)));
    assert_eq!(out.get("who"), Some(&Value::from("world")));
    assert_eq!(out.get("missing"), Some(&Value::Null));
}

#[test]
fn async_setup_is_awaited() {
    let out = run(
        "export default async function () { return { ready: true }; }",
        Vec::new(),
        Variables::new(),
    )
    .unwrap();
    assert_eq!(out.get("ready"), Some(&Value::Bool(true)));
}

#[test]
fn empty_results_publish_nothing() {
    let out = run("export default function () {}", Vec::new(), Variables::new()).unwrap();
    assert!(out.is_empty());
    let out = run("export default () => null", Vec::new(), Variables::new()).unwrap();
    assert!(out.is_empty());
}

#[test]
fn non_object_results_are_rejected() {
    let err = run("export default () => 42", Vec::new(), Variables::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Script);
    assert!(err.message().contains("must return an object"));
}

#[test]
fn thrown_errors_surface_as_script_errors() {
    let err = run(
        "export default function () { throw new Error('boom'); }",
        Vec::new(),
        Variables::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Script);
    assert!(err.message().contains("boom"));
}

#[test]
fn syntax_errors_fail_at_construction() {
    let err = ScriptRunner::new("export default function ( {", Vec::new(), ScriptLimits::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Script);
    assert!(err.message().contains("setup"));

    let bad = ScriptModule::new("helpers", "export const = 1;");
    let err = ScriptRunner::new("export default () => ({})", vec![bad], ScriptLimits::default())
        .unwrap_err();
    assert!(err.message().contains("helpers"));
}

#[test]
fn reserved_and_duplicate_module_names_are_rejected() {
    for name in ["setup", "system"] {
        let m = ScriptModule::new(name, "export const x = 1;");
        let err =
            ScriptRunner::new("export default () => ({})", vec![m], ScriptLimits::default())
                .unwrap_err();
        assert!(err.message().contains("reserved"), "{name}: {err}");
    }

    let a = ScriptModule::new("util", "export const x = 1;");
    let b = ScriptModule::new("util", "export const y = 2;");
    let err = ScriptRunner::new("export default () => ({})", vec![a, b], ScriptLimits::default())
        .unwrap_err();
    assert!(err.message().contains("more than once"));
}

#[test]
fn runaway_loops_hit_the_timeout() {
    let runner = ScriptRunner::new(
        "export default function () { for (;;) {} }",
        Vec::new(),
        limits(100),
    )
    .unwrap();
    let err = runner.execute(&Variables::new(), &env()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Script);
    assert!(err.message().contains("timeout"), "{err}");
}

#[test]
fn unbounded_recursion_hits_the_recursion_limit() {
    let runner = ScriptRunner::new(
        "function down(n) { return down(n + 1) + 1; }\nexport default function () { return { v: down(0) }; }",
        Vec::new(),
        ScriptLimits::default(),
    )
    .unwrap();
    let err = runner.execute(&Variables::new(), &env()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Script);
    assert!(err.message().contains("recursion limit"), "{err}");
}

#[test]
fn oversized_allocations_fail() {
    let runner = ScriptRunner::new(
        "export default function () { const a = new Array(50000000).fill(1); return { n: a.length }; }",
        Vec::new(),
        ScriptLimits {
            memory_limit_mb: 2.0,
            ..ScriptLimits::default()
        },
    )
    .unwrap();
    let err = runner.execute(&Variables::new(), &env()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Script);
}

#[test]
fn executions_do_not_share_state() {
    let runner = ScriptRunner::new(
        "let calls = 0;\nexport default function () { calls += 1; return { calls }; }",
        Vec::new(),
        ScriptLimits::default(),
    )
    .unwrap();
    for _ in 0..2 {
        let out = runner.execute(&Variables::new(), &env()).unwrap();
        assert_eq!(out.get("calls"), Some(&Value::Number(1.0)));
    }
}
