use super::*;
use crate::expression::CompiledExpr;

fn eval_with(src: &str, vars: serde_json::Value) -> Value {
    let env: BTreeMap<String, Value> = match Value::from_json(vars) {
        Value::Object(map) => map,
        _ => BTreeMap::new(),
    };
    CompiledExpr::compile(src).unwrap().eval(&env).unwrap()
}

fn eval(src: &str) -> Value {
    eval_with(src, serde_json::json!({}))
}

#[test]
fn arithmetic_and_builtins() {
    assert_eq!(eval("(1+2)*3"), Value::Number(9.0));
    assert_eq!(eval("clamp(-1, 0, 10)"), Value::Number(0.0));
    assert_eq!(eval("min(4, 2, 8)"), Value::Number(2.0));
    assert_eq!(eval("lerp(0, 10, 0.25)"), Value::Number(2.5));
    assert_eq!(eval("round(-2.5)"), Value::Number(-2.0));
    assert_eq!(eval("7 % 4"), Value::Number(3.0));
}

#[test]
fn plus_concatenates_when_either_side_is_text() {
    assert_eq!(eval("'frame ' + 3"), Value::from("frame 3"));
    assert_eq!(eval("1 + 2 + 'px'"), Value::from("3px"));
    assert_eq!(eval("'1' - 1"), Value::Number(0.0));
}

#[test]
fn missing_variables_read_as_undefined() {
    assert_eq!(eval("nope"), Value::Undefined);
    assert_eq!(eval("nope ?? 5"), Value::Number(5.0));
    assert!(eval("nope + 1").to_number().is_nan());
}

#[test]
fn reading_a_property_of_undefined_fails() {
    let err = CompiledExpr::compile("nope.x")
        .unwrap()
        .eval(&NoEnv)
        .unwrap_err();
    assert!(err.message.contains("cannot read property 'x'"));
}

#[test]
fn logical_operators_short_circuit_and_return_operands() {
    let vars = serde_json::json!({ "name": "", "fallback": "anon", "n": 0 });
    assert_eq!(eval_with("name || fallback", vars.clone()), Value::from("anon"));
    assert_eq!(eval_with("name ?? fallback", vars.clone()), Value::from(""));
    assert_eq!(eval_with("n && missing.deep", vars), Value::Number(0.0));
}

#[test]
fn conditional_picks_one_branch() {
    let vars = serde_json::json!({ "frame": 3 });
    assert_eq!(
        eval_with("frame > 2 ? 'late' : 'early'", vars.clone()),
        Value::from("late")
    );
    assert_eq!(eval_with("frame === 3 ? 1 : boom.x", vars), Value::Number(1.0));
}

#[test]
fn equality_flavours() {
    assert_eq!(eval("'2' == 2"), Value::Bool(true));
    assert_eq!(eval("'2' === 2"), Value::Bool(false));
    assert_eq!(eval("null == undefined"), Value::Bool(true));
    assert_eq!(eval("'b' > 'a'"), Value::Bool(true));
    assert_eq!(eval("'10' < 9"), Value::Bool(false));
}

#[test]
fn builds_arrays_and_objects() {
    let vars = serde_json::json!({ "w": 10 });
    let v = eval_with("{ w, h: w * 2, tags: ['a', 'b'] }", vars);
    assert_eq!(v.member("h"), Value::Number(20.0));
    assert_eq!(v.member("tags").member("length"), Value::Number(2.0));
    assert_eq!(eval("join([1, 2, 3], '-')"), Value::from("1-2-3"));
}

#[test]
fn indexes_into_scope_values() {
    let vars = serde_json::json!({ "rows": [{ "label": "x" }, { "label": "y" }], "i": 1 });
    assert_eq!(eval_with("rows[i].label", vars.clone()), Value::from("y"));
    assert_eq!(eval_with("rows[5]", vars.clone()), Value::Undefined);
    assert_eq!(eval_with("len(rows)", vars), Value::Number(2.0));
}

#[test]
fn runtime_builtin_errors_surface() {
    let err = CompiledExpr::compile("clamp(1, 5, 0)")
        .unwrap()
        .eval(&NoEnv)
        .unwrap_err();
    assert!(err.message.contains("clamp"));
    assert!(CompiledExpr::compile("len(3)").unwrap().eval(&NoEnv).is_err());
}
