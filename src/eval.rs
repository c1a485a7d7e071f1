//! Evaluator: walks the AST against a JSON input value (spec §4.3).
//!
//! Every `eval_*` function takes an `out_path` string — the
//! `$.`-prefixed, JSON-pointer-like path to the output position the
//! expression's value is destined for — and threads it one level deeper
//! for each object entry, list item, or iteration it recurses into. On
//! failure that path is what ends up in `JsonMapError::MissingField`,
//! `OutOfBounds`, and `TypeMismatch`.

use log::trace;
use serde_json::{Map, Number, Value};

use crate::ast::{Body, Expr, PathStep, Program, RefRoot};
use crate::env::Env;
use crate::error::{JsonMapError, Result};

/// Evaluates every top-level binding in order and assembles the result
/// object (spec §4.3, "Top-level program").
pub fn translate(program: &Program, input: Value) -> Result<Value> {
    let env = Env::root(input);
    let mut out = Map::new();
    for binding in &program.bindings {
        let out_path = format!("$.{}", binding.name);
        let value = eval(&binding.expr, &env, &out_path)?;
        out.insert(binding.name.clone(), value);
    }
    Ok(Value::Object(out))
}

fn eval(expr: &Expr, env: &Env, out_path: &str) -> Result<Value> {
    match expr {
        Expr::JsonNull => Ok(Value::Null),
        Expr::JsonBool(b) => Ok(Value::Bool(*b)),
        Expr::JsonNumber(n) => Ok(Value::Number(number_from_f64(*n))),
        Expr::JsonString(s) => Ok(Value::String(s.clone())),
        Expr::ListLit(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(eval(item, env, &format!("{out_path}[{i}]"))?);
            }
            Ok(Value::Array(out))
        }
        Expr::ObjectLit(entries) => eval_object(entries, env, out_path),
        Expr::Ref { root, path } => eval_ref(*root, path, env, out_path),
        Expr::Map { source, body } => eval_map(source, body, env, out_path),
        Expr::Zip { sources, body } => eval_zip(sources, body, env, out_path),
        Expr::Bind { source, body } => eval_bind(source, body, env, out_path),
    }
}

fn eval_object(entries: &[(String, Expr)], env: &Env, out_path: &str) -> Result<Value> {
    let mut map = Map::new();
    for (key, expr) in entries {
        let child_path = format!("{out_path}.{key}");
        let value = eval(expr, env, &child_path)?;
        // Uniqueness of `key` within this literal was already enforced
        // at parse time (spec §3.5); no computed keys exist in this
        // language, so no runtime duplicate check is possible or needed.
        map.insert(key.clone(), value);
    }
    Ok(Value::Object(map))
}

fn eval_ref(root: RefRoot, path: &[PathStep], env: &Env, out_path: &str) -> Result<Value> {
    let mut value: &Value = match root {
        RefRoot::Current => &env.current,
        RefRoot::Anonymous => &env.anon,
        RefRoot::Global => &env.global,
    };
    for step in path {
        value = apply_step(value, step, out_path)?;
    }
    Ok(value.clone())
}

fn apply_step<'a>(value: &'a Value, step: &PathStep, out_path: &str) -> Result<&'a Value> {
    match step {
        PathStep::Field(name) => match value {
            Value::Object(map) => map.get(name).ok_or_else(|| JsonMapError::MissingField {
                path: out_path.to_string(),
                field: name.clone(),
            }),
            other => Err(JsonMapError::TypeMismatch {
                path: out_path.to_string(),
                expected: "object".to_string(),
                actual: kind_name(other).to_string(),
            }),
        },
        PathStep::Index(i) => match value {
            Value::Array(list) => {
                let index = *i as usize;
                list.get(index).ok_or_else(|| JsonMapError::OutOfBounds {
                    path: out_path.to_string(),
                    index,
                    length: list.len(),
                })
            }
            other => Err(JsonMapError::TypeMismatch {
                path: out_path.to_string(),
                expected: "list".to_string(),
                actual: kind_name(other).to_string(),
            }),
        },
    }
}

fn eval_map(source: &Expr, body: &Body, env: &Env, out_path: &str) -> Result<Value> {
    let source_value = eval(source, env, out_path)?;
    let Value::Array(items) = source_value else {
        return Err(JsonMapError::TypeMismatch {
            path: out_path.to_string(),
            expected: "list".to_string(),
            actual: kind_name(&source_value).to_string(),
        });
    };
    trace!("map: {} elements at {out_path}", items.len());
    let mut out = Vec::with_capacity(items.len());
    for (i, element) in items.into_iter().enumerate() {
        let child_env = env.for_map_element(element);
        let child_path = format!("{out_path}[{i}]");
        out.push(eval_body(body, &child_env, &child_path)?);
    }
    Ok(Value::Array(out))
}

fn eval_zip(sources: &[Expr], body: &Body, env: &Env, out_path: &str) -> Result<Value> {
    let mut lists = Vec::with_capacity(sources.len());
    for source in sources {
        let value = eval(source, env, out_path)?;
        match value {
            Value::Array(items) => lists.push(items),
            other => {
                return Err(JsonMapError::TypeMismatch {
                    path: out_path.to_string(),
                    expected: "list".to_string(),
                    actual: kind_name(&other).to_string(),
                })
            }
        }
    }
    let length = lists.iter().map(Vec::len).min().unwrap_or(0);
    trace!(
        "zip: {} elements (min of {} sources) at {out_path}",
        length,
        lists.len()
    );
    let mut out = Vec::with_capacity(length);
    for i in 0..length {
        let tuple: Vec<Value> = lists.iter().map(|list| list[i].clone()).collect();
        let merged_current = merge_tuple(&tuple);
        let child_env = env.for_zip_tuple(tuple, merged_current);
        let child_path = format!("{out_path}[{i}]");
        out.push(eval_body(body, &child_env, &child_path)?);
    }
    Ok(Value::Array(out))
}

/// Left-to-right merge of the object members of a zip tuple; later
/// sources win on key collision (spec §3.4, resolved Open Question 3).
/// Non-object tuple members contribute nothing and are only reachable
/// through `&?.i`.
fn merge_tuple(tuple: &[Value]) -> Value {
    let mut map = Map::new();
    for element in tuple {
        if let Value::Object(fields) = element {
            for (key, value) in fields {
                map.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(map)
}

fn eval_bind(source: &Expr, body: &Body, env: &Env, out_path: &str) -> Result<Value> {
    let value = eval(source, env, out_path)?;
    let child_env = env.with_current(value);
    eval_body(body, &child_env, out_path)
}

/// A list body with more than one expression produces a list per
/// iteration; with exactly one expression it is unwrapped to that single
/// value (spec §4.3, §9, resolved Open Question 1).
fn eval_body(body: &Body, env: &Env, out_path: &str) -> Result<Value> {
    match body {
        Body::Object(entries) => eval_object(entries, env, out_path),
        Body::List(items) if items.len() == 1 => eval(&items[0], env, out_path),
        Body::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(eval(item, env, &format!("{out_path}[{i}]"))?);
            }
            Ok(Value::Array(out))
        }
    }
}

/// JSON number literals parse as `f64` (spec §3.2), but whole numbers
/// must round-trip as JSON integers (`5`, not `5.0`) to match both
/// `serde_json`'s integer `Number` equality and conventional JSON
/// output.
fn number_from_f64(n: f64) -> Number {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        if n >= 0.0 {
            Number::from(n as u64)
        } else {
            Number::from(n as i64)
        }
    } else {
        Number::from_f64(n).expect("lexer only produces finite numbers")
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(src: &str, input: Value) -> Result<Value> {
        let tokens = crate::lexer::tokenize(src)?;
        let program = crate::parser::parse_program(tokens)?;
        translate(&program, input)
    }

    #[test]
    fn s1_simple_field_refs() {
        let out = run(
            "speaker = &actor; message = &line;",
            json!({"actor": "Alice", "line": "Hi"}),
        )
        .unwrap();
        assert_eq!(out, json!({"speaker": "Alice", "message": "Hi"}));
    }

    #[test]
    fn s2_index_ref() {
        let out = run(
            "my_fav = &fruits.1;",
            json!({"fruits": ["apples", "bananas", "cherries"]}),
        )
        .unwrap();
        assert_eq!(out, json!({"my_fav": "bananas"}));
    }

    #[test]
    fn s3_nested_object_with_literal() {
        let out = run(
            "classroom = { teacher = &t; n = &n; grade = 5; };",
            json!({"t": "Bob", "n": 25}),
        )
        .unwrap();
        assert_eq!(
            out,
            json!({"classroom": {"teacher": "Bob", "n": 25, "grade": 5}})
        );
    }

    #[test]
    fn s4_map_fidelity() {
        let out = run(
            "classes = map &schedule { subject = &class; };",
            json!({"schedule": [{"class": "A", "time": "10"}, {"class": "B", "time": "11"}]}),
        )
        .unwrap();
        assert_eq!(
            out,
            json!({"classes": [{"subject": "A"}, {"subject": "B"}]})
        );
    }

    #[test]
    fn s5_zip_length_and_values() {
        let out = run(
            r#"nums = zip [1,2,3] ["one","two","three"] { v = &?.0; n = &?.1; };"#,
            json!({}),
        )
        .unwrap();
        assert_eq!(
            out,
            json!({"nums": [
                {"v": 1, "n": "one"},
                {"v": 2, "n": "two"},
                {"v": 3, "n": "three"},
            ]})
        );
    }

    #[test]
    fn s6_global_reach_inside_map() {
        let out = run(
            "items = map &inventory { item = &?; store = &!store; };",
            json!({"store": "S", "inventory": ["a", "b"]}),
        )
        .unwrap();
        assert_eq!(
            out,
            json!({"items": [
                {"item": "a", "store": "S"},
                {"item": "b", "store": "S"},
            ]})
        );
    }

    #[test]
    fn s7_missing_field_error() {
        let err = run("x = &missing;", json!({})).unwrap_err();
        assert_eq!(
            err,
            JsonMapError::MissingField {
                path: "$.x".to_string(),
                field: "missing".to_string(),
            }
        );
    }

    #[test]
    fn s8_type_mismatch_error() {
        let err = run("x = &a.0;", json!({"a": {}})).unwrap_err();
        assert_eq!(
            err,
            JsonMapError::TypeMismatch {
                path: "$.x".to_string(),
                expected: "list".to_string(),
                actual: "object".to_string(),
            }
        );
    }

    #[test]
    fn zip_requires_minimum_length() {
        let out = run(
            "pairs = zip [1,2,3,4] [10,20] { a = &?.0; b = &?.1; };",
            json!({}),
        )
        .unwrap();
        assert_eq!(out["pairs"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn zip_merges_objects_last_wins() {
        let out = run(
            r#"merged = zip [{"a": 1, "b": 1}] [{"b": 2}] { m = &b; };"#,
            json!({}),
        )
        .unwrap();
        assert_eq!(out, json!({"merged": [{"m": 2}]}));
    }

    #[test]
    fn zip_non_object_member_only_reachable_via_anon() {
        let out = run(
            r#"out = zip [1, 2] [{"x": 1}, {"x": 1}] { first = &?.0; x = &x; };"#,
            json!({}),
        )
        .unwrap();
        assert_eq!(
            out,
            json!({"out": [{"first": 1, "x": 1}, {"first": 2, "x": 1}]})
        );
    }

    #[test]
    fn bind_does_not_rebind_anon() {
        let out = run(
            "x = map &xs { y = bind &sub { z = &?; }; };",
            json!({"xs": [{"sub": {"k": 1}}], "sub": "outer-anon-unused"}),
        )
        .unwrap();
        // &? inside `bind` still refers to the outer anon (the mapped
        // element), not `sub` (the bind target).
        assert_eq!(out, json!({"x": [{"y": {"z": {"sub": {"k": 1}}}}]}));
    }

    #[test]
    fn map_rebinds_anon() {
        let out = run(
            "x = map &xs { v = &?; };",
            json!({"xs": [1, 2, 3]}),
        )
        .unwrap();
        assert_eq!(out, json!({"x": [{"v": 1}, {"v": 2}, {"v": 3}]}));
    }

    #[test]
    fn single_expression_list_body_is_unwrapped() {
        let out = run(
            "classes = map &schedule [ &class ];",
            json!({"schedule": [{"class": "A"}, {"class": "B"}]}),
        )
        .unwrap();
        assert_eq!(out, json!({"classes": ["A", "B"]}));
    }

    #[test]
    fn multi_expression_list_body_produces_list_of_tuples() {
        let out = run(
            "rows = map &xs [ &a, &b ];",
            json!({"xs": [{"a": 1, "b": 2}, {"a": 3, "b": 4}]}),
        )
        .unwrap();
        assert_eq!(out, json!({"rows": [[1, 2], [3, 4]]}));
    }

    #[test]
    fn literal_only_program_ignores_input() {
        let out = run("a = 1; b = [1,2]; c = { x = null; };", json!(42)).unwrap();
        assert_eq!(out, json!({"a": 1, "b": [1,2], "c": {"x": null}}));
    }

    #[test]
    fn out_of_bounds_error_carries_length() {
        let err = run("x = &xs.5;", json!({"xs": [1,2,3]})).unwrap_err();
        assert_eq!(
            err,
            JsonMapError::OutOfBounds {
                path: "$.x".to_string(),
                index: 5,
                length: 3,
            }
        );
    }

    #[test]
    fn nested_path_is_reported_in_object_literal() {
        let err = run(
            "classroom = { teacher = &missing_key; };",
            json!({}),
        )
        .unwrap_err();
        assert_eq!(
            err,
            JsonMapError::MissingField {
                path: "$.classroom.teacher".to_string(),
                field: "missing_key".to_string(),
            }
        );
    }

    #[test]
    fn determinism() {
        let program = "x = map &xs { v = &? ; };";
        let input = json!({"xs": [1,2,3]});
        let a = run(program, input.clone()).unwrap();
        let b = run(program, input).unwrap();
        assert_eq!(a, b);
    }
}
