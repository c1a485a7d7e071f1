//! End-to-end tests: the public `translate` API and the CLI binary.

use jsonmap::{translate, JsonMapError};
use serde_json::json;
use std::fs::File;
use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::tempdir;

#[test]
fn translates_flat_bindings() {
    let out = translate(
        "speaker = &actor; message = &line;",
        json!({"actor": "Alice", "line": "Hi"}),
    )
    .unwrap();
    assert_eq!(out, json!({"speaker": "Alice", "message": "Hi"}));
}

#[test]
fn translates_nested_map_and_zip() {
    let program = r#"
        classes = map &schedule { subject = &class; };
        nums = zip [1,2,3] ["one","two","three"] { v = &?.0; n = &?.1; };
    "#;
    let input = json!({"schedule": [{"class": "A"}, {"class": "B"}]});
    let out = translate(program, input).unwrap();
    assert_eq!(
        out,
        json!({
            "classes": [{"subject": "A"}, {"subject": "B"}],
            "nums": [
                {"v": 1, "n": "one"},
                {"v": 2, "n": "two"},
                {"v": 3, "n": "three"},
            ],
        })
    );
}

#[test]
fn reports_missing_field_with_path() {
    let err = translate("x = &missing;", json!({})).unwrap_err();
    match err {
        JsonMapError::MissingField { path, field } => {
            assert_eq!(path, "$.x");
            assert_eq!(field, "missing");
        }
        other => panic!("expected MissingField, got {other:?}"),
    }
}

#[test]
fn json_style_and_stmt_style_objects_agree() {
    let json_style = translate(r#"x = { "a": 1, "b": 2 };"#, json!({})).unwrap();
    let stmt_style = translate("x = { a = 1; b = 2; };", json!({})).unwrap();
    assert_eq!(json_style, stmt_style);
}

#[test]
fn determinism_across_repeated_runs() {
    let program = "x = map &xs { v = &?; };";
    let input = json!({"xs": [1, 2, 3]});
    let first = translate(program, input.clone()).unwrap();
    let second = translate(program, input).unwrap();
    assert_eq!(first, second);
}

fn run_cli(program_src: &str, input: &str, extra_args: &[&str]) -> std::process::Output {
    let dir = tempdir().unwrap();
    let program_path = dir.path().join("program.jsonmap");
    let mut file = File::create(&program_path).unwrap();
    file.write_all(program_src.as_bytes()).unwrap();

    let mut command = Command::new(env!("CARGO_BIN_EXE_jsonmap"));
    command
        .arg(&program_path)
        .args(extra_args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn().unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn cli_reads_stdin_and_writes_stdout() {
    let output = run_cli(
        "speaker = &actor;",
        r#"{"actor": "Alice"}"#,
        &[],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim(), r#"{"speaker":"Alice"}"#);
}

#[test]
fn cli_pretty_flag_indents_output() {
    let output = run_cli("speaker = &actor;", r#"{"actor": "Alice"}"#, &["--pretty"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains('\n'));
}

#[test]
fn cli_exits_nonzero_and_reports_error_on_bad_reference() {
    let output = run_cli("x = &missing;", "{}", &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("missing"));
}
