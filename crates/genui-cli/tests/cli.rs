// crates/genui-cli/tests/cli.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Runs the `genui` binary against fixture files.
// Purpose: Validate resolve, eval, and config commands end to end.
// Dependencies: genui-cli binary, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Each test writes fixtures into a temporary directory, runs the compiled
//! binary from there with a clean environment, and checks its output.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Transform body reshaping quote rows.
const TABLE_FN: &str = "return arguments[0].map(s=>({sym:s.symbol}))";

/// Runs the binary inside `dir` with a clean environment.
fn genui(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_genui"))
        .args(args)
        .current_dir(dir)
        .env_remove("GENUI_CONFIG")
        .env_remove("GENUI_LANG")
        .output()
        .expect("run genui")
}

/// Parses stdout as one JSON document.
fn stdout_json(output: &Output) -> Value {
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("stdout is json")
}

/// Writes the quote table spec and a completed quote tool part.
fn write_fixtures(dir: &TempDir, binding: &str) {
    let spec = json!({
        "root": "t",
        "elements": {
            "t": {
                "type": "DataTable",
                "props": {
                    "rows": { "$state": binding },
                    "columns": [{ "key": "sym", "label": "Symbol" }]
                },
                "children": []
            }
        },
        "state": { "tx": { "table": { "deps": ["/tools/c1/rows"], "fn": TABLE_FN } } }
    });
    let parts = json!([
        { "type": "text", "text": "Fetching quotes." },
        {
            "type": "tool-getQuotes",
            "toolCallId": "c1",
            "state": "output-available",
            "output": { "rows": [{ "symbol": "AAPL", "price": 1 }] }
        }
    ]);
    fs::write(dir.path().join("spec.json"), spec.to_string()).unwrap();
    fs::write(dir.path().join("parts.json"), parts.to_string()).unwrap();
}

// ============================================================================
// SECTION: Resolve
// ============================================================================

/// Verifies a bound table resolves to transformed tool output.
#[test]
fn resolve_substitutes_transform_output() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(&dir, "/tx/table");

    let output = genui(dir.path(), &["resolve", "--spec", "spec.json", "--parts", "parts.json"]);
    let report = stdout_json(&output);

    assert_eq!(report["outcome"]["diagnostics"], json!([]));
    assert_eq!(report["outcome"]["spec"]["elements"]["t"]["props"]["rows"], json!([{ "sym": "AAPL" }]));
    assert!(report["outcome"]["spec"].get("state").is_none());
    assert!(report.get("feedback").is_none());
}

/// Verifies a wrong binding yields a diagnostic and a correction request.
#[test]
fn resolve_reports_feedback_for_wrong_binding() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(&dir, "/tx/tbl");

    let output = genui(
        dir.path(),
        &["resolve", "--spec", "spec.json", "--parts", "parts.json", "--feedback"],
    );
    let report = stdout_json(&output);

    assert_eq!(report["outcome"]["diagnostics"][0]["kind"], json!("unresolved_reference"));
    assert_eq!(report["outcome"]["diagnostics"][0]["key"], json!("/tx/tbl"));
    assert_eq!(report["feedback"]["decision"], json!("requested"));
    let message = report["feedback"]["message"].as_str().unwrap();
    assert!(message.starts_with("[UI Spec Error] /tx/tbl: unresolved_reference"));
}

/// Verifies streaming passes withhold unresolved references.
#[test]
fn resolve_streaming_withholds_references() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(&dir, "/tx/table");

    let output = genui(dir.path(), &["resolve", "--spec", "spec.json", "--streaming", "--feedback"]);
    let report = stdout_json(&output);

    assert_eq!(report["outcome"]["phase"], json!("streaming"));
    assert_eq!(report["outcome"]["withheld_references"], json!(1));
    assert_eq!(report["outcome"]["diagnostics"], json!([]));
    assert_eq!(report["feedback"]["decision"], json!("not_settled"));
}

/// Verifies a streamed message is rebuilt from its patch lines.
#[test]
fn resolve_accepts_message_content() {
    let dir = tempfile::tempdir().unwrap();
    let message = "Here is a greeting.\n```spec\n\
{\"op\":\"add\",\"path\":\"/root\",\"value\":\"g\"}\n\
{\"op\":\"add\",\"path\":\"/elements/g\",\"value\":{\"type\":\"Text\",\"props\":{\"text\":{\"$state\":\"/state/name\"}},\"children\":[]}}\n\
{\"op\":\"add\",\"path\":\"/state/name\",\"value\":\"Ada\"}\n\
```";
    fs::write(dir.path().join("message.md"), message).unwrap();

    let output = genui(dir.path(), &["resolve", "--spec", "message.md"]);
    let report = stdout_json(&output);

    assert_eq!(report["text"], json!("Here is a greeting."));
    assert_eq!(report["patches_applied"], json!(3));
    assert_eq!(report["outcome"]["spec"]["elements"]["g"]["props"]["text"], json!("Ada"));
}

/// Verifies the Markdown report names the pass and its diagnostics.
#[test]
fn resolve_renders_markdown() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(&dir, "/tx/tbl");

    let output = genui(
        dir.path(),
        &["resolve", "--spec", "spec.json", "--parts", "parts.json", "--format", "markdown"],
    );
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(output.status.success());
    assert!(stdout.starts_with("## Resolution pass"));
    assert!(stdout.contains("- `/tx/tbl` (unresolved_reference):"));
    assert!(stdout.contains("- `table`: computed"));
}

/// Verifies configured audit events land in the log file.
#[test]
fn resolve_writes_audit_log_from_config() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(&dir, "/tx/table");
    fs::write(dir.path().join("genui.toml"), "[audit]\nsink = \"file\"\npath = \"audit.jsonl\"\n")
        .unwrap();

    let output = genui(dir.path(), &["resolve", "--spec", "spec.json", "--parts", "parts.json"]);
    stdout_json(&output);

    let log = fs::read_to_string(dir.path().join("audit.jsonl")).unwrap();
    let events: Vec<Value> = log.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], json!("resolution_pass"));
    assert!(!log.contains("AAPL"));
}

/// Verifies missing and non-spec inputs fail with a message.
#[test]
fn resolve_rejects_unusable_inputs() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("prose.md"), "No spec here.").unwrap();
    fs::write(dir.path().join("parts.json"), "{}").unwrap();

    let missing = genui(dir.path(), &["resolve", "--spec", "absent.json"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("Failed to read UI spec"));

    let prose = genui(dir.path(), &["resolve", "--spec", "prose.md"]);
    assert!(String::from_utf8_lossy(&prose.stderr).contains("No UI spec found in prose.md"));

    fs::write(dir.path().join("spec.json"), r#"{"root":"a","elements":{}}"#).unwrap();
    let parts = genui(dir.path(), &["resolve", "--spec", "spec.json", "--parts", "parts.json"]);
    assert!(String::from_utf8_lossy(&parts.stderr).contains("must be a JSON array"));
}

// ============================================================================
// SECTION: Eval
// ============================================================================

/// Verifies a body's return value is printed as JSON.
#[test]
fn eval_prints_defined_value() {
    let dir = tempfile::tempdir().unwrap();
    let output = genui(
        dir.path(),
        &["eval", "--source", "return arguments[0] * 2", "--args", "[21]"],
    );
    assert_eq!(stdout_json(&output), json!({ "status": "defined", "value": 42 }));
}

/// Verifies a body that returns nothing is reported as undefined.
#[test]
fn eval_reports_undefined() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("body.js"), "const x = 1;").unwrap();
    let output = genui(dir.path(), &["eval", "--source", "@body.js"]);
    assert_eq!(stdout_json(&output), json!({ "status": "undefined" }));
}

/// Verifies script errors fail with their name and position.
#[test]
fn eval_reports_script_errors() {
    let dir = tempfile::tempdir().unwrap();
    let output = genui(dir.path(), &["eval", "--source", "return missing()"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("ReferenceError at line 1"), "{stderr}");
}

/// Verifies sandbox budgets come from configuration.
#[test]
fn eval_honors_configured_step_budget() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("tight.toml"), "[sandbox]\nmax_steps = 50\n").unwrap();
    let output = genui(
        dir.path(),
        &["eval", "--source", "let n = 0; while (true) { n = n + 1; }", "--config", "tight.toml"],
    );
    assert!(!output.status.success());
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Verifies valid and invalid config files are reported.
#[test]
fn config_validate_reports_result() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("genui.toml"), "[feedback]\nmax_attempts = 3\n").unwrap();
    fs::write(dir.path().join("bad.toml"), "[feedback]\nmax_attempts = 99\n").unwrap();

    let ok = genui(dir.path(), &["config", "validate"]);
    assert!(ok.status.success());
    assert_eq!(String::from_utf8_lossy(&ok.stdout).trim(), "Config validated successfully.");

    let bad = genui(dir.path(), &["config", "validate", "--config", "bad.toml"]);
    assert!(!bad.status.success());
    assert!(String::from_utf8_lossy(&bad.stderr).contains("feedback.max_attempts"));
}

/// Verifies the printed example is itself a valid config.
#[test]
fn config_example_round_trips_through_validate() {
    let dir = tempfile::tempdir().unwrap();
    let example = genui(dir.path(), &["config", "example"]);
    assert!(example.status.success());
    fs::write(dir.path().join("example.toml"), &example.stdout).unwrap();

    let output = genui(dir.path(), &["config", "validate", "--config", "example.toml"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}

/// Verifies the Catalan locale localizes messages and adds the disclaimer.
#[test]
fn lang_flag_localizes_output() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("genui.toml"), "").unwrap();
    let output = genui(dir.path(), &["--lang", "ca", "config", "validate"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("correctament"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Nota:"));
}
