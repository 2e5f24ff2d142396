// crates/genui-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for input handling and report rendering.
// Purpose: Ensure bounded reads fail closed and spec inputs are recognized.
// Dependencies: genui-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Validates `read_bytes_with_limit`, spec input detection, locale selection,
//! and the Markdown rendering of resolve reports.

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
use std::sync::Arc;

use genui_core::FeedbackPolicy;
use genui_core::NoopAuditSink;
use genui_core::PipelineConfig;
use genui_core::ResolutionPipeline;
use genui_core::ResolutionSession;
use genui_core::StreamPhase;
use genui_script::Sandbox;
use serde_json::json;

use super::LangArg;
use super::Locale;
use super::ReadLimitError;
use super::ResolveReport;
use super::describe_eval_error;
use super::load_config;
use super::parse_spec_input;
use super::read_bytes_with_limit;
use super::render_resolve_markdown;
use super::resolve_locale;

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

#[test]
fn read_bytes_with_limit_rejects_oversized_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.json");
    fs::write(&path, vec![b'a'; 17]).unwrap();
    match read_bytes_with_limit(&path, 16) {
        Err(ReadLimitError::TooLarge {
            size,
            limit,
        }) => {
            assert_eq!(size, 17);
            assert_eq!(limit, 16);
        }
        other => panic!("expected size rejection, got {other:?}"),
    }
}

#[test]
fn read_bytes_with_limit_accepts_file_at_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exact.json");
    fs::write(&path, vec![b'a'; 16]).unwrap();
    assert_eq!(read_bytes_with_limit(&path, 16).unwrap().len(), 16);
}

#[test]
fn read_bytes_with_limit_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = read_bytes_with_limit(&dir.path().join("absent"), 16);
    assert!(matches!(result, Err(ReadLimitError::Io(_))));
}

// ============================================================================
// SECTION: Spec Inputs
// ============================================================================

#[test]
fn json_document_is_taken_verbatim() {
    let content = r#"{"root":"a","elements":{"a":{"type":"Text","props":{},"children":[]}}}"#;
    let input = parse_spec_input(content, Path::new("spec.json")).unwrap();
    assert_eq!(input.document["root"], json!("a"));
    assert!(input.text.is_none());
    assert_eq!(input.patches_applied, 0);
}

#[test]
fn patch_stream_rebuilds_document() {
    let content = "{\"op\":\"add\",\"path\":\"/root\",\"value\":\"a\"}\n\
                   {\"op\":\"add\",\"path\":\"/elements/a\",\"value\":{\"type\":\"Text\",\"props\":{},\"children\":[]}}\n\
                   {\"op\":\"remove\",\"path\":\"/elements/zzz\"}\n";
    let input = parse_spec_input(content, Path::new("spec.jsonl")).unwrap();
    assert_eq!(input.document["elements"]["a"]["type"], json!("Text"));
    assert_eq!(input.patches_applied, 2);
    assert_eq!(input.patches_rejected, 1);
    assert!(input.text.is_none());
}

#[test]
fn message_text_is_kept_beside_document() {
    let content = "Here you go.\n```spec\n{\"op\":\"add\",\"path\":\"/root\",\"value\":\"a\"}\n```\nDone.";
    let input = parse_spec_input(content, Path::new("message.md")).unwrap();
    assert_eq!(input.document["root"], json!("a"));
    assert_eq!(input.text.as_deref(), Some("Here you go.\nDone."));
}

#[test]
fn input_without_spec_is_rejected() {
    let err = parse_spec_input("just prose", Path::new("message.md")).unwrap_err();
    assert!(err.to_string().contains("message.md"));

    let err = parse_spec_input(r#"{"title":"x"}"#, Path::new("other.json")).unwrap_err();
    assert!(err.to_string().contains("other.json"));
}

// ============================================================================
// SECTION: Locale and Config
// ============================================================================

#[test]
fn locale_flag_wins_over_environment() {
    assert_eq!(resolve_locale(Some(LangArg::Ca), Some("en")).unwrap(), Locale::Ca);
    assert_eq!(resolve_locale(None, Some("ca-ES")).unwrap(), Locale::Ca);
    assert_eq!(resolve_locale(None, None).unwrap(), Locale::En);
    assert!(resolve_locale(None, Some("xx")).unwrap_err().to_string().contains("GENUI_LANG"));
}

#[test]
fn explicit_config_path_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(Some(&dir.path().join("genui.toml"))).unwrap_err();
    assert!(err.to_string().starts_with("Failed to load config"));
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

#[test]
fn eval_errors_carry_position_and_name() {
    let source = "let a = {};\nreturn a.b.c;";
    let err = Sandbox::with_defaults().evaluate(source, &[]).unwrap_err();
    let message = describe_eval_error(&err, source);
    assert!(message.starts_with("TypeError at line 2"), "{message}");
}

#[test]
fn markdown_report_lists_diagnostics_and_request() {
    let pipeline =
        ResolutionPipeline::new(PipelineConfig::default(), Sandbox::with_defaults()).unwrap();
    let mut session =
        ResolutionSession::new(pipeline, Arc::new(NoopAuditSink), FeedbackPolicy::default());
    let spec = json!({
        "root": "t",
        "elements": {
            "t": { "type": "Text", "props": { "text": { "$state": "/state/title" } }, "children": [] }
        }
    });
    let outcome = session.resolve(&[], &spec, StreamPhase::Settled).clone();
    let feedback = session.request_fix();
    let report = ResolveReport {
        outcome: &outcome,
        text: None,
        patches_applied: 0,
        patches_rejected: 0,
        feedback: Some(&feedback),
    };
    let markdown = render_resolve_markdown(&report).unwrap();

    assert!(markdown.contains("- Phase: settled"));
    assert!(markdown.contains("- `/state/title` (unresolved_reference):"));
    assert!(markdown.contains("### Correction request\n\n```text\n[UI Spec Error] /state/title"));
    assert!(markdown.contains("```json\n{"));
}
