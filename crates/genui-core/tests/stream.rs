// crates/genui-core/tests/stream.rs
// ============================================================================
// Module: Spec Stream Tests
// Description: Patch line parsing, fence handling, and chunked ingestion.
// Purpose: Validate that streamed message text builds the expected tree.
// Dependencies: genui-core, serde_json
// ============================================================================

//! ## Overview
//! Feeds message text to [`SpecStreamParser`] whole and in arbitrary chunks
//! and checks the resulting document and prose.

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

use genui_core::PatchOp;
use genui_core::Spec;
use genui_core::SpecDocument;
use genui_core::SpecPatch;
use genui_core::SpecStreamParser;
use genui_core::parse_message_content;
use genui_core::runtime::parse_patch_line;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const MESSAGE: &str = "Here are your quotes.\n\
```spec\n\
{\"op\":\"add\",\"path\":\"/root\",\"value\":\"t\"}\n\
{\"op\":\"add\",\"path\":\"/elements/t\",\"value\":{\"type\":\"DataTable\",\"props\":{\"rows\":{\"$state\":\"/tx/table\"}},\"children\":[]}}\n\
not a patch\n\
{\"op\":\"add\",\"path\":\"/state/tx/table\",\"value\":{\"deps\":[\"/tools/c1/rows\"],\"fn\":\"return arguments[0]\"}}\n\
```\n\
Let me know if you need more.";

// ============================================================================
// SECTION: Patch Lines
// ============================================================================

/// Verifies well-formed patch lines parse and malformed ones are skipped.
#[test]
fn parses_patch_lines() {
    let patch = parse_patch_line(r#"  {"op":"replace","path":"/root","value":"x"}  "#).unwrap();
    assert_eq!(patch.op, PatchOp::Replace);
    assert_eq!(patch.value, Some(json!("x")));

    assert!(parse_patch_line(r#"{"op":"add","path":"/root"}"#).is_none());
    assert!(parse_patch_line(r#"{"op":"move","path":"/root","value":1}"#).is_none());
    assert!(parse_patch_line(r#"{"op":"add","path":"/root","value":"#).is_none());
    assert!(parse_patch_line("plain text").is_none());
    assert!(parse_patch_line(r#"{"op":"remove","path":"/elements/a"}"#).is_some());
}

/// Verifies an explicit null value is kept rather than treated as missing.
#[test]
fn explicit_null_value_is_present() {
    let patch = parse_patch_line(r#"{"op":"add","path":"/state/x","value":null}"#).unwrap();
    assert_eq!(patch.value, Some(serde_json::Value::Null));
}

// ============================================================================
// SECTION: Documents
// ============================================================================

/// Verifies patches build intermediate objects and support append.
#[test]
fn document_applies_patches_in_place() {
    let mut document = SpecDocument::new();
    assert!(!document.has_root());
    let patches = [
        SpecPatch {
            op: PatchOp::Add,
            path: "/root".to_string(),
            value: Some(json!("list")),
        },
        SpecPatch {
            op: PatchOp::Add,
            path: "/elements/list".to_string(),
            value: Some(json!({ "type": "Stack", "props": {}, "children": ["a"] })),
        },
        SpecPatch {
            op: PatchOp::Add,
            path: "/elements/list/children/-".to_string(),
            value: Some(json!("b")),
        },
        SpecPatch {
            op: PatchOp::Add,
            path: "/state/filters/symbol".to_string(),
            value: Some(json!("AAPL")),
        },
    ];
    for patch in &patches {
        document.apply(patch).unwrap();
    }

    assert!(document.has_root());
    assert_eq!(document.value()["elements"]["list"]["children"], json!(["a", "b"]));
    assert_eq!(document.value()["state"]["filters"]["symbol"], json!("AAPL"));

    let spec = Spec::from_document(document.value(), "state");
    let root = spec.root.as_ref().unwrap();
    assert_eq!(spec.elements[root].component, "Stack");
    assert_eq!(spec.dangling_children().len(), 2);
}

/// Verifies removing a missing value is an error.
#[test]
fn removing_missing_value_fails() {
    let mut document = SpecDocument::new();
    let patch = SpecPatch {
        op: PatchOp::Remove,
        path: "/elements/ghost".to_string(),
        value: None,
    };
    assert!(document.apply(&patch).is_err());
}

// ============================================================================
// SECTION: Message Content
// ============================================================================

/// Verifies fenced patches build the tree and prose stays as text.
#[test]
fn splits_prose_from_fenced_patches() {
    let content = parse_message_content(MESSAGE);

    assert_eq!(content.text, "Here are your quotes.\nLet me know if you need more.");
    assert_eq!(content.patches_applied, 3);
    let document = content.document.expect("document");
    assert_eq!(document.value()["root"], json!("t"));
    assert_eq!(document.value()["elements"]["t"]["type"], json!("DataTable"));
    assert_eq!(document.value()["state"]["tx"]["table"]["deps"], json!(["/tools/c1/rows"]));
}

/// Verifies chunk boundaries do not change the result.
#[test]
fn chunked_input_matches_whole_input() {
    let whole = parse_message_content(MESSAGE);
    for size in [1, 3, 7, 64] {
        let mut parser = SpecStreamParser::new();
        let chars = MESSAGE.chars().collect::<Vec<_>>();
        for chunk in chars.chunks(size) {
            parser.push(&chunk.iter().collect::<String>());
        }
        assert_eq!(parser.finish(), whole, "chunk size {size}");
    }
}

/// Verifies the document grows as lines complete.
#[test]
fn document_grows_line_by_line() {
    let mut parser = SpecStreamParser::new();
    parser.push("{\"op\":\"add\",\"path\":\"/root\",\"value\":\"t\"}");
    assert!(parser.document().is_none());
    parser.push("\n");
    assert_eq!(parser.patches_applied(), 1);
    assert!(parser.document().unwrap().has_root());
}

/// Verifies unfenced patch lines are applied and other fences are prose.
#[test]
fn heuristic_lines_and_foreign_fences() {
    let message = "Intro\n\
{\"op\":\"add\",\"path\":\"/root\",\"value\":\"a\"}\n\
```python\n\
{\"op\":\"add\",\"path\":\"/root\",\"value\":\"b\"}\n\
```\n\
{not json";
    let content = parse_message_content(message);

    assert_eq!(content.patches_applied, 1);
    assert_eq!(content.document.unwrap().value()["root"], json!("a"));
    assert!(content.text.starts_with("Intro\n```python\n"));
    assert!(content.text.ends_with("```\n{not json"));
}

/// Verifies failed patches are counted and do not stop the stream.
#[test]
fn rejected_patches_are_counted() {
    let message = "{\"op\":\"remove\",\"path\":\"/elements/none\"}\n\
{\"op\":\"add\",\"path\":\"/root\",\"value\":\"a\"}";
    let content = parse_message_content(message);

    assert_eq!(content.patches_rejected, 1);
    assert_eq!(content.patches_applied, 1);
    assert!(content.text.is_empty());
}

/// Verifies messages without patches have no document.
#[test]
fn prose_only_message_has_no_document() {
    let content = parse_message_content("  Just text.  \n");
    assert_eq!(content.text, "Just text.");
    assert!(content.document.is_none());
}
