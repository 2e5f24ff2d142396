// crates/genui-core/tests/extractor.rs
// ============================================================================
// Module: Tool-Result Extractor Tests
// Description: Decoding of both tool part shapes and result aliasing.
// Purpose: Validate which tool outputs become addressable, and under which keys.
// Dependencies: genui-core, serde_json
// ============================================================================

//! ## Overview
//! Feeds message parts in the legacy nested shape and the current flattened
//! shape to the extractor and checks the resulting result map.

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

use genui_core::ToolCallRecord;
use genui_core::ToolCallState;
use genui_core::runtime::active_tool_calls;
use genui_core::runtime::extract;
use genui_core::runtime::text_from_parts;
use serde_json::json;

// ============================================================================
// SECTION: Shapes
// ============================================================================

/// Verifies the legacy nested shape is decoded.
#[test]
fn decodes_legacy_invocations() {
    let part = json!({
        "type": "tool-invocation",
        "toolInvocation": {
            "toolName": "search",
            "toolCallId": "a1",
            "state": "result",
            "args": { "q": "x" },
            "result": { "hits": 2 }
        }
    });
    let record = ToolCallRecord::from_part(&part).unwrap();

    assert_eq!(record.tool_name, "search");
    assert_eq!(record.state, ToolCallState::Completed);
    assert_eq!(record.input, Some(json!({ "q": "x" })));
    assert_eq!(record.completed_output(), Some(&json!({ "hits": 2 })));
}

/// Verifies the flattened shape falls back to a nested invocation.
#[test]
fn flattened_shape_falls_back_to_nested_fields() {
    let part = json!({
        "type": "tool-search",
        "toolInvocation": { "toolCallId": "a2", "state": "output-available", "result": [1] }
    });
    let record = ToolCallRecord::from_part(&part).unwrap();

    assert_eq!(record.tool_name, "search");
    assert_eq!(record.call_id.as_ref().map(|id| id.as_str()), Some("a2"));
    assert_eq!(record.completed_output(), Some(&json!([1])));
}

/// Verifies non-tool parts and reserved part types are ignored.
#[test]
fn ignores_non_tool_parts() {
    for part in [
        json!({ "type": "text", "text": "hi" }),
        json!({ "type": "tool-result", "toolCallId": "x", "output": 1 }),
        json!({ "type": "tool-", "state": "output-available", "output": 1 }),
        json!({ "type": "tool-call" }),
        json!("tool-search"),
    ] {
        assert!(ToolCallRecord::from_part(&part).is_none(), "{part}");
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Verifies later calls replace the tool-name alias but keep call ids.
#[test]
fn name_alias_is_last_write_wins() {
    let parts = [
        json!({ "type": "tool-quote", "toolCallId": "c1", "state": "output-available", "output": 1 }),
        json!({ "type": "tool-quote", "toolCallId": "c2", "state": "output-available", "output": 2 }),
    ];
    let results = extract(&parts);

    assert_eq!(results.get("c1"), Some(&json!(1)));
    assert_eq!(results.get("c2"), Some(&json!(2)));
    assert_eq!(results.get("quote"), Some(&json!(2)));
    assert_eq!(results.len(), 3);
}

/// Verifies pending, errored, and null-output calls produce no results.
#[test]
fn only_completed_outputs_are_results() {
    let parts = [
        json!({ "type": "tool-a", "toolCallId": "p", "state": "input-streaming" }),
        json!({ "type": "tool-b", "toolCallId": "e", "state": "output-error", "errorText": "down" }),
        json!({ "type": "tool-c", "toolCallId": "n", "state": "output-available", "output": null }),
    ];
    let results = extract(&parts);

    assert!(results.is_empty());
    let active = active_tool_calls(&parts);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].tool_name, "a");
}

/// Verifies text parts concatenate in order.
#[test]
fn concatenates_text_parts() {
    let parts = [
        json!({ "type": "text", "text": "Hello, " }),
        json!({ "type": "tool-a", "state": "input-streaming" }),
        json!({ "type": "text", "text": "world" }),
    ];
    assert_eq!(text_from_parts(&parts), "Hello, world");
}
