// crates/genui-core/src/runtime/extractor.rs
// ============================================================================
// Module: GenUI Tool-Result Extractor
// Description: Scans message parts for tool invocations and completed results.
// Purpose: Produce the tool-result map and tool activity for one pass.
// Dependencies: crate::core::parts, serde_json
// ============================================================================

//! ## Overview
//! Parts are scanned in order. Completed calls are recorded under their tool
//! name and then their call identifier, so a later call of the same tool
//! replaces the name alias while every call identifier stays addressable.
//! In-flight calls are not results; they surface through
//! [`active_tool_calls`] as "tool is running" indicators.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::parts::ToolCallRecord;
use crate::core::parts::ToolCallState;
use crate::core::parts::ToolResults;

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Decodes every tool invocation in the part stream, in order.
#[must_use]
pub fn scan_tool_calls(parts: &[Value]) -> Vec<ToolCallRecord> {
    parts.iter().filter_map(ToolCallRecord::from_part).collect()
}

/// Builds the result map from already decoded calls.
#[must_use]
pub fn results_from_calls(calls: &[ToolCallRecord]) -> ToolResults {
    let mut results = ToolResults::new();
    for call in calls {
        results.record(call);
    }
    results
}

/// Maps completed tool outputs by call identifier and tool name.
#[must_use]
pub fn extract(parts: &[Value]) -> ToolResults {
    results_from_calls(&scan_tool_calls(parts))
}

/// Returns the tool calls still running.
#[must_use]
pub fn active_tool_calls(parts: &[Value]) -> Vec<ToolCallRecord> {
    scan_tool_calls(parts).into_iter().filter(|call| call.state == ToolCallState::Pending).collect()
}

/// Concatenates the text of `{ "type": "text", "text": ... }` parts.
#[must_use]
pub fn text_from_parts(parts: &[Value]) -> String {
    parts
        .iter()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect()
}
