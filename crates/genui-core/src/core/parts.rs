// crates/genui-core/src/core/parts.rs
// ============================================================================
// Module: GenUI Message Parts
// Description: Tool invocation records decoded from heterogeneous message parts.
// Purpose: Normalize the legacy and current tool part shapes into one record.
// Dependencies: crate::core::identifiers, serde, serde_json
// ============================================================================

//! ## Overview
//! A message is an ordered list of parts: text chunks, tool invocations in
//! flight, and tool results. Two wire shapes carry tool invocations:
//!
//! - Legacy: `{ "type": "tool-invocation" | "tool-call", "toolInvocation": {
//!   "toolName", "toolCallId", "state", "result" | "output", "args" } }`
//! - Current: `{ "type": "tool-<name>", "toolCallId", "state",
//!   "output" | "result", "input" }`
//!
//! Both decode into a [`ToolCallRecord`]. Anything else is not a tool part
//! and decodes to `None`; unknown shapes are never an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::CallId;

// ============================================================================
// SECTION: Wire Constants
// ============================================================================

/// Part type prefix of the current tool shape.
const TOOL_TYPE_PREFIX: &str = "tool-";
/// Part types that use the legacy nested shape.
const LEGACY_TOOL_TYPES: [&str; 2] = ["tool-invocation", "tool-call"];
/// Part type reserved for standalone results; never a tool name.
const RESULT_TYPE: &str = "tool-result";
/// States meaning the output is available.
const COMPLETED_STATES: [&str; 2] = ["result", "output-available"];
/// States meaning the call failed.
const ERRORED_STATES: [&str; 2] = ["output-error", "error"];

// ============================================================================
// SECTION: Tool Calls
// ============================================================================

/// Completion state of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallState {
    /// Input streaming or call running.
    Pending,
    /// Output available.
    Completed,
    /// Call failed.
    Errored,
}

impl ToolCallState {
    /// Classifies a wire state string.
    #[must_use]
    pub fn from_wire(state: &str) -> Self {
        if COMPLETED_STATES.contains(&state) {
            Self::Completed
        } else if ERRORED_STATES.contains(&state) {
            Self::Errored
        } else {
            Self::Pending
        }
    }
}

/// One tool invocation observed in the part stream.
///
/// # Invariants
/// - `output` is `Some` only when it was present and non-null on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Call identifier, when the part carried one.
    pub call_id: Option<CallId>,
    /// Tool name.
    pub tool_name: String,
    /// Normalized state.
    pub state: ToolCallState,
    /// State string as received.
    pub wire_state: String,
    /// Tool input arguments, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /// Tool output payload, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Error text for failed calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl ToolCallRecord {
    /// Decodes a tool part in either wire shape; other parts yield `None`.
    #[must_use]
    pub fn from_part(part: &Value) -> Option<Self> {
        let part = part.as_object()?;
        let part_type = part.get("type")?.as_str()?;
        let nested = part.get("toolInvocation").and_then(Value::as_object);
        if LEGACY_TOOL_TYPES.contains(&part_type) {
            return nested.and_then(Self::from_legacy);
        }
        let tool_name = part_type.strip_prefix(TOOL_TYPE_PREFIX)?;
        if part_type == RESULT_TYPE || tool_name.is_empty() {
            return None;
        }
        Some(Self::from_current(tool_name, part, nested))
    }

    /// Decodes the legacy nested shape.
    fn from_legacy(invocation: &Map<String, Value>) -> Option<Self> {
        let tool_name = invocation.get("toolName")?.as_str()?;
        let wire_state = text_field(invocation, "state").unwrap_or_default();
        Some(Self {
            call_id: text_field(invocation, "toolCallId").map(CallId::new),
            tool_name: tool_name.to_string(),
            state: ToolCallState::from_wire(&wire_state),
            wire_state,
            input: defined_field(invocation, "args").cloned(),
            output: defined_field(invocation, "result")
                .or_else(|| defined_field(invocation, "output"))
                .cloned(),
            error_text: text_field(invocation, "errorText"),
        })
    }

    /// Decodes the current flattened shape, falling back to a nested
    /// invocation for any field the part itself lacks.
    fn from_current(
        tool_name: &str,
        part: &Map<String, Value>,
        nested: Option<&Map<String, Value>>,
    ) -> Self {
        let from_nested = |key: &str| nested.and_then(|invocation| defined_field(invocation, key));
        let wire_state = text_field(part, "state")
            .or_else(|| nested.and_then(|invocation| text_field(invocation, "state")))
            .unwrap_or_default();
        let call_id = text_field(part, "toolCallId")
            .or_else(|| nested.and_then(|invocation| text_field(invocation, "toolCallId")));
        let output = defined_field(part, "output")
            .or_else(|| defined_field(part, "result"))
            .or_else(|| from_nested("result"))
            .or_else(|| from_nested("output"))
            .cloned();
        Self {
            call_id: call_id.map(CallId::new),
            tool_name: tool_name.to_string(),
            state: ToolCallState::from_wire(&wire_state),
            wire_state,
            input: defined_field(part, "input").or_else(|| from_nested("args")).cloned(),
            output,
            error_text: text_field(part, "errorText"),
        }
    }

    /// Returns the output when the call has completed with a payload.
    #[must_use]
    pub fn completed_output(&self) -> Option<&Value> {
        match self.state {
            ToolCallState::Completed => self.output.as_ref(),
            ToolCallState::Pending | ToolCallState::Errored => None,
        }
    }
}

/// Returns a member unless it is absent or null.
fn defined_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|value| !value.is_null())
}

/// Returns a non-empty string member.
fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).filter(|text| !text.is_empty()).map(str::to_string)
}

// ============================================================================
// SECTION: Tool Results
// ============================================================================

/// Completed tool outputs keyed by call identifier and by tool name.
///
/// # Invariants
/// - Call identifier entries are authoritative.
/// - A tool name entry holds the latest completed call of that tool
///   (last-write-wins); it is unreliable when a tool is called repeatedly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolResults {
    /// Output payloads by key.
    entries: BTreeMap<String, Value>,
}

impl ToolResults {
    /// Creates an empty result map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed call under its tool name, then its call identifier.
    pub fn record(&mut self, call: &ToolCallRecord) {
        let Some(output) = call.completed_output() else {
            return;
        };
        self.entries.insert(call.tool_name.clone(), output.clone());
        if let Some(call_id) = &call.call_id {
            self.entries.insert(call_id.as_str().to_string(), output.clone());
        }
    }

    /// Returns the output recorded under a call identifier or tool name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no tool has completed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the results as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.entries.iter().map(|(key, value)| (key.clone(), value.clone())).collect())
    }
}
