// crates/genui-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared fixtures for genui-core tests.
// Purpose: Provide message parts, element trees, evaluators, and audit sinks.
// Dependencies: genui-core, genui-script, serde_json
// ============================================================================

//! ## Overview
//! Builders for the quote-table fixture used across pipeline, session, and
//! property tests, plus a counting evaluator and a recording audit sink.

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
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::cell::Cell;
use std::sync::Mutex;

use genui_core::AuditSink;
use genui_core::FeedbackAuditEvent;
use genui_core::PassAuditEvent;
use genui_core::PipelineConfig;
use genui_core::ResolutionPipeline;
use genui_core::TransformAuditEvent;
use genui_core::TransformError;
use genui_core::TransformEvaluator;
use genui_script::Sandbox;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Transform body reshaping quote rows into table rows.
pub const TABLE_FN: &str = "return arguments[0].map(s=>({sym:s.symbol}))";

/// Completed quote tool call in the current part shape.
pub fn quotes_part() -> Value {
    json!({
        "type": "tool-getQuotes",
        "toolCallId": "c1",
        "state": "output-available",
        "input": { "symbols": ["AAPL"] },
        "output": { "rows": [{ "symbol": "AAPL", "price": 1 }] }
    })
}

/// Quote tool call still running.
pub fn pending_quotes_part() -> Value {
    json!({
        "type": "tool-getQuotes",
        "toolCallId": "c1",
        "state": "input-available",
        "input": { "symbols": ["AAPL"] }
    })
}

/// Table element bound to `binding`, with the `table` transform declared.
pub fn table_spec(binding: &str) -> Value {
    json!({
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
        "state": {
            "tx": {
                "table": { "deps": ["/tools/c1/rows"], "fn": TABLE_FN }
            }
        }
    })
}

/// Pipeline with default configuration and the stock sandbox.
pub fn sandbox_pipeline() -> ResolutionPipeline<Sandbox> {
    ResolutionPipeline::new(PipelineConfig::default(), Sandbox::with_defaults())
        .expect("default config is valid")
}

// ============================================================================
// SECTION: Evaluators
// ============================================================================

/// Sandbox wrapper counting evaluations.
#[derive(Default)]
pub struct CountingEvaluator {
    /// Wrapped sandbox.
    pub inner: Sandbox,
    /// Evaluations so far.
    pub calls: Cell<usize>,
}

impl TransformEvaluator for CountingEvaluator {
    fn evaluate(&self, source: &str, args: &[Value]) -> Result<Option<Value>, TransformError> {
        self.calls.set(self.calls.get() + 1);
        TransformEvaluator::evaluate(&self.inner, source, args)
    }
}

/// Sandbox wrapper that panics on bodies containing [`FAULT_MARKER`].
#[derive(Default)]
pub struct PanickingEvaluator {
    /// Wrapped sandbox.
    pub inner: Sandbox,
}

/// Text that makes [`PanickingEvaluator`] panic.
pub const FAULT_MARKER: &str = "/* fault */";

impl TransformEvaluator for PanickingEvaluator {
    fn evaluate(&self, source: &str, args: &[Value]) -> Result<Option<Value>, TransformError> {
        if source.contains(FAULT_MARKER) {
            panic!("evaluator fault");
        }
        TransformEvaluator::evaluate(&self.inner, source, args)
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink keeping every event as JSON.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Serialized events in order.
    pub events: Mutex<Vec<Value>>,
}

impl RecordingAuditSink {
    /// Returns the `event` labels recorded so far.
    pub fn labels(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event["event"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Returns a copy of all events.
    pub fn snapshot(&self) -> Vec<Value> {
        self.events.lock().unwrap().clone()
    }

    /// Serializes and stores one event.
    fn push<T: serde::Serialize>(&self, event: &T) {
        self.events.lock().unwrap().push(serde_json::to_value(event).unwrap());
    }
}

impl AuditSink for RecordingAuditSink {
    fn record_pass(&self, event: &PassAuditEvent) {
        self.push(event);
    }

    fn record_transform(&self, event: &TransformAuditEvent) {
        self.push(event);
    }

    fn record_feedback(&self, event: &FeedbackAuditEvent) {
        self.push(event);
    }
}
