// crates/genui-core/src/interfaces/mod.rs
// ============================================================================
// Module: GenUI Interfaces
// Description: Pluggable transform evaluation and audit sink contracts.
// Purpose: Keep the pipeline independent of a specific script engine or log target.
// Dependencies: crate::core, genui-script, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The pipeline depends only on these traits. [`genui_script::Sandbox`] is
//! the stock [`TransformEvaluator`]; tests and embedders may supply their
//! own. Audit sinks receive structured events and must never fail the pass.
//!
//! Security posture: transform bodies are model-authored and effectively
//! untrusted code. Evaluators must isolate failures and must not expose host
//! state to the script.

// ============================================================================
// SECTION: Imports
// ============================================================================

use genui_script::EvalError;
use genui_script::EvalErrorKind;
use genui_script::Sandbox;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::FeedbackAuditEvent;
use crate::core::PassAuditEvent;
use crate::core::TransformAuditEvent;

// ============================================================================
// SECTION: Transform Evaluator
// ============================================================================

/// Classification of a transform failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformErrorKind {
    /// The body could not be parsed.
    Syntax,
    /// The body raised an error while running.
    Runtime,
    /// An evaluation budget was exhausted.
    Limit,
    /// The evaluator itself broke (for example, it panicked).
    Fault,
}

/// Transform evaluation failure.
///
/// # Invariants
/// - `line` and `column` are 1-based positions within the transform body.
/// - `stack` lists the innermost frame first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{name}: {message}")]
pub struct TransformError {
    /// Failure classification.
    pub kind: TransformErrorKind,
    /// Script-visible error name (`TypeError`, `SyntaxError`, ...).
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Line of the failing construct.
    pub line: usize,
    /// Column of the failing construct.
    pub column: usize,
    /// Call frames active when the error was raised.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack: Vec<String>,
}

impl TransformError {
    /// Creates a runtime failure at the start of the body.
    #[must_use]
    pub fn runtime(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: TransformErrorKind::Runtime,
            name: name.into(),
            message: message.into(),
            line: 1,
            column: 1,
            stack: Vec::new(),
        }
    }

    /// Creates a failure for an evaluator that broke instead of answering.
    #[must_use]
    pub fn fault(message: impl Into<String>) -> Self {
        Self {
            kind: TransformErrorKind::Fault,
            ..Self::runtime("InternalError", message)
        }
    }

    /// Converts a sandbox error raised while evaluating `source`.
    #[must_use]
    pub fn from_eval(error: EvalError, source: &str) -> Self {
        let (line, column) = error.line_column(source);
        let kind = match error.kind {
            EvalErrorKind::Syntax => TransformErrorKind::Syntax,
            EvalErrorKind::Runtime => TransformErrorKind::Runtime,
            EvalErrorKind::Limit => TransformErrorKind::Limit,
        };
        Self {
            kind,
            name: error.name,
            message: error.message,
            line,
            column,
            stack: error.stack,
        }
    }
}

/// Runs a transform body against positional JSON arguments.
pub trait TransformEvaluator {
    /// Evaluates `source` with `args` bound as `arguments[0..n]`.
    ///
    /// Returns `Ok(None)` when the body produces no value.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] for syntax errors, thrown exceptions, and
    /// exhausted budgets. Implementations should not panic on bad input; a
    /// panic is contained to the transform that caused it.
    fn evaluate(&self, source: &str, args: &[Value]) -> Result<Option<Value>, TransformError>;
}

impl TransformEvaluator for Sandbox {
    fn evaluate(&self, source: &str, args: &[Value]) -> Result<Option<Value>, TransformError> {
        Self::evaluate(self, source, args).map_err(|error| TransformError::from_eval(error, source))
    }
}

impl<T: TransformEvaluator + ?Sized> TransformEvaluator for &T {
    fn evaluate(&self, source: &str, args: &[Value]) -> Result<Option<Value>, TransformError> {
        (**self).evaluate(source, args)
    }
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Receives structured pipeline audit events.
pub trait AuditSink: Send + Sync {
    /// Records a completed resolution pass.
    fn record_pass(&self, event: &PassAuditEvent);

    /// Records the fate of one transform.
    fn record_transform(&self, _event: &TransformAuditEvent) {}

    /// Records a feedback decision.
    fn record_feedback(&self, _event: &FeedbackAuditEvent) {}
}
