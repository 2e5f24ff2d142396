// crates/genui-core/src/core/diagnostic.rs
// ============================================================================
// Module: GenUI Diagnostics
// Description: Tagged diagnostic records produced by one resolution pass.
// Purpose: Report binding, transform, and shape problems in a self-correcting form.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Diagnostics are pure output of a resolution pass: never persisted and
//! recomputed from scratch each pass. Each carries enough detail (available
//! paths, function source, key sets) for the model to correct itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Diagnostic Kind
// ============================================================================

/// Diagnostic classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A binding path resolved to nothing after streaming settled.
    UnresolvedReference,
    /// A transform body failed to parse or threw.
    TransformFailure,
    /// A resolved prop has the wrong structural shape for its component.
    ShapeMismatch,
    /// An unexpected failure inside the pass itself.
    PipelineFailure,
}

impl DiagnosticKind {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnresolvedReference => "unresolved_reference",
            Self::TransformFailure => "transform_failure",
            Self::ShapeMismatch => "shape_mismatch",
            Self::PipelineFailure => "pipeline_failure",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Diagnostic
// ============================================================================

/// One problem found during a resolution pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Classification.
    pub kind: DiagnosticKind,
    /// Offending path, transform key, or element prop.
    pub key: String,
    /// Human-readable message.
    pub message: String,
    /// Structured extra detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl Diagnostic {
    /// Creates a diagnostic without detail.
    #[must_use]
    pub fn new(kind: DiagnosticKind, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            message: message.into(),
            detail: None,
        }
    }

    /// Attaches structured detail.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}
