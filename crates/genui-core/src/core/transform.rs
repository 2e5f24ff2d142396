// crates/genui-core/src/core/transform.rs
// ============================================================================
// Module: GenUI Transform Types
// Description: Transform definitions, per-pass outputs, and evaluation status.
// Purpose: Describe model-declared derived values and what became of them.
// Dependencies: crate::core::{diagnostic, identifiers}, serde, serde_json
// ============================================================================

//! ## Overview
//! A transform is `{ "deps": [pointer, ...], "fn": "<function body>" }`
//! declared in the state tree. Each pass it yields one of three outputs:
//! a value, nothing (a dependency is still pending), or the `null` sentinel
//! (evaluation failed and a diagnostic explains why).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::diagnostic::Diagnostic;
use crate::core::identifiers::TransformKey;

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// Declared transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformDef {
    /// Dependency pointer paths, bound in order as `arguments[0..n]`.
    pub deps: Vec<String>,
    /// Function body source.
    #[serde(rename = "fn")]
    pub source: String,
}

// ============================================================================
// SECTION: Outputs
// ============================================================================

/// What happened to one transform in a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransformStatus {
    /// The body ran and returned.
    Computed,
    /// Evaluation skipped; these dependencies are still undefined.
    Pending {
        /// Dependency paths that resolved to nothing.
        missing: Vec<String>,
    },
    /// The body failed to parse or threw.
    Failed {
        /// Failure message.
        message: String,
    },
}

impl TransformStatus {
    /// Returns the status label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Computed => "computed",
            Self::Pending {
                ..
            } => "pending",
            Self::Failed {
                ..
            } => "failed",
        }
    }
}

/// Transform results for one pass.
///
/// # Invariants
/// - `outputs` holds only defined values; a failed transform maps to `null`.
/// - Every definition has exactly one entry in `statuses`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutputs {
    /// Defined outputs by key.
    pub outputs: BTreeMap<TransformKey, Value>,
    /// Status by key.
    pub statuses: BTreeMap<TransformKey, TransformStatus>,
    /// One `transform_failure` diagnostic per failed transform.
    pub diagnostics: Vec<Diagnostic>,
}

impl TransformOutputs {
    /// Returns the output of a transform; `None` means undefined.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.outputs.get(&TransformKey::new(key))
    }

    /// Returns the outputs as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.outputs
                .iter()
                .map(|(key, value)| (key.as_str().to_string(), value.clone()))
                .collect(),
        )
    }
}
