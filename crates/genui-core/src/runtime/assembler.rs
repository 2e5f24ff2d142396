// crates/genui-core/src/runtime/assembler.rs
// ============================================================================
// Module: GenUI State Model Assembler
// Description: Merges declared state, tool results, and transform outputs.
// Purpose: Build the single addressable tree that bindings resolve against.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! The state model is rebuilt from scratch every pass with exactly three
//! top-level namespaces:
//!
//! | Namespace (default) | Contents |
//! |---|---|
//! | `/state` | declared raw state, as streamed |
//! | `/tools` | tool outputs by call identifier and by tool name |
//! | `/tx`    | transform outputs by key |
//!
//! Assembly is pure and copies its inputs, so the resolver can never mutate
//! the sources it reads from.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::ToolResults;
use crate::core::TransformKey;
use crate::core::available_paths;
use crate::core::get_by_path;

// ============================================================================
// SECTION: Namespaces
// ============================================================================

/// Top-level namespace names of the state model.
///
/// # Invariants
/// - Names are non-empty and pairwise distinct after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Namespace holding the declared raw state.
    pub state: String,
    /// Namespace holding tool outputs.
    pub tools: String,
    /// Namespace holding transform outputs.
    pub transforms: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            state: "state".to_string(),
            tools: "tools".to_string(),
            transforms: "tx".to_string(),
        }
    }
}

impl NamespaceConfig {
    /// Returns the namespace names in model order.
    #[must_use]
    pub fn names(&self) -> [&str; 3] {
        [&self.state, &self.tools, &self.transforms]
    }
}

// ============================================================================
// SECTION: State Model
// ============================================================================

/// Read-only tree that binding references resolve against.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StateModel {
    /// Assembled tree.
    tree: Value,
}

impl StateModel {
    /// Looks up a pointer path; `None` means undefined.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_by_path(&self.tree, path)
    }

    /// Returns the assembled tree.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.tree
    }

    /// Lists available paths breadth-first (see [`available_paths`]).
    #[must_use]
    pub fn available_paths(&self, max_depth: usize, limit: usize) -> Vec<String> {
        available_paths(&self.tree, max_depth, limit)
    }
}

/// Assembles the state model for one pass.
#[must_use]
pub fn assemble(
    tool_results: &ToolResults,
    declared_state: Option<&Value>,
    transform_outputs: &BTreeMap<TransformKey, Value>,
    namespaces: &NamespaceConfig,
) -> StateModel {
    let transforms = transform_outputs
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), value.clone()))
        .collect::<Map<_, _>>();
    let mut tree = Map::new();
    tree.insert(
        namespaces.state.clone(),
        declared_state.cloned().unwrap_or_else(|| Value::Object(Map::new())),
    );
    tree.insert(namespaces.tools.clone(), tool_results.to_value());
    tree.insert(namespaces.transforms.clone(), Value::Object(transforms));
    StateModel {
        tree: Value::Object(tree),
    }
}
