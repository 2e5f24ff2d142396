// crates/genui-core/src/core/spec.rs
// ============================================================================
// Module: GenUI Element Tree
// Description: Patch operations, the mutable element document, and a typed view.
// Purpose: Build the element tree incrementally from streamed patch operations.
// Dependencies: crate::core::{identifiers, pointer}, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The element tree arrives as a stream of patch operations applied in place
//! to a [`SpecDocument`]. There is no committed or draft copy: the latest
//! patched value is the current tree. The document stays untyped JSON so
//! partially streamed elements never fail to load; [`Spec`] is a lenient
//! typed view that skips elements which do not (yet) have a usable shape.
//!
//! Document layout:
//! - `root`: identifier of the root element.
//! - `elements`: map from element identifier to `{ type, props, children, visible? }`.
//! - `state`: declared state, including transform definitions under `tx`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::ElementId;
use crate::core::pointer::JsonPointer;
use crate::core::pointer::PointerError;
use crate::core::pointer::SetMode;
use crate::core::pointer::remove_by_path;
use crate::core::pointer::set_by_path;

// ============================================================================
// SECTION: Patches
// ============================================================================

/// Patch operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Insert or set a value.
    Add,
    /// Overwrite a value.
    Replace,
    /// Delete a value.
    Remove,
}

impl PatchOp {
    /// Returns the wire name of the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Replace => "replace",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element tree patch, matching the JSONL wire form
/// `{"op":"add","path":"/elements/t","value":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecPatch {
    /// Operation kind.
    pub op: PatchOp,
    /// Target pointer path.
    pub path: String,
    /// New value for `add` and `replace`; an explicit `null` is `Some`.
    #[serde(default, deserialize_with = "present_value", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Deserializes a present member as `Some`, including `null`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Errors raised when applying a patch.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// The target path is malformed or cannot be reached.
    #[error("patch path error: {0}")]
    Path(#[from] PointerError),
    /// `add` or `replace` arrived without a value.
    #[error("{op} patch at {path} has no value")]
    MissingValue {
        /// Operation kind.
        op: PatchOp,
        /// Target path.
        path: String,
    },
}

// ============================================================================
// SECTION: Document
// ============================================================================

/// Mutable element tree document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecDocument {
    /// Current document value.
    value: Value,
}

impl SpecDocument {
    /// Creates an empty document with no root and no elements.
    #[must_use]
    pub fn new() -> Self {
        let mut value = Map::new();
        value.insert("root".to_string(), Value::String(String::new()));
        value.insert("elements".to_string(), Value::Object(Map::new()));
        Self {
            value: Value::Object(value),
        }
    }

    /// Wraps an existing document value.
    #[must_use]
    pub const fn from_value(value: Value) -> Self {
        Self {
            value,
        }
    }

    /// Returns the current document value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the document, returning its value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Returns true once a non-empty root identifier has been set.
    #[must_use]
    pub fn has_root(&self) -> bool {
        self.value.get("root").and_then(Value::as_str).is_some_and(|root| !root.is_empty())
    }

    /// Applies one patch in place.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError`] when the path is malformed or unreachable, when
    /// a `remove` targets a missing value, or when a value is missing.
    pub fn apply(&mut self, patch: &SpecPatch) -> Result<(), PatchError> {
        let pointer = JsonPointer::parse(&patch.path)?;
        match patch.op {
            PatchOp::Add | PatchOp::Replace => {
                let value = patch.value.clone().ok_or_else(|| PatchError::MissingValue {
                    op: patch.op,
                    path: patch.path.clone(),
                })?;
                let mode =
                    if patch.op == PatchOp::Add { SetMode::Insert } else { SetMode::Overwrite };
                set_by_path(&mut self.value, &pointer, value, mode)?;
            }
            PatchOp::Remove => {
                remove_by_path(&mut self.value, &pointer)?;
            }
        }
        Ok(())
    }
}

impl Default for SpecDocument {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Typed View
// ============================================================================

/// One element of the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Component type tag from the catalog.
    #[serde(rename = "type", default)]
    pub component: String,
    /// Property bag; values may be literals or binding references.
    #[serde(default)]
    pub props: Map<String, Value>,
    /// Ordered child identifiers.
    #[serde(default)]
    pub children: Vec<ElementId>,
    /// Optional visibility flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<Value>,
}

/// Lenient typed view of an element document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spec {
    /// Root element identifier, when set.
    pub root: Option<ElementId>,
    /// Elements that have a usable shape.
    pub elements: BTreeMap<ElementId, Element>,
    /// Declared state, when present.
    pub state: Option<Value>,
}

impl Spec {
    /// Builds the typed view, skipping elements that fail to deserialize.
    #[must_use]
    pub fn from_document(document: &Value, state_key: &str) -> Self {
        let root = document
            .get("root")
            .and_then(Value::as_str)
            .filter(|root| !root.is_empty())
            .map(ElementId::new);
        let elements = document
            .get("elements")
            .and_then(Value::as_object)
            .map(|elements| {
                elements
                    .iter()
                    .filter_map(|(id, element)| {
                        serde_json::from_value::<Element>(element.clone())
                            .ok()
                            .map(|element| (ElementId::new(id.clone()), element))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            root,
            elements,
            state: document.get(state_key).cloned(),
        }
    }

    /// Lists `(parent, child)` pairs whose child has not arrived yet.
    ///
    /// Dangling children are normal while the tree is still streaming.
    #[must_use]
    pub fn dangling_children(&self) -> Vec<(ElementId, ElementId)> {
        self.elements
            .iter()
            .flat_map(|(parent, element)| {
                element
                    .children
                    .iter()
                    .filter(|child| !self.elements.contains_key(*child))
                    .map(|child| (parent.clone(), child.clone()))
            })
            .collect()
    }
}
