// crates/genui-core/src/runtime/validator.rs
// ============================================================================
// Module: GenUI Prop-Shape Validator
// Description: Checks that list-shaped component props resolved to lists.
// Purpose: Catch bindings to an object where its nested array was intended.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! The most common binding mistake is pointing a table or chart at a whole
//! tool payload object instead of the array inside it. After resolution,
//! each element whose component appears in the [`ShapeTable`] has its
//! list-shaped props checked. A prop that is present, non-null, and not an
//! array yields one `shape_mismatch` diagnostic naming the element, the
//! prop, the actual type, and for objects the key set. Absent props are the
//! component's own loading concern and are not flagged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::core::Diagnostic;
use crate::core::DiagnosticKind;

// ============================================================================
// SECTION: Shape Table
// ============================================================================

/// Components and the props that must resolve to lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeTable {
    /// List-shaped prop names by component type.
    rules: BTreeMap<String, Vec<String>>,
}

impl Default for ShapeTable {
    fn default() -> Self {
        let rule = |component: &str, props: &[&str]| {
            (component.to_string(), props.iter().map(|prop| (*prop).to_string()).collect::<Vec<_>>())
        };
        Self {
            rules: BTreeMap::from([
                rule("DataTable", &["rows", "columns"]),
                rule("BarChart", &["data", "yKeys", "colors"]),
                rule("LineChart", &["data", "yKeys", "colors"]),
                rule("PieChart", &["data"]),
            ]),
        }
    }
}

impl ShapeTable {
    /// Creates a table with no rules.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Adds list-shaped props for a component, merging with existing ones.
    pub fn add_rule<I, S>(&mut self, component: impl Into<String>, props: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.rules.entry(component.into()).or_default();
        for prop in props {
            let prop = prop.into();
            if !entry.contains(&prop) {
                entry.push(prop);
            }
        }
    }

    /// Returns the list-shaped props of a component.
    #[must_use]
    pub fn props_for(&self, component: &str) -> &[String] {
        self.rules.get(component).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the number of components covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true when no component is covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Checks every element of a resolved tree against the shape table.
///
/// `marker` names the binding marker in the suggested fix.
#[must_use]
pub fn validate(resolved: &Value, table: &ShapeTable, marker: &str) -> Vec<Diagnostic> {
    let Some(elements) = resolved.get("elements").and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut diagnostics = Vec::new();
    for (id, element) in elements {
        let Some(component) = element.get("type").and_then(Value::as_str) else {
            continue;
        };
        let Some(props) = element.get("props").and_then(Value::as_object) else {
            continue;
        };
        for prop in table.props_for(component) {
            let Some(value) = props.get(prop) else {
                continue;
            };
            if value.is_null() || value.is_array() {
                continue;
            }
            diagnostics.push(mismatch(id, component, prop, value, marker));
        }
    }
    diagnostics
}

/// Builds one `shape_mismatch` diagnostic.
fn mismatch(id: &str, component: &str, prop: &str, value: &Value, marker: &str) -> Diagnostic {
    let actual = type_name(value);
    let keys = value.as_object().map(|members| members.keys().cloned().collect::<Vec<_>>());
    let key_clause = keys.as_ref().map_or_else(String::new, |keys| format!(", with keys: [{}]", keys.join(", ")));
    Diagnostic::new(
        DiagnosticKind::ShapeMismatch,
        format!("{id}.{prop}"),
        format!(
            "{component} \"{id}\": expected an array for {prop}, got {actual}{key_clause}. \
             Use a deeper {marker} path (e.g. append /data) or a transform."
        ),
    )
    .with_detail(json!({
        "element": id,
        "component": component,
        "prop": prop,
        "actualType": actual,
        "keys": keys,
    }))
}

/// Script-style type name of a JSON value.
const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null | Value::Object(_) => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
    }
}
