// crates/genui-core/src/runtime/resolver.rs
// ============================================================================
// Module: GenUI Reference Resolver
// Description: Substitutes binding references in element props with model values.
// Purpose: Produce the renderable tree plus one diagnostic per unresolved binding.
// Dependencies: crate::{core, runtime::assembler}, serde, serde_json
// ============================================================================

//! ## Overview
//! A binding reference is an object with exactly one member, the marker key
//! (default `$state`), whose value is a pointer path string:
//! `{ "$state": "/tx/table" }`. The resolver walks each element's `props` and
//! `visible` values structurally and replaces every reference with the value
//! found in the state model.
//!
//! A reference that resolves to nothing becomes undefined (the member is
//! omitted from its object, or `null` inside an array) and produces an
//! `unresolved_reference` diagnostic listing a bounded sample of paths that
//! do exist, so the model can see what it should have bound to.
//!
//! Substituted values are never re-scanned, and the declared state is
//! stripped from the output. Resolving the same tree against the same model
//! always yields the same tree and diagnostics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::core::Diagnostic;
use crate::core::DiagnosticKind;
use crate::core::JsonPointer;
use crate::runtime::assembler::StateModel;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default marker key of a binding reference.
pub const DEFAULT_BINDING_MARKER: &str = "$state";
/// Default top-level document key holding the declared state.
pub const DEFAULT_STATE_KEY: &str = "state";
/// Default depth of the available-path sample.
pub const DEFAULT_PATH_SAMPLE_DEPTH: usize = 3;
/// Default size of the available-path sample.
pub const DEFAULT_PATH_SAMPLE_LIMIT: usize = 40;
/// Default maximum nesting depth of a resolved property value.
pub const DEFAULT_MAX_PROP_DEPTH: usize = 64;

/// Element fields that may carry binding references.
const BOUND_FIELDS: [&str; 2] = ["props", "visible"];

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Marker key identifying a binding reference.
    pub marker: String,
    /// Document key holding the declared state, stripped from the output.
    pub state_key: String,
    /// Depth of the available-path sample in diagnostics.
    pub path_sample_depth: usize,
    /// Maximum paths listed in a diagnostic.
    pub path_sample_limit: usize,
    /// Maximum nesting depth of a property value.
    pub max_prop_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_BINDING_MARKER.to_string(),
            state_key: DEFAULT_STATE_KEY.to_string(),
            path_sample_depth: DEFAULT_PATH_SAMPLE_DEPTH,
            path_sample_limit: DEFAULT_PATH_SAMPLE_LIMIT,
            max_prop_depth: DEFAULT_MAX_PROP_DEPTH,
        }
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolved tree plus the diagnostics found while resolving it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSpec {
    /// Tree with references substituted and declared state removed.
    pub spec: Value,
    /// `unresolved_reference` and depth `pipeline_failure` diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolves every binding reference in `document` against `model`.
#[must_use]
pub fn resolve(document: &Value, model: &StateModel, config: &ResolverConfig) -> ResolvedSpec {
    let Value::Object(root) = document else {
        return ResolvedSpec {
            spec: document.clone(),
            diagnostics: Vec::new(),
        };
    };
    let mut output = root.clone();
    output.remove(&config.state_key);
    let mut resolver = Resolver {
        model,
        config,
        available: None,
        diagnostics: Vec::new(),
    };
    if let Some(Value::Object(elements)) = output.get_mut("elements") {
        for (id, element) in elements.iter_mut() {
            resolver.resolve_element(id, element);
        }
    }
    ResolvedSpec {
        spec: Value::Object(output),
        diagnostics: resolver.diagnostics,
    }
}

/// Property value nested deeper than the configured limit.
struct DepthExceeded;

/// Walk state for one resolution.
struct Resolver<'a> {
    /// Model references resolve against.
    model: &'a StateModel,
    /// Settings.
    config: &'a ResolverConfig,
    /// Available-path sample, computed on first use.
    available: Option<Vec<String>>,
    /// Diagnostics collected so far.
    diagnostics: Vec<Diagnostic>,
}

impl Resolver<'_> {
    /// Resolves the bound fields of one element in place.
    ///
    /// An element whose props nest too deeply is left untouched and reported.
    fn resolve_element(&mut self, id: &str, element: &mut Value) {
        let Value::Object(fields) = element else {
            return;
        };
        let mut found = Vec::new();
        let mut resolved = Vec::with_capacity(BOUND_FIELDS.len());
        for field in BOUND_FIELDS {
            let Some(value) = fields.get(field) else {
                continue;
            };
            let mut location = vec![field.to_string()];
            match self.resolve_value(id, value, &mut location, 0, &mut found) {
                Ok(value) => resolved.push((field, value)),
                Err(DepthExceeded) => {
                    self.diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::PipelineFailure,
                            id,
                            format!(
                                "Element \"{id}\" {field} nest deeper than {} levels and were left unresolved",
                                self.config.max_prop_depth
                            ),
                        )
                        .with_detail(json!({ "element": id, "field": field })),
                    );
                    return;
                }
            }
        }
        for (field, value) in resolved {
            match value {
                Some(value) => {
                    fields.insert(field.to_string(), value);
                }
                None => {
                    fields.remove(field);
                }
            }
        }
        self.diagnostics.append(&mut found);
    }

    /// Resolves one value; `None` means undefined.
    fn resolve_value(
        &mut self,
        id: &str,
        value: &Value,
        location: &mut Vec<String>,
        depth: usize,
        found: &mut Vec<Diagnostic>,
    ) -> Result<Option<Value>, DepthExceeded> {
        if depth > self.config.max_prop_depth {
            return Err(DepthExceeded);
        }
        if let Some(path) = self.binding_path(value) {
            if let Some(target) = self.model.get(path) {
                return Ok(Some(target.clone()));
            }
            let diagnostic = self.unresolved(id, path, location);
            found.push(diagnostic);
            return Ok(None);
        }
        match value {
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    location.push(index.to_string());
                    let resolved = self.resolve_value(id, item, location, depth + 1, found);
                    location.pop();
                    out.push(resolved?.unwrap_or(Value::Null));
                }
                Ok(Some(Value::Array(out)))
            }
            Value::Object(members) => {
                let mut out = Map::new();
                for (key, member) in members {
                    location.push(key.clone());
                    let resolved = self.resolve_value(id, member, location, depth + 1, found);
                    location.pop();
                    if let Some(resolved) = resolved? {
                        out.insert(key.clone(), resolved);
                    }
                }
                Ok(Some(Value::Object(out)))
            }
            scalar => Ok(Some(scalar.clone())),
        }
    }

    /// Returns the path of a binding reference, if `value` is one.
    fn binding_path<'v>(&self, value: &'v Value) -> Option<&'v str> {
        let members = value.as_object().filter(|members| members.len() == 1)?;
        members.get(&self.config.marker)?.as_str()
    }

    /// Builds the diagnostic for a reference that resolved to nothing.
    fn unresolved(&mut self, id: &str, path: &str, location: &[String]) -> Diagnostic {
        let model = self.model;
        let config = self.config;
        let available = self.available.get_or_insert_with(|| {
            model.available_paths(config.path_sample_depth, config.path_sample_limit)
        });
        let prop = JsonPointer::from_tokens(location.iter().cloned()).to_string();
        Diagnostic::new(
            DiagnosticKind::UnresolvedReference,
            path,
            format!(
                "Unresolved {} reference \"{path}\" in element \"{id}\" at {prop}",
                config.marker
            ),
        )
        .with_detail(json!({
            "element": id,
            "prop": prop,
            "path": path,
            "availablePaths": available,
        }))
    }
}
