// crates/genui-core/src/runtime/transforms.rs
// ============================================================================
// Module: GenUI Transform Registry
// Description: Extracts transform definitions and evaluates them once per pass.
// Purpose: Turn declared transforms into outputs, pending markers, or failures.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! Definitions live in the declared state under a reserved key (default
//! `tx`). Anything there that is not `{ deps: string[], fn: string }` is
//! ignored, so the model may keep other data alongside.
//!
//! Each definition resolves its dependencies against the state model. If any
//! dependency is undefined the transform is pending: no evaluation, no
//! output, no diagnostic. Otherwise the body runs through the evaluator; a
//! failure yields the `null` sentinel plus one `transform_failure`
//! diagnostic carrying the key, source, dependencies, and stack. An
//! evaluator that panics fails only the transform it was running.
//!
//! Definitions are visited in key order, but no transform sees another's
//! output from the same pass: a chain settles over successive passes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;

use serde_json::Value;
use serde_json::json;

use crate::core::Diagnostic;
use crate::core::DiagnosticKind;
use crate::core::TransformDef;
use crate::core::TransformKey;
use crate::core::TransformOutputs;
use crate::core::TransformStatus;
use crate::core::get_by_path;
use crate::interfaces::TransformError;
use crate::interfaces::TransformEvaluator;

/// Default reserved key holding transform definitions in the declared state.
pub const DEFAULT_TRANSFORMS_KEY: &str = "tx";

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Extracts well-formed transform definitions from the declared state.
#[must_use]
pub fn extract_definitions(
    declared_state: Option<&Value>,
    transforms_key: &str,
) -> BTreeMap<TransformKey, TransformDef> {
    let Some(entries) =
        declared_state.and_then(|state| state.get(transforms_key)).and_then(Value::as_object)
    else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|(key, value)| {
            parse_definition(value).map(|def| (TransformKey::new(key.clone()), def))
        })
        .collect()
}

/// Accepts exactly `{ deps: string[], fn: string }`; extra members are ignored.
fn parse_definition(value: &Value) -> Option<TransformDef> {
    let object = value.as_object()?;
    let deps = object
        .get("deps")?
        .as_array()?
        .iter()
        .map(|dep| dep.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()?;
    let source = object.get("fn")?.as_str()?.to_string();
    Some(TransformDef {
        deps,
        source,
    })
}

// ============================================================================
// SECTION: Computation
// ============================================================================

/// Computes every transform against `model`.
#[must_use]
pub fn compute_all<E: TransformEvaluator + ?Sized>(
    defs: &BTreeMap<TransformKey, TransformDef>,
    model: &Value,
    evaluator: &E,
) -> TransformOutputs {
    let mut result = TransformOutputs::default();
    for (key, def) in defs {
        let mut args = Vec::with_capacity(def.deps.len());
        let mut missing = Vec::new();
        for dep in &def.deps {
            match get_by_path(model, dep) {
                Some(value) => args.push(value.clone()),
                None => missing.push(dep.clone()),
            }
        }
        if !missing.is_empty() {
            result.statuses.insert(
                key.clone(),
                TransformStatus::Pending {
                    missing,
                },
            );
            continue;
        }
        let evaluated = catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(&def.source, &args)))
            .unwrap_or_else(|payload| Err(TransformError::fault(panic_message(payload.as_ref()))));
        match evaluated {
            Ok(output) => {
                if let Some(value) = output {
                    result.outputs.insert(key.clone(), value);
                }
                result.statuses.insert(key.clone(), TransformStatus::Computed);
            }
            Err(error) => {
                result.outputs.insert(key.clone(), Value::Null);
                result.statuses.insert(
                    key.clone(),
                    TransformStatus::Failed {
                        message: error.to_string(),
                    },
                );
                result.diagnostics.push(failure_diagnostic(key, def, &error));
            }
        }
    }
    result
}

/// Describes a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("no message");
    format!("evaluator panicked: {detail}")
}

/// Builds the diagnostic for a failed transform.
fn failure_diagnostic(key: &TransformKey, def: &TransformDef, error: &TransformError) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::TransformFailure,
        key.as_str(),
        format!("Transform \"{key}\" failed: {error}"),
    )
    .with_detail(json!({
        "transform": key.as_str(),
        "errorType": error.name,
        "failure": error.kind,
        "message": error.message,
        "line": error.line,
        "column": error.column,
        "stack": error.stack,
        "deps": def.deps,
        "source": def.source,
    }))
}
