// crates/genui-core/tests/pipeline.rs
// ============================================================================
// Module: Resolution Pipeline Tests
// Description: End-to-end resolution passes over parts and element trees.
// Purpose: Validate resolution, gating, failure isolation, and shape checks.
// Dependencies: genui-core, genui-script, serde_json
// ============================================================================

//! ## Overview
//! Drives [`ResolutionPipeline::run`] with realistic message parts and
//! element trees and checks the resolved tree and its diagnostics.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::collections::BTreeMap;

use genui_core::DiagnosticKind;
use genui_core::NamespaceConfig;
use genui_core::PassInput;
use genui_core::PipelineConfig;
use genui_core::PipelineError;
use genui_core::ResolutionPipeline;
use genui_core::StreamPhase;
use genui_core::TransformKey;
use genui_core::TransformStatus;
use genui_script::Sandbox;
use serde_json::Value;
use serde_json::json;

use crate::common::CountingEvaluator;
use crate::common::FAULT_MARKER;
use crate::common::PanickingEvaluator;
use crate::common::TABLE_FN;
use crate::common::pending_quotes_part;
use crate::common::quotes_part;
use crate::common::sandbox_pipeline;
use crate::common::table_spec;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Settled-phase input without prior outputs.
fn settled<'a>(parts: &'a [Value], spec: &'a Value) -> PassInput<'a> {
    PassInput::new(parts, spec, StreamPhase::Settled)
}

/// Bar chart element bound to `binding`.
fn chart_spec(binding: &str) -> Value {
    json!({
        "root": "chart",
        "elements": {
            "chart": {
                "type": "BarChart",
                "props": {
                    "data": { "$state": binding },
                    "xKey": "day",
                    "yKeys": ["count"]
                },
                "children": []
            }
        }
    })
}

/// Completed visits call in the legacy part shape.
fn visits_part() -> Value {
    json!({
        "type": "tool-invocation",
        "toolInvocation": {
            "toolName": "visits",
            "toolCallId": "c1",
            "state": "result",
            "args": {},
            "result": [{ "day": "mon", "count": 3 }]
        }
    })
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// Verifies a bound table resolves to the transformed tool rows.
#[test]
fn table_bound_to_transform_resolves_rows() {
    let parts = vec![quotes_part()];
    let spec = table_spec("/tx/table");
    let outcome = sandbox_pipeline().run(&settled(&parts, &spec));

    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    assert_eq!(outcome.spec["elements"]["t"]["props"]["rows"], json!([{ "sym": "AAPL" }]));
    assert_eq!(outcome.transforms[&TransformKey::new("table")], TransformStatus::Computed);
    assert!(outcome.spec.get("state").is_none());
    assert_eq!(outcome.spec["root"], json!("t"));
}

/// Verifies a typo in a binding yields one diagnostic listing the real path.
#[test]
fn mistyped_binding_lists_available_paths() {
    let parts = vec![quotes_part()];
    let spec = table_spec("/tx/tbl");
    let outcome = sandbox_pipeline().run(&settled(&parts, &spec));

    assert_eq!(outcome.diagnostics.len(), 1);
    let diagnostic = &outcome.diagnostics[0];
    assert_eq!(diagnostic.kind, DiagnosticKind::UnresolvedReference);
    assert_eq!(diagnostic.key, "/tx/tbl");
    let detail = diagnostic.detail.as_ref().expect("detail");
    assert_eq!(detail["element"], json!("t"));
    assert_eq!(detail["prop"], json!("/props/rows"));
    let available = detail["availablePaths"].as_array().expect("paths");
    assert!(available.contains(&json!("/tx/table")));
    assert!(outcome.spec["elements"]["t"]["props"].get("rows").is_none());
}

/// Verifies a chart bound to an array passes shape validation.
#[test]
fn chart_bound_to_array_passes() {
    let parts = vec![visits_part()];
    let spec = chart_spec("/tools/c1");
    let outcome = sandbox_pipeline().run(&settled(&parts, &spec));

    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    assert_eq!(
        outcome.spec["elements"]["chart"]["props"]["data"],
        json!([{ "day": "mon", "count": 3 }])
    );
}

/// Verifies a chart bound to an object yields one shape diagnostic.
#[test]
fn chart_bound_to_object_reports_shape_mismatch() {
    let parts = vec![json!({
        "type": "tool-visits",
        "toolCallId": "c1",
        "state": "output-available",
        "output": { "summary": { "total": 3 }, "data": [] }
    })];
    let spec = chart_spec("/tools/c1/summary");
    let outcome = sandbox_pipeline().run(&settled(&parts, &spec));

    assert_eq!(outcome.diagnostics.len(), 1);
    let diagnostic = &outcome.diagnostics[0];
    assert_eq!(diagnostic.kind, DiagnosticKind::ShapeMismatch);
    assert_eq!(diagnostic.key, "chart.data");
    let detail = diagnostic.detail.as_ref().expect("detail");
    assert_eq!(detail["actualType"], json!("object"));
    assert_eq!(detail["keys"], json!(["total"]));
    assert!(diagnostic.message.contains("append /data"));
}

// ============================================================================
// SECTION: Properties
// ============================================================================

/// Verifies identical inputs yield identical outcomes and digests.
#[test]
fn passes_are_idempotent() {
    let parts = vec![quotes_part()];
    let spec = table_spec("/tx/tbl");
    let pipeline = sandbox_pipeline();
    let first = pipeline.run(&settled(&parts, &spec));
    let second = pipeline.run(&settled(&parts, &spec));

    assert_eq!(first, second);
    assert!(first.digest.is_some());
    assert_eq!(first.digest, second.digest);
}

/// Verifies unresolved bindings are withheld while the stream is open.
#[test]
fn pending_bindings_are_not_errors_while_streaming() {
    let parts = vec![pending_quotes_part()];
    let spec = table_spec("/tx/table");
    let pipeline = sandbox_pipeline();

    let streaming = pipeline.run(&PassInput::new(&parts, &spec, StreamPhase::Streaming));
    assert!(streaming.diagnostics.is_empty());
    assert_eq!(streaming.withheld_references, 1);
    assert_eq!(streaming.active_tool_calls().len(), 1);

    let closed = pipeline.run(&settled(&parts, &spec));
    assert_eq!(closed.diagnostics.len(), 1);
    assert_eq!(closed.diagnostics[0].kind, DiagnosticKind::UnresolvedReference);
    assert_eq!(closed.withheld_references, 0);
}

/// Verifies a tool output is addressable by call id and by tool name.
#[test]
fn tool_results_are_aliased_by_name() {
    let parts = vec![quotes_part()];
    let mut spec = table_spec("/tools/getQuotes/rows");
    spec["elements"]["u"] = json!({
        "type": "DataTable",
        "props": { "rows": { "$state": "/tools/c1/rows" }, "columns": [] },
        "children": []
    });
    let outcome = sandbox_pipeline().run(&settled(&parts, &spec));

    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    assert_eq!(
        outcome.spec["elements"]["t"]["props"]["rows"],
        outcome.spec["elements"]["u"]["props"]["rows"]
    );
}

/// Verifies transforms with undefined dependencies are never evaluated.
#[test]
fn transforms_wait_for_dependencies() {
    let spec = table_spec("/tx/table");
    let pipeline =
        ResolutionPipeline::new(PipelineConfig::default(), CountingEvaluator::default())
            .unwrap();

    let outcome = pipeline.run(&PassInput::new(&[], &spec, StreamPhase::Streaming));
    assert_eq!(pipeline.evaluator().calls.get(), 0);
    assert_eq!(
        outcome.transforms[&TransformKey::new("table")],
        TransformStatus::Pending {
            missing: vec!["/tools/c1/rows".to_string()],
        }
    );
    assert!(outcome.transform_outputs.is_empty());

    let parts = vec![quotes_part()];
    let outcome = pipeline.run(&PassInput::new(&parts, &spec, StreamPhase::Streaming));
    assert_eq!(pipeline.evaluator().calls.get(), 1);
    assert_eq!(outcome.transforms[&TransformKey::new("table")], TransformStatus::Computed);
    assert_eq!(
        outcome.transform_outputs.get(&TransformKey::new("table")),
        Some(&json!([{ "sym": "AAPL" }]))
    );
    assert!(outcome.is_clean(), "{:?}", outcome.diagnostics);
}

/// Verifies a transform over a whole array payload feeds a table end to end.
#[test]
fn search_results_flow_through_a_transform_into_a_table() {
    let parts = vec![json!({
        "type": "tool-search_stocks",
        "toolCallId": "c1",
        "state": "output-available",
        "input": { "query": "tech" },
        "output": [
            { "symbol": "AAPL", "price": 189.125, "change": 1.25 },
            { "symbol": "MSFT", "price": 410.5, "change": -0.5 }
        ]
    })];
    let spec = json!({
        "root": "results",
        "elements": {
            "results": {
                "type": "DataTable",
                "props": {
                    "rows": { "$state": "/tx/rows" },
                    "columns": [
                        { "key": "symbol", "label": "Symbol" },
                        { "key": "price", "label": "Price" },
                        { "key": "trend", "label": "Trend" }
                    ]
                },
                "children": []
            },
            "count": {
                "type": "Text",
                "props": { "text": { "$state": "/tools/search_stocks/1/symbol" } },
                "children": []
            }
        },
        "state": {
            "tx": {
                "rows": {
                    "deps": ["/tools/c1"],
                    "fn": "return arguments[0].map(s => ({ symbol: s.symbol, price: s.price.toFixed(2), trend: s.change > 0 ? 'up' : 'down' }))"
                }
            }
        }
    });
    let outcome = sandbox_pipeline().run(&settled(&parts, &spec));

    assert!(outcome.is_clean(), "{:?}", outcome.diagnostics);
    assert_eq!(outcome.transforms[&TransformKey::new("rows")], TransformStatus::Computed);
    assert_eq!(
        outcome.spec["elements"]["results"]["props"]["rows"],
        json!([
            { "symbol": "AAPL", "price": "189.13", "trend": "up" },
            { "symbol": "MSFT", "price": "410.50", "trend": "down" }
        ])
    );
    assert_eq!(outcome.spec["elements"]["count"]["props"]["text"], json!("MSFT"));
    assert!(outcome.spec.get("state").is_none());
}

/// Verifies one failing transform does not disturb the others.
#[test]
fn transform_failures_are_isolated() {
    let parts = vec![quotes_part()];
    let mut spec = table_spec("/tx/table");
    spec["state"]["tx"]["broken"] =
        json!({ "deps": ["/tools/c1/rows"], "fn": "return arguments[0].nope.map(x => x)" });
    let outcome = sandbox_pipeline().run(&settled(&parts, &spec));

    assert_eq!(outcome.spec["elements"]["t"]["props"]["rows"], json!([{ "sym": "AAPL" }]));
    assert_eq!(outcome.transform_outputs[&TransformKey::new("broken")], Value::Null);
    assert_eq!(outcome.diagnostics.len(), 1);
    let diagnostic = &outcome.diagnostics[0];
    assert_eq!(diagnostic.kind, DiagnosticKind::TransformFailure);
    assert_eq!(diagnostic.key, "broken");
    let detail = diagnostic.detail.as_ref().expect("detail");
    assert_eq!(detail["errorType"], json!("TypeError"));
    assert_eq!(detail["deps"], json!(["/tools/c1/rows"]));
    assert!(matches!(
        outcome.transforms[&TransformKey::new("broken")],
        TransformStatus::Failed { .. }
    ));
}

/// Verifies a binding to a failed transform resolves to null, not undefined.
#[test]
fn failed_transform_binds_as_null() {
    let parts = vec![quotes_part()];
    let mut spec = table_spec("/tx/table");
    spec["state"]["tx"]["table"]["fn"] = json!("throw new Error('boom')");
    let outcome = sandbox_pipeline().run(&settled(&parts, &spec));

    assert_eq!(outcome.spec["elements"]["t"]["props"]["rows"], Value::Null);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::TransformFailure);
}

/// Verifies transforms read prior outputs so chains settle across passes.
#[test]
fn transform_chains_use_prior_outputs() {
    let parts = vec![quotes_part()];
    let mut spec = table_spec("/tx/count");
    spec["state"]["tx"]["count"] = json!({ "deps": ["/tx/table"], "fn": "return arguments[0].length" });
    spec["elements"]["t"]["type"] = json!("Text");
    let pipeline = sandbox_pipeline();

    let first = pipeline.run(&settled(&parts, &spec));
    assert!(matches!(
        first.transforms[&TransformKey::new("count")],
        TransformStatus::Pending { .. }
    ));

    let prior: BTreeMap<TransformKey, Value> = first.transform_outputs.clone();
    let second = pipeline.run(&PassInput {
        parts: &parts,
        spec: &spec,
        phase: StreamPhase::Settled,
        prior_outputs: Some(&prior),
    });
    assert!(second.diagnostics.is_empty(), "{:?}", second.diagnostics);
    assert_eq!(second.spec["elements"]["t"]["props"]["rows"], json!(1));
}

/// Verifies declared state is addressable under its namespace.
#[test]
fn declared_state_is_namespaced() {
    let mut spec = table_spec("/state/title");
    spec["state"]["title"] = json!("Quotes");
    spec["elements"]["t"]["type"] = json!("Heading");
    let outcome = sandbox_pipeline().run(&settled(&[], &spec));

    assert_eq!(outcome.spec["elements"]["t"]["props"]["rows"], json!("Quotes"));
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
}

/// Verifies references inside arrays and visibility flags are resolved.
#[test]
fn resolves_nested_and_visibility_references() {
    let spec = json!({
        "root": "card",
        "elements": {
            "card": {
                "type": "Card",
                "props": {
                    "items": [{ "$state": "/state/a" }, { "$state": "/state/missing" }],
                    "meta": { "label": { "$state": "/state/a" }, "gone": { "$state": "/state/missing" } }
                },
                "visible": { "$state": "/state/show" },
                "children": []
            }
        },
        "state": { "a": 1, "show": false }
    });
    let outcome = sandbox_pipeline().run(&settled(&[], &spec));
    let card = &outcome.spec["elements"]["card"];

    assert_eq!(card["props"]["items"], json!([1, null]));
    assert_eq!(card["props"]["meta"], json!({ "label": 1 }));
    assert_eq!(card["visible"], json!(false));
    assert_eq!(outcome.diagnostics.len(), 2);
    assert!(outcome.diagnostics.iter().all(|d| d.key == "/state/missing"));
}

/// Verifies an object with extra members is a literal, not a reference.
#[test]
fn only_single_member_objects_are_references() {
    let mut spec = table_spec("/tx/table");
    spec["elements"]["t"]["props"]["rows"] = json!({ "$state": "/nope", "extra": true });
    spec["elements"]["t"]["type"] = json!("Card");
    let outcome = sandbox_pipeline().run(&settled(&[], &spec));

    assert_eq!(
        outcome.spec["elements"]["t"]["props"]["rows"],
        json!({ "$state": "/nope", "extra": true })
    );
    assert!(outcome.diagnostics.is_empty());
}

/// Verifies an evaluator panic fails only the transform that caused it.
#[test]
fn evaluator_panics_are_contained_to_one_transform() {
    let parts = vec![quotes_part()];
    let mut spec = table_spec("/tx/good");
    spec["state"]["tx"] = json!({
        "bad": { "deps": ["/tools/c1/rows"], "fn": format!("{FAULT_MARKER} return 1") },
        "good": { "deps": ["/tools/c1/rows"], "fn": TABLE_FN }
    });
    spec["elements"]["b"] = json!({
        "type": "DataTable",
        "props": { "rows": { "$state": "/tx/bad" }, "columns": [] },
        "children": []
    });
    let pipeline =
        ResolutionPipeline::new(PipelineConfig::default(), PanickingEvaluator::default()).unwrap();
    let outcome = pipeline.run(&settled(&parts, &spec));

    assert_eq!(outcome.spec["elements"]["t"]["props"]["rows"], json!([{ "sym": "AAPL" }]));
    assert_eq!(outcome.spec["elements"]["b"]["props"]["rows"], Value::Null);
    assert_eq!(outcome.transforms[&TransformKey::new("good")], TransformStatus::Computed);
    assert!(matches!(
        outcome.transforms[&TransformKey::new("bad")],
        TransformStatus::Failed { .. }
    ));
    assert_eq!(outcome.diagnostics.len(), 1);
    let diagnostic = &outcome.diagnostics[0];
    assert_eq!(diagnostic.kind, DiagnosticKind::TransformFailure);
    assert_eq!(diagnostic.key, "bad");
    let detail = diagnostic.detail.as_ref().expect("detail");
    assert_eq!(detail["failure"], json!("fault"));
    assert!(detail["message"].as_str().unwrap().contains("evaluator fault"));
}

/// Verifies diagnostics are ordered transform, reference, then shape.
#[test]
fn diagnostics_are_ordered_by_stage() {
    let parts = vec![json!({
        "type": "tool-stats",
        "toolCallId": "c1",
        "state": "output-available",
        "output": { "rows": { "a": 1 } }
    })];
    let mut spec = table_spec("/tools/c1/rows");
    spec["state"]["tx"]["table"]["fn"] = json!("return arguments[0].map(x => x)");
    spec["elements"]["u"] = json!({
        "type": "Text",
        "props": { "text": { "$state": "/state/none" } },
        "children": []
    });
    let outcome = sandbox_pipeline().run(&settled(&parts, &spec));
    let kinds = outcome.diagnostics.iter().map(|d| d.kind).collect::<Vec<_>>();

    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::TransformFailure,
            DiagnosticKind::UnresolvedReference,
            DiagnosticKind::ShapeMismatch,
        ]
    );
}

/// Verifies custom namespaces and markers are honored.
#[test]
fn custom_namespaces_and_marker() {
    let mut config = PipelineConfig::default();
    config.resolver.marker = "$bind".to_string();
    config.namespaces = NamespaceConfig {
        state: "vars".to_string(),
        tools: "calls".to_string(),
        transforms: "derived".to_string(),
    };
    let pipeline = ResolutionPipeline::new(config, Sandbox::with_defaults()).unwrap();
    let parts = vec![quotes_part()];
    let mut spec = table_spec("/tx/table");
    spec["elements"]["t"]["props"]["rows"] = json!({ "$bind": "/derived/table" });
    spec["state"]["tx"]["table"]["deps"] = json!(["/calls/c1/rows"]);
    let outcome = pipeline.run(&settled(&parts, &spec));

    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    assert_eq!(outcome.spec["elements"]["t"]["props"]["rows"], json!([{ "sym": "AAPL" }]));
}

/// Verifies invalid configurations are rejected at construction.
#[test]
fn rejects_colliding_namespaces() {
    let mut config = PipelineConfig::default();
    config.namespaces.tools = "state".to_string();
    let result = ResolutionPipeline::new(config, Sandbox::with_defaults());

    assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
}
