// crates/genui-core/tests/proptest_resolution.rs
// ============================================================================
// Module: Resolution Property-Based Tests
// Description: Pointer escaping, idempotence, and no-panic properties.
// Purpose: Ensure arbitrary trees and paths resolve deterministically.
// ============================================================================

//! Property-based tests for pointer paths and resolution passes.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use genui_core::JsonPointer;
use genui_core::PassInput;
use genui_core::PipelineConfig;
use genui_core::ResolutionPipeline;
use genui_core::StreamPhase;
use genui_core::get_by_path;
use genui_core::parse_message_content;
use genui_script::Sandbox;
use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;

/// Small JSON values with pointer-hostile keys.
fn json_value_strategy(max_depth: u32) -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1_000i64 .. 1_000).prop_map(|v| Value::Number(v.into())),
        "[a-z/~]{0,6}".prop_map(Value::String),
    ];

    leaf.prop_recursive(max_depth, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0 .. 4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z~/]{1,4}", inner, 0 .. 4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Binding paths drawn from a small vocabulary so some resolve.
fn binding_strategy() -> impl Strategy<Value = Value> {
    prop::collection::vec(prop_oneof![Just("state"), Just("tools"), Just("tx"), Just("a"), Just("0")], 0 .. 4)
        .prop_map(|tokens| json!({ "$state": format!("/{}", tokens.join("/")) }))
}

/// Element props mixing literals and bindings.
fn props_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(
        "[a-z]{1,5}",
        prop_oneof![json_value_strategy(2), binding_strategy()],
        0 .. 5,
    )
    .prop_map(|map| Value::Object(map.into_iter().collect()))
}

/// Pipeline with default configuration.
fn pipeline() -> ResolutionPipeline<Sandbox> {
    ResolutionPipeline::new(PipelineConfig::default(), Sandbox::with_defaults()).unwrap()
}

proptest! {
    #[test]
    fn pointer_tokens_round_trip_through_display(tokens in prop::collection::vec("[a-z~/]{0,5}", 0 .. 5)) {
        let pointer = JsonPointer::from_tokens(tokens.clone());
        let reparsed = JsonPointer::parse(&pointer.to_string()).unwrap();
        prop_assert_eq!(reparsed.tokens(), tokens.as_slice());
    }

    #[test]
    fn escaped_keys_are_addressable(key in "[a-z~/]{1,6}", value in json_value_strategy(2)) {
        let mut object = serde_json::Map::new();
        object.insert(key.clone(), value.clone());
        let root = Value::Object(object);
        let path = JsonPointer::from_tokens([key]).to_string();
        prop_assert_eq!(get_by_path(&root, &path), Some(&value));
    }

    #[test]
    fn resolution_is_idempotent(
        props in props_strategy(),
        state in json_value_strategy(3),
        settled in any::<bool>(),
    ) {
        let spec = json!({
            "root": "e",
            "elements": { "e": { "type": "DataTable", "props": props, "children": [] } },
            "state": state,
        });
        let phase = if settled { StreamPhase::Settled } else { StreamPhase::Streaming };
        let pipeline = pipeline();
        let first = pipeline.run(&PassInput::new(&[], &spec, phase));
        let second = pipeline.run(&PassInput::new(&[], &spec, phase));
        prop_assert_eq!(&first, &second);
        prop_assert!(first.spec.get("state").is_none());
    }

    #[test]
    fn arbitrary_documents_never_panic(document in json_value_strategy(4), parts in prop::collection::vec(json_value_strategy(2), 0 .. 3)) {
        let outcome = pipeline().run(&PassInput::new(&parts, &document, StreamPhase::Settled));
        prop_assert!(outcome.digest.is_some());
    }

    #[test]
    fn arbitrary_message_text_never_panics(content in ".{0,200}") {
        let _ = parse_message_content(&content);
    }
}
