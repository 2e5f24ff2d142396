// crates/genui-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the CLI.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `genui.toml`. Every value shown is the default except
//! the audit sink and the extra shape rule, so the example doubles as a
//! reference for the available keys.

/// Returns a canonical example `genui.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[binding]
marker = "$state"
state_key = "state"
transforms_key = "tx"

[namespaces]
state = "state"
tools = "tools"
transforms = "tx"

[diagnostics]
path_sample_depth = 3
path_sample_limit = 40
max_prop_depth = 64
default_shapes = true

[sandbox]
max_source_bytes = 65536
max_nesting = 64
max_steps = 1000000
max_depth = 128
max_call_depth = 32
max_string_bytes = 1048576
max_array_len = 100000
max_cache_entries = 1024

[feedback]
enabled = true
max_attempts = 2

[audit]
sink = "file"
path = "genui-audit.jsonl"

[[shapes]]
component = "ScatterChart"
props = ["data"]
"#,
    )
}
