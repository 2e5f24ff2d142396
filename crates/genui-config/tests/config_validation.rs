//! Section validation tests for genui-config.
// crates/genui-config/tests/config_validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Bounds and consistency checks for every config section.
// Purpose: Ensure invalid settings fail the whole load instead of clamping.
// =============================================================================

mod common;

use genui_config::AuditSinkKind;
use genui_config::GenuiConfig;
use genui_config::ShapeRuleConfig;

use crate::common::TestResult;
use crate::common::assert_invalid;
use crate::common::config_from_toml;
use crate::common::minimal_config;

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn empty_file_yields_stock_pipeline() -> TestResult {
    let config = GenuiConfig::from_toml_str("").map_err(|err| err.to_string())?;
    if config != minimal_config() {
        return Err("empty config differs from defaults".to_string());
    }
    let pipeline = config.pipeline_config();
    if pipeline.resolver.marker != "$state" || pipeline.transforms_key != "tx" {
        return Err(format!("unexpected binding keys: {pipeline:?}"));
    }
    if pipeline.shapes.props_for("DataTable") != ["rows", "columns"] {
        return Err("stock shape rules missing".to_string());
    }
    if config.feedback_policy().max_attempts != 2 || !config.feedback_policy().enabled {
        return Err("unexpected feedback defaults".to_string());
    }
    Ok(())
}

#[test]
fn partial_sections_keep_field_defaults() -> TestResult {
    let config = config_from_toml("[diagnostics]\npath_sample_limit = 5\n")?;
    config.validate().map_err(|err| err.to_string())?;
    if config.diagnostics.path_sample_limit != 5 || config.diagnostics.path_sample_depth != 3 {
        return Err(format!("unexpected diagnostics: {:?}", config.diagnostics));
    }
    if config.pipeline_config().resolver.path_sample_limit != 5 {
        return Err("sample limit not carried into pipeline".to_string());
    }
    Ok(())
}

#[test]
fn sandbox_budget_maps_through() -> TestResult {
    let config = GenuiConfig::from_toml_str("[sandbox]\nmax_steps = 500\n")
        .map_err(|err| err.to_string())?;
    if config.sandbox_limits().max_steps != 500 {
        return Err("sandbox budget not applied".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Binding
// ============================================================================

#[test]
fn marker_with_slash_is_rejected() -> TestResult {
    let mut config = minimal_config();
    config.binding.marker = "$a/b".to_string();
    assert_invalid(config.validate(), "binding.marker must not contain")
}

#[test]
fn empty_transforms_key_is_rejected() -> TestResult {
    let mut config = minimal_config();
    config.binding.transforms_key = String::new();
    assert_invalid(config.validate(), "binding.transforms_key must be 1..=64 bytes")
}

#[test]
fn state_key_cannot_shadow_elements() -> TestResult {
    let mut config = minimal_config();
    config.binding.state_key = "elements".to_string();
    assert_invalid(config.validate(), "must not shadow root or elements")
}

#[test]
fn custom_marker_flows_into_pipeline() -> TestResult {
    let config = GenuiConfig::from_toml_str("[binding]\nmarker = \"$bind\"\n")
        .map_err(|err| err.to_string())?;
    if config.pipeline_config().resolver.marker != "$bind" {
        return Err("marker not applied".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Namespaces
// ============================================================================

#[test]
fn colliding_namespaces_are_rejected() -> TestResult {
    let config = config_from_toml("[namespaces]\nstate = \"data\"\ntools = \"data\"\ntransforms = \"tx\"\n")?;
    assert_invalid(config.validate(), "invalid config")
}

#[test]
fn namespace_with_whitespace_is_rejected() -> TestResult {
    let mut config = minimal_config();
    config.namespaces.tools = "my tools".to_string();
    assert_invalid(config.validate(), "namespaces.tools must not contain")
}

// ============================================================================
// SECTION: Diagnostics and Shapes
// ============================================================================

#[test]
fn zero_sample_limit_is_rejected() -> TestResult {
    let mut config = minimal_config();
    config.diagnostics.path_sample_limit = 0;
    assert_invalid(config.validate(), "diagnostics.path_sample_limit must be between 1 and 1000")
}

#[test]
fn prop_depth_above_max_is_rejected() -> TestResult {
    let mut config = minimal_config();
    config.diagnostics.max_prop_depth = 1_025;
    assert_invalid(config.validate(), "diagnostics.max_prop_depth")
}

#[test]
fn custom_shapes_merge_with_stock_rules() -> TestResult {
    let config = GenuiConfig::from_toml_str(
        "[[shapes]]\ncomponent = \"PieChart\"\nprops = [\"colors\", \"data\"]\n\n[[shapes]]\ncomponent = \"Gallery\"\nprops = [\"items\"]\n",
    )
    .map_err(|err| err.to_string())?;
    let shapes = config.pipeline_config().shapes;
    if shapes.props_for("PieChart") != ["data", "colors"] {
        return Err(format!("unexpected PieChart rule: {:?}", shapes.props_for("PieChart")));
    }
    if shapes.props_for("Gallery") != ["items"] {
        return Err("custom rule missing".to_string());
    }
    Ok(())
}

#[test]
fn stock_shapes_can_be_disabled() -> TestResult {
    let mut config = minimal_config();
    config.diagnostics.default_shapes = false;
    config.shapes.push(ShapeRuleConfig {
        component: "Gallery".to_string(),
        props: vec!["items".to_string()],
    });
    config.validate().map_err(|err| err.to_string())?;
    let shapes = config.pipeline_config().shapes;
    if shapes.len() != 1 || !shapes.props_for("DataTable").is_empty() {
        return Err("stock rules were not dropped".to_string());
    }
    Ok(())
}

#[test]
fn shape_rule_without_props_is_rejected() -> TestResult {
    let mut config = minimal_config();
    config.shapes.push(ShapeRuleConfig {
        component: "Gallery".to_string(),
        props: Vec::new(),
    });
    assert_invalid(config.validate(), "shapes.props for Gallery must list")
}

#[test]
fn shape_rule_without_component_is_rejected() -> TestResult {
    let mut config = minimal_config();
    config.shapes.push(ShapeRuleConfig {
        component: " ".to_string(),
        props: vec!["items".to_string()],
    });
    assert_invalid(config.validate(), "shapes.component must be non-empty")
}

// ============================================================================
// SECTION: Sandbox and Feedback
// ============================================================================

#[test]
fn zero_step_budget_is_rejected() -> TestResult {
    let mut config = minimal_config();
    config.sandbox.max_steps = 0;
    assert_invalid(config.validate(), "sandbox.max_steps must be between 1")
}

#[test]
fn zero_call_depth_is_rejected() -> TestResult {
    let mut config = minimal_config();
    config.sandbox.max_call_depth = 0;
    assert_invalid(config.validate(), "sandbox.max_call_depth")
}

#[test]
fn feedback_budget_above_max_is_rejected() -> TestResult {
    let config = config_from_toml("[feedback]\nmax_attempts = 17\n")?;
    assert_invalid(config.validate(), "feedback.max_attempts must be at most 16")
}

#[test]
fn zero_feedback_budget_is_allowed() -> TestResult {
    let config = GenuiConfig::from_toml_str("[feedback]\nmax_attempts = 0\n")
        .map_err(|err| err.to_string())?;
    if config.feedback_policy().max_attempts != 0 {
        return Err("zero budget not kept".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Audit
// ============================================================================

#[test]
fn file_sink_requires_path() -> TestResult {
    let config = config_from_toml("[audit]\nsink = \"file\"\n")?;
    assert_invalid(config.validate(), "audit.path is required for the file sink")
}

#[test]
fn path_without_file_sink_is_rejected() -> TestResult {
    let config = config_from_toml("[audit]\nsink = \"stderr\"\npath = \"audit.jsonl\"\n")?;
    assert_invalid(config.validate(), "audit.path is only valid for the file sink")
}

#[test]
fn stderr_sink_parses() -> TestResult {
    let config = GenuiConfig::from_toml_str("[audit]\nsink = \"stderr\"\n")
        .map_err(|err| err.to_string())?;
    if config.audit.sink != AuditSinkKind::Stderr {
        return Err("sink not parsed".to_string());
    }
    Ok(())
}

#[test]
fn unknown_sink_fails_to_parse() -> TestResult {
    assert_invalid(GenuiConfig::from_toml_str("[audit]\nsink = \"syslog\"\n"), "config parse error")
}
