// crates/genui-config/src/config.rs
// ============================================================================
// Module: GenUI Configuration
// Description: Configuration loading and validation for genui.toml.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: genui-core, genui-script, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional; an empty file yields the stock pipeline. Any
//! value outside its bounds fails the whole load rather than being clamped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use genui_core::FeedbackPolicy;
use genui_core::NamespaceConfig;
use genui_core::PipelineConfig;
use genui_core::ResolverConfig;
use genui_core::ShapeTable;
use genui_core::runtime::resolver::DEFAULT_BINDING_MARKER;
use genui_core::runtime::resolver::DEFAULT_MAX_PROP_DEPTH;
use genui_core::runtime::resolver::DEFAULT_PATH_SAMPLE_DEPTH;
use genui_core::runtime::resolver::DEFAULT_PATH_SAMPLE_LIMIT;
use genui_core::runtime::resolver::DEFAULT_STATE_KEY;
use genui_core::runtime::transforms::DEFAULT_TRANSFORMS_KEY;
use genui_script::SandboxLimits;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "genui.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "GENUI_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a binding marker or reserved key.
pub(crate) const MAX_KEY_LENGTH: usize = 64;
/// Maximum available-path sample depth.
pub(crate) const MAX_PATH_SAMPLE_DEPTH: usize = 16;
/// Maximum available-path sample size.
pub(crate) const MAX_PATH_SAMPLE_LIMIT: usize = 1_000;
/// Maximum resolved prop nesting depth.
pub(crate) const MAX_PROP_DEPTH: usize = 1_024;
/// Maximum shape rules.
pub(crate) const MAX_SHAPE_RULES: usize = 256;
/// Maximum list-shaped props per rule.
pub(crate) const MAX_SHAPE_PROPS: usize = 64;
/// Maximum feedback attempts per session.
pub(crate) const MAX_FEEDBACK_ATTEMPTS: u32 = 16;
/// Maximum sandbox step budget.
pub(crate) const MAX_SANDBOX_STEPS: u64 = 100_000_000;
/// Maximum sandbox source size in bytes.
pub(crate) const MAX_SANDBOX_SOURCE_BYTES: usize = 1024 * 1024;
/// Maximum sandbox string or array size.
pub(crate) const MAX_SANDBOX_ALLOCATION: usize = 64 * 1024 * 1024;
/// Maximum sandbox nesting, recursion, or call depth.
pub(crate) const MAX_SANDBOX_DEPTH: usize = 4_096;
/// Maximum compiled-source cache entries.
pub(crate) const MAX_SANDBOX_CACHE_ENTRIES: usize = 65_536;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Root configuration for the GenUI resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenuiConfig {
    /// Binding syntax and reserved document keys.
    #[serde(default)]
    pub binding: BindingConfig,
    /// State model namespace names.
    #[serde(default)]
    pub namespaces: NamespaceConfig,
    /// Diagnostic sampling and shape table settings.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    /// Transform sandbox budgets.
    #[serde(default)]
    pub sandbox: SandboxLimits,
    /// Correction request budget.
    #[serde(default)]
    pub feedback: FeedbackPolicy,
    /// Audit sink selection.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Extra list-shaped props by component.
    #[serde(default)]
    pub shapes: Vec<ShapeRuleConfig>,
}

impl GenuiConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path comes from `path`, else the `GENUI_CONFIG` environment
    /// variable, else `genui.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.binding.validate()?;
        validate_namespaces(&self.namespaces)?;
        self.diagnostics.validate()?;
        validate_sandbox(&self.sandbox)?;
        validate_feedback(self.feedback)?;
        self.audit.validate()?;
        if self.shapes.len() > MAX_SHAPE_RULES {
            return Err(ConfigError::Invalid("shapes exceeds max rules".to_string()));
        }
        for rule in &self.shapes {
            rule.validate()?;
        }
        self.pipeline_config()
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Builds the pipeline configuration.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut shapes =
            if self.diagnostics.default_shapes { ShapeTable::default() } else { ShapeTable::empty() };
        for rule in &self.shapes {
            shapes.add_rule(rule.component.clone(), rule.props.iter().cloned());
        }
        PipelineConfig {
            resolver: ResolverConfig {
                marker: self.binding.marker.clone(),
                state_key: self.binding.state_key.clone(),
                path_sample_depth: self.diagnostics.path_sample_depth,
                path_sample_limit: self.diagnostics.path_sample_limit,
                max_prop_depth: self.diagnostics.max_prop_depth,
            },
            namespaces: self.namespaces.clone(),
            transforms_key: self.binding.transforms_key.clone(),
            shapes,
        }
    }

    /// Returns the sandbox budgets.
    #[must_use]
    pub fn sandbox_limits(&self) -> SandboxLimits {
        self.sandbox.clone()
    }

    /// Returns the feedback policy.
    #[must_use]
    pub const fn feedback_policy(&self) -> FeedbackPolicy {
        self.feedback
    }
}

// ============================================================================
// SECTION: Binding
// ============================================================================

/// Binding syntax and reserved keys of the element document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Marker key identifying a binding reference.
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Document key holding the declared state.
    #[serde(default = "default_state_key")]
    pub state_key: String,
    /// Declared-state key holding transform definitions.
    #[serde(default = "default_transforms_key")]
    pub transforms_key: String,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            state_key: default_state_key(),
            transforms_key: default_transforms_key(),
        }
    }
}

impl BindingConfig {
    /// Validates binding keys.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_key("binding.marker", &self.marker)?;
        validate_key("binding.state_key", &self.state_key)?;
        validate_key("binding.transforms_key", &self.transforms_key)?;
        if matches!(self.state_key.as_str(), "root" | "elements") {
            return Err(ConfigError::Invalid(
                "binding.state_key must not shadow root or elements".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default binding marker.
fn default_marker() -> String {
    DEFAULT_BINDING_MARKER.to_string()
}

/// Default declared-state key.
fn default_state_key() -> String {
    DEFAULT_STATE_KEY.to_string()
}

/// Default transforms key.
fn default_transforms_key() -> String {
    DEFAULT_TRANSFORMS_KEY.to_string()
}

// ============================================================================
// SECTION: Diagnostics
// ============================================================================

/// Diagnostic sampling and shape table settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Depth of the available-path sample.
    #[serde(default = "default_path_sample_depth")]
    pub path_sample_depth: usize,
    /// Maximum paths listed in an unresolved-reference diagnostic.
    #[serde(default = "default_path_sample_limit")]
    pub path_sample_limit: usize,
    /// Maximum nesting depth of a resolved prop value.
    #[serde(default = "default_max_prop_depth")]
    pub max_prop_depth: usize,
    /// Start from the stock chart and table shape rules.
    #[serde(default = "default_shapes_enabled")]
    pub default_shapes: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            path_sample_depth: default_path_sample_depth(),
            path_sample_limit: default_path_sample_limit(),
            max_prop_depth: default_max_prop_depth(),
            default_shapes: default_shapes_enabled(),
        }
    }
}

impl DiagnosticsConfig {
    /// Validates sampling bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range("diagnostics.path_sample_depth", self.path_sample_depth, MAX_PATH_SAMPLE_DEPTH)?;
        validate_range("diagnostics.path_sample_limit", self.path_sample_limit, MAX_PATH_SAMPLE_LIMIT)?;
        validate_range("diagnostics.max_prop_depth", self.max_prop_depth, MAX_PROP_DEPTH)
    }
}

/// Default available-path sample depth.
const fn default_path_sample_depth() -> usize {
    DEFAULT_PATH_SAMPLE_DEPTH
}

/// Default available-path sample size.
const fn default_path_sample_limit() -> usize {
    DEFAULT_PATH_SAMPLE_LIMIT
}

/// Default maximum prop depth.
const fn default_max_prop_depth() -> usize {
    DEFAULT_MAX_PROP_DEPTH
}

/// Stock shape rules are on by default.
const fn default_shapes_enabled() -> bool {
    true
}

// ============================================================================
// SECTION: Shapes
// ============================================================================

/// Extra list-shaped props for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeRuleConfig {
    /// Component type tag.
    pub component: String,
    /// Props that must resolve to lists.
    pub props: Vec<String>,
}

impl ShapeRuleConfig {
    /// Validates one rule.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.component.trim().is_empty() {
            return Err(ConfigError::Invalid("shapes.component must be non-empty".to_string()));
        }
        if self.props.is_empty() || self.props.len() > MAX_SHAPE_PROPS {
            return Err(ConfigError::Invalid(format!(
                "shapes.props for {} must list 1..={MAX_SHAPE_PROPS} props",
                self.component
            )));
        }
        if self.props.iter().any(|prop| prop.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "shapes.props for {} must be non-empty",
                self.component
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard audit events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Sink receiving audit events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a reserved key or marker.
fn validate_key(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.len() > MAX_KEY_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} must be 1..={MAX_KEY_LENGTH} bytes")));
    }
    if value.chars().any(|ch| ch.is_whitespace() || ch == '/' || ch == '~') {
        return Err(ConfigError::Invalid(format!(
            "{field} must not contain whitespace, '/', or '~'"
        )));
    }
    Ok(())
}

/// Validates that a bound lies in `1..=max`.
fn validate_range(field: &str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between 1 and {max}")));
    }
    Ok(())
}

/// Validates namespace names.
fn validate_namespaces(namespaces: &NamespaceConfig) -> Result<(), ConfigError> {
    validate_key("namespaces.state", &namespaces.state)?;
    validate_key("namespaces.tools", &namespaces.tools)?;
    validate_key("namespaces.transforms", &namespaces.transforms)
}

/// Validates sandbox budgets.
fn validate_sandbox(limits: &SandboxLimits) -> Result<(), ConfigError> {
    validate_range("sandbox.max_source_bytes", limits.max_source_bytes, MAX_SANDBOX_SOURCE_BYTES)?;
    validate_range("sandbox.max_nesting", limits.max_nesting, MAX_SANDBOX_DEPTH)?;
    validate_range("sandbox.max_depth", limits.max_depth, MAX_SANDBOX_DEPTH)?;
    validate_range("sandbox.max_call_depth", limits.max_call_depth, MAX_SANDBOX_DEPTH)?;
    validate_range("sandbox.max_string_bytes", limits.max_string_bytes, MAX_SANDBOX_ALLOCATION)?;
    validate_range("sandbox.max_array_len", limits.max_array_len, MAX_SANDBOX_ALLOCATION)?;
    validate_range(
        "sandbox.max_cache_entries",
        limits.max_cache_entries,
        MAX_SANDBOX_CACHE_ENTRIES,
    )?;
    if limits.max_steps == 0 || limits.max_steps > MAX_SANDBOX_STEPS {
        return Err(ConfigError::Invalid(format!(
            "sandbox.max_steps must be between 1 and {MAX_SANDBOX_STEPS}"
        )));
    }
    Ok(())
}

/// Validates the feedback budget.
fn validate_feedback(policy: FeedbackPolicy) -> Result<(), ConfigError> {
    if policy.max_attempts > MAX_FEEDBACK_ATTEMPTS {
        return Err(ConfigError::Invalid(format!(
            "feedback.max_attempts must be at most {MAX_FEEDBACK_ATTEMPTS}"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
