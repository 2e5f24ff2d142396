// crates/genui-core/src/runtime/pipeline.rs
// ============================================================================
// Module: GenUI Resolution Pipeline
// Description: Runs one resolution pass from message parts and element tree.
// Purpose: Produce a renderable tree and diagnostics without ever failing.
// Dependencies: crate::{core, interfaces, runtime}, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A pass runs a fixed sequence of stages:
//!
//! 1. extract tool calls and results from the message parts,
//! 2. extract transform definitions from the declared state,
//! 3. compute transforms against the tools, state, and prior outputs,
//! 4. assemble the state model from this pass's outputs,
//! 5. resolve binding references,
//! 6. validate list-shaped props.
//!
//! Every failure becomes a diagnostic. The pass always returns a tree; when
//! a stage panics the original tree is returned untouched together with a
//! single `pipeline_failure` diagnostic. Passes are synchronous and hold no
//! state between calls: a later pass simply supersedes an earlier one.
//!
//! While the stream is open, a binding that resolves to nothing is pending
//! rather than wrong, so `unresolved_reference` diagnostics are withheld
//! and only counted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::Diagnostic;
use crate::core::DiagnosticKind;
use crate::core::HashDigest;
use crate::core::ToolCallRecord;
use crate::core::ToolCallState;
use crate::core::TransformKey;
use crate::core::TransformStatus;
use crate::core::hashing::hash_canonical_json;
use crate::interfaces::TransformEvaluator;
use crate::runtime::assembler::NamespaceConfig;
use crate::runtime::assembler::assemble;
use crate::runtime::extractor::results_from_calls;
use crate::runtime::extractor::scan_tool_calls;
use crate::runtime::resolver::ResolverConfig;
use crate::runtime::resolver::resolve;
use crate::runtime::transforms::DEFAULT_TRANSFORMS_KEY;
use crate::runtime::transforms::compute_all;
use crate::runtime::transforms::extract_definitions;
use crate::runtime::validator::ShapeTable;
use crate::runtime::validator::validate;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Whether the message that carries the tree is still streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    /// Parts and patches are still arriving.
    Streaming,
    /// The message is complete.
    #[default]
    Settled,
}

impl StreamPhase {
    /// Returns the phase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Settled => "settled",
        }
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Binding marker and resolver bounds.
    pub resolver: ResolverConfig,
    /// State model namespace names.
    pub namespaces: NamespaceConfig,
    /// Declared-state key holding transform definitions.
    pub transforms_key: String,
    /// List-shaped props by component.
    pub shapes: ShapeTable,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            namespaces: NamespaceConfig::default(),
            transforms_key: DEFAULT_TRANSFORMS_KEY.to_string(),
            shapes: ShapeTable::default(),
        }
    }
}

impl PipelineConfig {
    /// Validates names and bounds.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when a name is empty, two
    /// namespaces collide, or a bound is zero.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let named = [
            ("binding marker", self.resolver.marker.as_str()),
            ("state key", self.resolver.state_key.as_str()),
            ("transforms key", self.transforms_key.as_str()),
            ("state namespace", self.namespaces.state.as_str()),
            ("tools namespace", self.namespaces.tools.as_str()),
            ("transforms namespace", self.namespaces.transforms.as_str()),
        ];
        for (label, value) in named {
            if value.trim().is_empty() {
                return Err(PipelineError::InvalidConfig(format!("{label} must be non-empty")));
            }
        }
        let distinct = self.namespaces.names().into_iter().collect::<BTreeSet<_>>();
        if distinct.len() != self.namespaces.names().len() {
            return Err(PipelineError::InvalidConfig("namespaces must be distinct".to_string()));
        }
        if self.resolver.max_prop_depth == 0 {
            return Err(PipelineError::InvalidConfig("max_prop_depth must be positive".to_string()));
        }
        if self.resolver.path_sample_limit == 0 {
            return Err(PipelineError::InvalidConfig(
                "path_sample_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pipeline construction errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Configuration failed validation.
    #[error("invalid pipeline config: {0}")]
    InvalidConfig(String),
}

// ============================================================================
// SECTION: Pass Input and Outcome
// ============================================================================

/// Inputs of one resolution pass.
#[derive(Debug, Clone, Copy)]
pub struct PassInput<'a> {
    /// Message parts in stream order.
    pub parts: &'a [Value],
    /// Element tree document, declared state included.
    pub spec: &'a Value,
    /// Stream phase.
    pub phase: StreamPhase,
    /// Transform outputs of the previous pass, visible to this pass's
    /// transforms so that chains settle over successive passes.
    pub prior_outputs: Option<&'a BTreeMap<TransformKey, Value>>,
}

impl<'a> PassInput<'a> {
    /// Creates input for a pass with no prior outputs.
    #[must_use]
    pub const fn new(parts: &'a [Value], spec: &'a Value, phase: StreamPhase) -> Self {
        Self {
            parts,
            spec,
            phase,
            prior_outputs: None,
        }
    }
}

/// Result of one resolution pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassOutcome {
    /// Resolved tree, or the original tree when the pass failed.
    pub spec: Value,
    /// Diagnostics in order: transform failures, unresolved references,
    /// shape mismatches, pipeline failures.
    pub diagnostics: Vec<Diagnostic>,
    /// Tool calls seen, in stream order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Transform status by key.
    pub transforms: BTreeMap<TransformKey, TransformStatus>,
    /// Defined transform outputs by key.
    pub transform_outputs: BTreeMap<TransformKey, Value>,
    /// Phase the pass ran in.
    pub phase: StreamPhase,
    /// Unresolved references withheld because the stream is still open.
    pub withheld_references: usize,
    /// Digest of the canonical `{ spec, diagnostics }` pair.
    pub digest: Option<HashDigest>,
}

impl PassOutcome {
    /// Returns true when the pass produced no diagnostics.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns the tool calls still running.
    #[must_use]
    pub fn active_tool_calls(&self) -> Vec<&ToolCallRecord> {
        self.tool_calls.iter().filter(|call| call.state == ToolCallState::Pending).collect()
    }

    /// Returns the number of elements in the resolved tree.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.spec.get("elements").and_then(Value::as_object).map_or(0, serde_json::Map::len)
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Resolution pipeline bound to a configuration and a transform evaluator.
pub struct ResolutionPipeline<E> {
    /// Validated settings.
    config: PipelineConfig,
    /// Transform evaluator.
    evaluator: E,
}

impl<E: TransformEvaluator> ResolutionPipeline<E> {
    /// Creates a pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when the configuration fails
    /// validation.
    pub fn new(config: PipelineConfig, evaluator: E) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            evaluator,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the evaluator.
    #[must_use]
    pub const fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Runs one pass. Never fails; see the module overview.
    #[must_use]
    pub fn run(&self, input: &PassInput<'_>) -> PassOutcome {
        let staged = catch_unwind(AssertUnwindSafe(|| self.run_stages(input)));
        let outcome = staged.unwrap_or_else(|_| Self::failed_outcome(input));
        seal(outcome)
    }

    /// Runs every stage in order.
    fn run_stages(&self, input: &PassInput<'_>) -> PassOutcome {
        let config = &self.config;
        let tool_calls = scan_tool_calls(input.parts);
        let tool_results = results_from_calls(&tool_calls);
        let declared_state = input.spec.get(&config.resolver.state_key);
        let definitions = extract_definitions(declared_state, &config.transforms_key);

        let empty = BTreeMap::new();
        let prior = input.prior_outputs.unwrap_or(&empty);
        let base = assemble(&tool_results, declared_state, prior, &config.namespaces);
        let computed = compute_all(&definitions, base.as_value(), &self.evaluator);

        let model =
            assemble(&tool_results, declared_state, &computed.outputs, &config.namespaces);
        let resolved = resolve(input.spec, &model, &config.resolver);
        let shape_diagnostics =
            validate(&resolved.spec, &config.shapes, &config.resolver.marker);

        let mut diagnostics = computed.diagnostics;
        let mut withheld_references = 0;
        for diagnostic in resolved.diagnostics {
            let pending = input.phase == StreamPhase::Streaming
                && diagnostic.kind == DiagnosticKind::UnresolvedReference;
            if pending {
                withheld_references += 1;
            } else {
                diagnostics.push(diagnostic);
            }
        }
        diagnostics.extend(shape_diagnostics);
        diagnostics.sort_by_key(|diagnostic| kind_rank(diagnostic.kind));

        PassOutcome {
            spec: resolved.spec,
            diagnostics,
            tool_calls,
            transforms: computed.statuses,
            transform_outputs: computed.outputs,
            phase: input.phase,
            withheld_references,
            digest: None,
        }
    }

    /// Builds the outcome of a pass whose stages panicked.
    fn failed_outcome(input: &PassInput<'_>) -> PassOutcome {
        PassOutcome {
            spec: input.spec.clone(),
            diagnostics: vec![Diagnostic::new(
                DiagnosticKind::PipelineFailure,
                "pipeline",
                "Resolution pass failed unexpectedly; the unresolved tree was returned",
            )],
            tool_calls: Vec::new(),
            transforms: BTreeMap::new(),
            transform_outputs: BTreeMap::new(),
            phase: input.phase,
            withheld_references: 0,
            digest: None,
        }
    }
}

/// Position of a diagnostic kind in the outcome list.
const fn kind_rank(kind: DiagnosticKind) -> u8 {
    match kind {
        DiagnosticKind::TransformFailure => 0,
        DiagnosticKind::UnresolvedReference => 1,
        DiagnosticKind::ShapeMismatch => 2,
        DiagnosticKind::PipelineFailure => 3,
    }
}

/// Stamps the outcome digest.
fn seal(mut outcome: PassOutcome) -> PassOutcome {
    let payload = json!({
        "spec": outcome.spec,
        "diagnostics": outcome.diagnostics,
    });
    outcome.digest = hash_canonical_json(&payload).ok();
    outcome
}
