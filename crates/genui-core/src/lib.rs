// crates/genui-core/src/lib.rs
// ============================================================================
// Module: GenUI Core Library
// Description: Public API surface for generative UI state resolution.
// Purpose: Expose core types, interfaces, and the resolution runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! GenUI core resolves a model-authored element tree against the data the
//! conversation has produced: tool outputs, declared state, and derived
//! values computed by sandboxed transforms. Each resolution pass is a pure,
//! synchronous function of the message parts and the current tree, and it
//! always returns a renderable tree plus diagnostics the model can act on.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AuditSink;
pub use interfaces::TransformError;
pub use interfaces::TransformErrorKind;
pub use interfaces::TransformEvaluator;
pub use runtime::FeedbackOutcome;
pub use runtime::FeedbackPolicy;
pub use runtime::FileAuditSink;
pub use runtime::FixRequest;
pub use runtime::MessageContent;
pub use runtime::NamespaceConfig;
pub use runtime::NoopAuditSink;
pub use runtime::PassInput;
pub use runtime::PassOutcome;
pub use runtime::PipelineConfig;
pub use runtime::PipelineError;
pub use runtime::ResolutionPipeline;
pub use runtime::ResolutionSession;
pub use runtime::ResolverConfig;
pub use runtime::ShapeTable;
pub use runtime::SpecStreamParser;
pub use runtime::StateModel;
pub use runtime::StderrAuditSink;
pub use runtime::StreamPhase;
pub use runtime::parse_message_content;
