// crates/genui-core/src/runtime/mod.rs
// ============================================================================
// Module: GenUI Runtime
// Description: Resolution pipeline stages, sessions, streaming, and audit sinks.
// Purpose: Turn message parts and a streamed element tree into a renderable tree.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Every stage is a pure function over its inputs; the pipeline composes
//! them into a pass and the session sequences passes for one message. All
//! external surfaces go through [`ResolutionPipeline::run`] so every caller
//! gets the same resolution semantics.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod assembler;
pub mod audit;
pub mod extractor;
pub mod feedback;
pub mod pipeline;
pub mod resolver;
pub mod session;
pub mod stream;
pub mod transforms;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assembler::NamespaceConfig;
pub use assembler::StateModel;
pub use assembler::assemble;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use extractor::active_tool_calls;
pub use extractor::extract;
pub use extractor::text_from_parts;
pub use feedback::FeedbackOutcome;
pub use feedback::FeedbackPolicy;
pub use feedback::FixRequest;
pub use feedback::format_fix_request;
pub use pipeline::PassInput;
pub use pipeline::PassOutcome;
pub use pipeline::PipelineConfig;
pub use pipeline::PipelineError;
pub use pipeline::ResolutionPipeline;
pub use pipeline::StreamPhase;
pub use resolver::ResolvedSpec;
pub use resolver::ResolverConfig;
pub use resolver::resolve;
pub use session::ResolutionSession;
pub use stream::MessageContent;
pub use stream::SpecStreamParser;
pub use stream::parse_message_content;
pub use stream::parse_patch_line;
pub use transforms::compute_all;
pub use transforms::extract_definitions;
pub use validator::ShapeTable;
pub use validator::validate;
