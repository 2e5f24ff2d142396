// crates/genui-core/src/core/mod.rs
// ============================================================================
// Module: GenUI Core Types
// Description: Element tree, message parts, transforms, diagnostics, and hashing.
// Purpose: Provide the serializable data model shared by every pipeline stage.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Core types are plain data. Wire-facing values (element documents, message
//! parts, declared state) stay untyped JSON addressed by pointer paths;
//! pipeline results are typed records that serialize to stable JSON.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod diagnostic;
pub mod hashing;
pub mod identifiers;
pub mod parts;
pub mod pointer;
pub mod spec;
pub mod transform;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FeedbackAuditEvent;
pub use audit::PassAuditEvent;
pub use audit::PassAuditEventParams;
pub use audit::TransformAuditEvent;
pub use diagnostic::Diagnostic;
pub use diagnostic::DiagnosticKind;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::CallId;
pub use identifiers::ElementId;
pub use identifiers::TransformKey;
pub use parts::ToolCallRecord;
pub use parts::ToolCallState;
pub use parts::ToolResults;
pub use pointer::JsonPointer;
pub use pointer::PointerError;
pub use pointer::available_paths;
pub use pointer::get_by_path;
pub use spec::Element;
pub use spec::PatchError;
pub use spec::PatchOp;
pub use spec::Spec;
pub use spec::SpecDocument;
pub use spec::SpecPatch;
pub use transform::TransformDef;
pub use transform::TransformOutputs;
pub use transform::TransformStatus;
