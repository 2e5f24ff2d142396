// crates/genui-core/src/core/audit.rs
// ============================================================================
// Module: GenUI Audit Events
// Description: Structured audit payloads for passes, transforms, and feedback.
// Purpose: Describe pipeline activity without carrying tool or state payloads.
// Dependencies: crate::core::hashing, serde
// ============================================================================

//! ## Overview
//! Audit events are emitted as JSON lines by an
//! [`AuditSink`](crate::interfaces::AuditSink). They carry counts, keys, and
//! digests only; tool outputs, declared state, and transform sources never
//! appear in an event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::hashing::HashDigest;

/// Milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Pass Event
// ============================================================================

/// Audit event for one completed resolution pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Pass number within the session (1-based).
    pub pass: u64,
    /// Stream phase label.
    pub phase: &'static str,
    /// Elements in the resolved tree.
    pub elements: usize,
    /// Diagnostics returned.
    pub diagnostics: usize,
    /// Unresolved references withheld because the stream is still open.
    pub withheld_references: usize,
    /// Completed tool calls seen.
    pub tools_completed: usize,
    /// Tool calls still running.
    pub tools_pending: usize,
    /// Transform definitions found.
    pub transforms: usize,
    /// Outcome digest when computed.
    pub digest: Option<HashDigest>,
}

/// Inputs required to construct a pass audit event.
pub struct PassAuditEventParams {
    /// Pass number within the session.
    pub pass: u64,
    /// Stream phase label.
    pub phase: &'static str,
    /// Elements in the resolved tree.
    pub elements: usize,
    /// Diagnostics returned.
    pub diagnostics: usize,
    /// Unresolved references withheld.
    pub withheld_references: usize,
    /// Completed tool calls seen.
    pub tools_completed: usize,
    /// Tool calls still running.
    pub tools_pending: usize,
    /// Transform definitions found.
    pub transforms: usize,
    /// Outcome digest when computed.
    pub digest: Option<HashDigest>,
}

impl PassAuditEvent {
    /// Creates a pass event stamped with the current time.
    #[must_use]
    pub fn new(params: PassAuditEventParams) -> Self {
        Self {
            event: "resolution_pass",
            timestamp_ms: now_ms(),
            pass: params.pass,
            phase: params.phase,
            elements: params.elements,
            diagnostics: params.diagnostics,
            withheld_references: params.withheld_references,
            tools_completed: params.tools_completed,
            tools_pending: params.tools_pending,
            transforms: params.transforms,
            digest: params.digest,
        }
    }
}

// ============================================================================
// SECTION: Transform Event
// ============================================================================

/// Audit event for one transform within a pass.
#[derive(Debug, Clone, Serialize)]
pub struct TransformAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Pass number within the session.
    pub pass: u64,
    /// Transform key.
    pub key: String,
    /// Status label (`computed`, `pending`, `failed`).
    pub status: &'static str,
    /// Dependencies still undefined.
    pub missing_deps: usize,
}

impl TransformAuditEvent {
    /// Creates a transform event stamped with the current time.
    #[must_use]
    pub fn new(pass: u64, key: &str, status: &'static str, missing_deps: usize) -> Self {
        Self {
            event: "transform_evaluated",
            timestamp_ms: now_ms(),
            pass,
            key: key.to_string(),
            status,
            missing_deps,
        }
    }
}

// ============================================================================
// SECTION: Feedback Event
// ============================================================================

/// Audit event for one feedback decision.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Pass the decision was made for.
    pub pass: u64,
    /// Decision label (`requested`, `duplicate`, `budget_exhausted`, ...).
    pub decision: &'static str,
    /// Attempts used so far, including this one.
    pub attempts: u32,
    /// Diagnostics the decision covered.
    pub diagnostics: usize,
    /// Outcome digest when computed.
    pub digest: Option<HashDigest>,
}

impl FeedbackAuditEvent {
    /// Creates a feedback event stamped with the current time.
    #[must_use]
    pub fn new(
        pass: u64,
        decision: &'static str,
        attempts: u32,
        diagnostics: usize,
        digest: Option<HashDigest>,
    ) -> Self {
        Self {
            event: "feedback_decision",
            timestamp_ms: now_ms(),
            pass,
            decision,
            attempts,
            diagnostics,
            digest,
        }
    }
}
