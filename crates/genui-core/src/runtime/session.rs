// crates/genui-core/src/runtime/session.rs
// ============================================================================
// Module: GenUI Resolution Session
// Description: Sequences passes for one message and owns the feedback budget.
// Purpose: Carry transform outputs between passes and audit every decision.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! A session covers one message from first chunk to settlement. Each call
//! to [`ResolutionSession::resolve`] runs a fresh pass that supersedes the
//! previous one; only the latest outcome is kept, so stale diagnostics are
//! discarded automatically. The previous pass's transform outputs are fed
//! forward so that transform chains settle over successive passes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use crate::core::FeedbackAuditEvent;
use crate::core::HashDigest;
use crate::core::PassAuditEvent;
use crate::core::PassAuditEventParams;
use crate::core::ToolCallState;
use crate::core::TransformAuditEvent;
use crate::core::TransformStatus;
use crate::interfaces::AuditSink;
use crate::interfaces::TransformEvaluator;
use crate::runtime::feedback::FeedbackOutcome;
use crate::runtime::feedback::FeedbackPolicy;
use crate::runtime::feedback::FixRequest;
use crate::runtime::feedback::format_fix_request;
use crate::runtime::pipeline::PassInput;
use crate::runtime::pipeline::PassOutcome;
use crate::runtime::pipeline::ResolutionPipeline;
use crate::runtime::pipeline::StreamPhase;

// ============================================================================
// SECTION: Session
// ============================================================================

/// Pass sequencer for one message.
pub struct ResolutionSession<E> {
    /// Pipeline run on every pass.
    pipeline: ResolutionPipeline<E>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Feedback budget.
    policy: FeedbackPolicy,
    /// Passes run so far.
    passes: u64,
    /// Latest outcome.
    latest: Option<PassOutcome>,
    /// Correction requests sent so far.
    attempts: u32,
    /// Digests already requested.
    requested: BTreeSet<HashDigest>,
}

impl<E: TransformEvaluator> ResolutionSession<E> {
    /// Creates a session.
    #[must_use]
    pub fn new(
        pipeline: ResolutionPipeline<E>,
        audit: Arc<dyn AuditSink>,
        policy: FeedbackPolicy,
    ) -> Self {
        Self {
            pipeline,
            audit,
            policy,
            passes: 0,
            latest: None,
            attempts: 0,
            requested: BTreeSet::new(),
        }
    }

    /// Returns the pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &ResolutionPipeline<E> {
        &self.pipeline
    }

    /// Runs a pass over the current parts and tree and keeps its outcome.
    pub fn resolve(&mut self, parts: &[Value], spec: &Value, phase: StreamPhase) -> &PassOutcome {
        let prior = self.latest.take().map(|outcome| outcome.transform_outputs);
        let input = PassInput {
            parts,
            spec,
            phase,
            prior_outputs: prior.as_ref(),
        };
        let outcome = self.pipeline.run(&input);
        self.passes += 1;
        self.audit_pass(&outcome);
        self.latest.insert(outcome)
    }

    /// Returns the latest outcome.
    #[must_use]
    pub const fn latest(&self) -> Option<&PassOutcome> {
        self.latest.as_ref()
    }

    /// Returns the number of passes run.
    #[must_use]
    pub const fn passes(&self) -> u64 {
        self.passes
    }

    /// Returns the number of correction requests sent.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Decides whether to request a correction for the latest pass.
    ///
    /// A request is produced only for a settled pass with diagnostics, while
    /// budget remains, and when the same diagnostics were not already sent.
    pub fn request_fix(&mut self) -> FeedbackOutcome {
        let outcome = self.decide();
        let (diagnostics, digest) = self.latest.as_ref().map_or((0, None), |latest| {
            (latest.diagnostics.len(), latest.digest.clone())
        });
        self.audit.record_feedback(&FeedbackAuditEvent::new(
            self.passes,
            outcome.label(),
            self.attempts,
            diagnostics,
            digest,
        ));
        outcome
    }

    /// Applies the feedback policy to the latest pass.
    fn decide(&mut self) -> FeedbackOutcome {
        if !self.policy.enabled {
            return FeedbackOutcome::Disabled;
        }
        let Some(latest) = self.latest.as_ref().filter(|latest| latest.phase == StreamPhase::Settled)
        else {
            return FeedbackOutcome::NotSettled;
        };
        if latest.is_clean() {
            return FeedbackOutcome::NoDiagnostics;
        }
        if latest.digest.as_ref().is_some_and(|digest| self.requested.contains(digest)) {
            return FeedbackOutcome::Duplicate;
        }
        if self.attempts >= self.policy.max_attempts {
            return FeedbackOutcome::BudgetExhausted;
        }
        let marker = &self.pipeline.config().resolver.marker;
        let request = FixRequest {
            attempt: self.attempts + 1,
            digest: latest.digest.clone(),
            diagnostics: latest.diagnostics.clone(),
            message: format_fix_request(&latest.diagnostics, marker),
        };
        if let Some(digest) = &latest.digest {
            self.requested.insert(digest.clone());
        }
        self.attempts += 1;
        FeedbackOutcome::Requested(request)
    }

    /// Records the pass and transform events for an outcome.
    fn audit_pass(&self, outcome: &PassOutcome) {
        let tools_pending =
            outcome.tool_calls.iter().filter(|call| call.state == ToolCallState::Pending).count();
        let tools_completed =
            outcome.tool_calls.iter().filter(|call| call.state == ToolCallState::Completed).count();
        self.audit.record_pass(&PassAuditEvent::new(PassAuditEventParams {
            pass: self.passes,
            phase: outcome.phase.as_str(),
            elements: outcome.element_count(),
            diagnostics: outcome.diagnostics.len(),
            withheld_references: outcome.withheld_references,
            tools_completed,
            tools_pending,
            transforms: outcome.transforms.len(),
            digest: outcome.digest.clone(),
        }));
        for (key, status) in &outcome.transforms {
            let missing = match status {
                TransformStatus::Pending {
                    missing,
                } => missing.len(),
                _ => 0,
            };
            self.audit.record_transform(&TransformAuditEvent::new(
                self.passes,
                key.as_str(),
                status.label(),
                missing,
            ));
        }
    }
}
