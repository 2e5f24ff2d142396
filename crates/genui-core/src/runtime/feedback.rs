// crates/genui-core/src/runtime/feedback.rs
// ============================================================================
// Module: GenUI Feedback
// Description: Correction requests built from settled-pass diagnostics.
// Purpose: Let the model fix its own tree within a bounded retry budget.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! When a settled pass carries diagnostics, the session may send one natural
//! language correction request back to the model. Requests are bounded by a
//! per-session attempt budget and are never repeated for an identical
//! diagnostics digest, so a model that cannot fix a problem is not asked
//! about it forever.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write;

use serde::Deserialize;
use serde::Serialize;

use crate::core::Diagnostic;
use crate::core::HashDigest;

/// Default correction attempts per session.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Feedback budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackPolicy {
    /// Whether correction requests are sent at all.
    pub enabled: bool,
    /// Maximum requests per session.
    pub max_attempts: u32,
}

impl Default for FeedbackPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Correction request for one settled pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixRequest {
    /// Attempt number within the session (1-based).
    pub attempt: u32,
    /// Digest of the pass the request covers.
    pub digest: Option<HashDigest>,
    /// Diagnostics covered.
    pub diagnostics: Vec<Diagnostic>,
    /// Message text for the model.
    pub message: String,
}

/// Decision taken for a correction request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum FeedbackOutcome {
    /// A request was produced.
    Requested(FixRequest),
    /// No settled pass to report on.
    NotSettled,
    /// The latest pass is clean.
    NoDiagnostics,
    /// The same diagnostics were already requested.
    Duplicate,
    /// The attempt budget is spent.
    BudgetExhausted,
    /// Feedback is turned off.
    Disabled,
}

impl FeedbackOutcome {
    /// Returns the decision label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Requested(_) => "requested",
            Self::NotSettled => "not_settled",
            Self::NoDiagnostics => "no_diagnostics",
            Self::Duplicate => "duplicate",
            Self::BudgetExhausted => "budget_exhausted",
            Self::Disabled => "disabled",
        }
    }

    /// Returns the request when one was produced.
    #[must_use]
    pub const fn request(&self) -> Option<&FixRequest> {
        match self {
            Self::Requested(request) => Some(request),
            _ => None,
        }
    }
}

/// Formats the correction message for a list of diagnostics.
///
/// Each diagnostic becomes one block with its kind, key, message, and
/// pretty-printed detail; the message ends with a fix instruction naming
/// `marker`.
#[must_use]
pub fn format_fix_request(diagnostics: &[Diagnostic], marker: &str) -> String {
    let mut text = String::new();
    for (index, diagnostic) in diagnostics.iter().enumerate() {
        if index > 0 {
            text.push_str("\n\n");
        }
        let _ = writeln!(text, "[UI Spec Error] {}: {}", diagnostic.key, diagnostic.kind);
        text.push_str(&diagnostic.message);
        if let Some(detail) = &diagnostic.detail
            && let Ok(pretty) = serde_json::to_string_pretty(detail)
        {
            let _ = write!(text, "\n\nDiagnostics:\n{pretty}");
        }
    }
    let _ = write!(
        text,
        "\n\nPlease fix the UI spec to resolve {}. Check the {marker} path, transform, or prop values.",
        if diagnostics.len() == 1 { "this error" } else { "these errors" }
    );
    text
}
