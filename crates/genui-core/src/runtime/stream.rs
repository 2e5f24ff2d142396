// crates/genui-core/src/runtime/stream.rs
// ============================================================================
// Module: GenUI Spec Stream
// Description: Splits streamed message text into prose and element tree patches.
// Purpose: Build the element document incrementally as message chunks arrive.
// Dependencies: crate::core::spec, serde_json
// ============================================================================

//! ## Overview
//! Model output mixes prose with JSONL patch lines. Lines inside a
//! ```` ```spec ```` or ```` ```json ```` fence are patches (the fence lines
//! themselves are swallowed). Other fences are prose, kept verbatim. Outside
//! fences, a line starting with `{` that parses as a patch is applied and
//! anything else is prose.
//!
//! A malformed patch line is never fatal: inside a spec fence it is dropped,
//! outside it stays prose. A well-formed patch that cannot be applied (for
//! example a `remove` of a missing path) is dropped and counted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::mem;

use crate::core::PatchOp;
use crate::core::SpecDocument;
use crate::core::SpecPatch;

// ============================================================================
// SECTION: Patch Lines
// ============================================================================

/// Parses one JSONL patch line; anything malformed yields `None`.
#[must_use]
pub fn parse_patch_line(line: &str) -> Option<SpecPatch> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let patch = serde_json::from_str::<SpecPatch>(trimmed).ok()?;
    let needs_value = matches!(patch.op, PatchOp::Add | PatchOp::Replace);
    if needs_value && patch.value.is_none() {
        return None;
    }
    Some(patch)
}

// ============================================================================
// SECTION: Stream Parser
// ============================================================================

/// Code fence the parser is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Fence {
    /// Not inside a fence.
    #[default]
    Outside,
    /// Inside a spec or json fence; lines are patches.
    Spec,
    /// Inside any other fence; lines are prose.
    Other,
}

/// Prose and element document extracted from message content.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageContent {
    /// Prose lines joined by newlines and trimmed.
    pub text: String,
    /// Element document, when at least one patch line was seen.
    pub document: Option<SpecDocument>,
    /// Patches applied.
    pub patches_applied: usize,
    /// Well-formed patches that failed to apply.
    pub patches_rejected: usize,
}

/// Incremental parser for streamed message content.
///
/// # Invariants
/// - Only complete lines are interpreted; a partial trailing line waits in
///   the buffer until more text or [`SpecStreamParser::finish`] arrives.
#[derive(Debug, Default)]
pub struct SpecStreamParser {
    /// Text after the last newline seen.
    buffer: String,
    /// Current fence.
    fence: Fence,
    /// Prose lines so far.
    text_lines: Vec<String>,
    /// Document built so far.
    document: Option<SpecDocument>,
    /// Patches applied.
    applied: usize,
    /// Patches rejected.
    rejected: usize,
}

impl SpecStreamParser {
    /// Creates an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of streamed text, interpreting every completed line.
    pub fn push(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
        while let Some(end) = self.buffer.find('\n') {
            let line = self.buffer.drain(..= end).collect::<String>();
            self.process_line(line.trim_end_matches(['\n', '\r']));
        }
    }

    /// Returns the document built so far.
    #[must_use]
    pub const fn document(&self) -> Option<&SpecDocument> {
        self.document.as_ref()
    }

    /// Returns the number of patches applied so far.
    #[must_use]
    pub const fn patches_applied(&self) -> usize {
        self.applied
    }

    /// Interprets the trailing partial line and returns the final content.
    #[must_use]
    pub fn finish(mut self) -> MessageContent {
        let tail = mem::take(&mut self.buffer);
        self.process_line(&tail);
        MessageContent {
            text: self.text_lines.join("\n").trim().to_string(),
            document: self.document,
            patches_applied: self.applied,
            patches_rejected: self.rejected,
        }
    }

    /// Interprets one complete line.
    fn process_line(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            match self.fence {
                Fence::Outside if trimmed == "```spec" || trimmed == "```json" => {
                    self.fence = Fence::Spec;
                }
                Fence::Outside => {
                    self.fence = Fence::Other;
                    self.text_lines.push(line.to_string());
                }
                Fence::Spec => self.fence = Fence::Outside,
                Fence::Other => {
                    self.fence = Fence::Outside;
                    self.text_lines.push(line.to_string());
                }
            }
            return;
        }
        match self.fence {
            Fence::Spec => {
                if let Some(patch) = parse_patch_line(trimmed) {
                    self.apply(&patch);
                }
            }
            Fence::Other => self.text_lines.push(line.to_string()),
            Fence::Outside => {
                if let Some(patch) = parse_patch_line(trimmed) {
                    self.apply(&patch);
                } else {
                    self.text_lines.push(line.to_string());
                }
            }
        }
    }

    /// Applies a patch to the document, creating it on first use.
    fn apply(&mut self, patch: &SpecPatch) {
        let document = self.document.get_or_insert_with(SpecDocument::new);
        match document.apply(patch) {
            Ok(()) => self.applied += 1,
            Err(_) => self.rejected += 1,
        }
    }
}

/// Parses complete message content into prose and an element document.
#[must_use]
pub fn parse_message_content(content: &str) -> MessageContent {
    let mut parser = SpecStreamParser::new();
    parser.push(content);
    parser.finish()
}
