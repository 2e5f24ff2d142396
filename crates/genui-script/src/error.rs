// crates/genui-script/src/error.rs
// ============================================================================
// Module: Script Errors
// Description: Structured failures raised while compiling or running scripts.
// Purpose: Give callers one failure type with a kind, message, and location.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every failure the sandbox can produce collapses into [`EvalError`]. Syntax
//! errors carry the byte offset of the offending token, runtime errors carry
//! the offset of the expression that raised them plus a call stack, and limit
//! errors report which budget was exhausted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Error Kind
// ============================================================================

/// Classification of a script failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalErrorKind {
    /// Source text could not be tokenized or parsed.
    Syntax,
    /// The script raised an error while running.
    Runtime,
    /// A sandbox budget (size, steps, depth, allocation) was exceeded.
    Limit,
}

// ============================================================================
// SECTION: Eval Error
// ============================================================================

/// Failure produced by the sandbox.
///
/// # Invariants
/// - `position` is a byte offset into the source that was evaluated.
/// - `stack` lists the innermost frame first and is empty for syntax errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalError {
    /// Failure classification.
    pub kind: EvalErrorKind,
    /// Script-visible error name (`TypeError`, `ReferenceError`, ...).
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Byte offset into the source.
    pub position: usize,
    /// Call frames active when the error was raised.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack: Vec<String>,
}

impl EvalError {
    /// Creates a syntax error at the given offset.
    #[must_use]
    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self {
            kind: EvalErrorKind::Syntax,
            name: "SyntaxError".to_string(),
            message: message.into(),
            position,
            stack: Vec::new(),
        }
    }

    /// Creates a runtime error with the given script-visible name.
    #[must_use]
    pub fn runtime(name: impl Into<String>, message: impl Into<String>, position: usize) -> Self {
        Self {
            kind: EvalErrorKind::Runtime,
            name: name.into(),
            message: message.into(),
            position,
            stack: Vec::new(),
        }
    }

    /// Creates a limit error at the given offset.
    #[must_use]
    pub fn limit(message: impl Into<String>, position: usize) -> Self {
        Self {
            kind: EvalErrorKind::Limit,
            name: "RangeError".to_string(),
            message: message.into(),
            position,
            stack: Vec::new(),
        }
    }

    /// Attaches call frames to the error.
    #[must_use]
    pub fn with_stack(mut self, stack: Vec<String>) -> Self {
        self.stack = stack;
        self
    }

    /// Renders the stack as newline-separated frames.
    #[must_use]
    pub fn stack_trace(&self) -> Option<String> {
        if self.stack.is_empty() {
            return None;
        }
        Some(self.stack.iter().map(|frame| format!("    at {frame}")).collect::<Vec<_>>().join("\n"))
    }

    /// Returns the 1-based line and column of the error within `source`.
    #[must_use]
    pub fn line_column(&self, source: &str) -> (usize, usize) {
        let mut line = 1;
        let mut column = 1;
        for (offset, ch) in source.char_indices() {
            if offset >= self.position {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        (line, column)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for EvalError {}
