// crates/genui-script/src/sandbox.rs
// ============================================================================
// Module: Script Sandbox
// Description: Budgeted evaluation entry point with a compiled-source cache.
// Purpose: Evaluate untrusted transform bodies without affecting the host.
// Dependencies: serde, serde_json, crate::{ast, error, interpreter, parser}
// ============================================================================

//! ## Overview
//! [`Sandbox::evaluate`] compiles a function body (or reuses a cached
//! compilation), binds the JSON arguments as `arguments[0..n]`, and runs it
//! on a fresh interpreter. Every failure mode (syntax, runtime exception,
//! exhausted budget) is returned as an [`EvalError`].
//!
//! Trust boundary: scripts see only their arguments and the pure builtin
//! library. They cannot reach the host environment, the clock, randomness,
//! files, or the network, and each evaluation starts from fresh globals. The
//! cache stores immutable syntax trees keyed by exact source text and is
//! append-only; it never carries values between evaluations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ast::Program;
use crate::error::EvalError;
use crate::interpreter::Interpreter;
use crate::parser::parse_program;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default maximum source size in bytes.
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 64 * 1024;
/// Default maximum syntactic nesting depth.
pub const DEFAULT_MAX_NESTING: usize = 64;
/// Default execution step budget per evaluation.
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;
/// Default evaluator recursion depth.
pub const DEFAULT_MAX_DEPTH: usize = 128;
/// Default script call depth.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 32;
/// Default maximum string size in bytes.
pub const DEFAULT_MAX_STRING_BYTES: usize = 1024 * 1024;
/// Default maximum array length.
pub const DEFAULT_MAX_ARRAY_LEN: usize = 100_000;
/// Default number of compiled programs kept in the cache.
pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 1024;

/// Budgets enforced on every evaluation.
///
/// # Invariants
/// - Every field is non-zero after configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxLimits {
    /// Maximum source size in bytes.
    pub max_source_bytes: usize,
    /// Maximum syntactic nesting depth accepted by the parser.
    pub max_nesting: usize,
    /// Maximum statements plus expressions evaluated per run.
    pub max_steps: u64,
    /// Maximum evaluator recursion depth.
    pub max_depth: usize,
    /// Maximum depth of script function calls.
    pub max_call_depth: usize,
    /// Maximum size of any string built by the script.
    pub max_string_bytes: usize,
    /// Maximum length of any array built by the script.
    pub max_array_len: usize,
    /// Maximum number of compiled programs cached.
    pub max_cache_entries: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
            max_nesting: DEFAULT_MAX_NESTING,
            max_steps: DEFAULT_MAX_STEPS,
            max_depth: DEFAULT_MAX_DEPTH,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_string_bytes: DEFAULT_MAX_STRING_BYTES,
            max_array_len: DEFAULT_MAX_ARRAY_LEN,
            max_cache_entries: DEFAULT_MAX_CACHE_ENTRIES,
        }
    }
}

// ============================================================================
// SECTION: Sandbox
// ============================================================================

/// Script evaluator with a shared compiled-source cache.
///
/// # Invariants
/// - Cache entries are never replaced or removed.
/// - The cache never exceeds `limits.max_cache_entries` entries.
#[derive(Debug)]
pub struct Sandbox {
    /// Evaluation budgets.
    limits: SandboxLimits,
    /// Compiled programs keyed by exact source text.
    cache: RwLock<HashMap<String, Arc<Program>>>,
}

impl Sandbox {
    /// Creates a sandbox with the given limits.
    #[must_use]
    pub fn new(limits: SandboxLimits) -> Self {
        Self {
            limits,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a sandbox with default limits.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(SandboxLimits::default())
    }

    /// Returns the configured limits.
    #[must_use]
    pub const fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    /// Returns the number of cached programs.
    #[must_use]
    pub fn cached_programs(&self) -> usize {
        self.cache.read().map_or(0, |cache| cache.len())
    }

    /// Compiles `source`, reusing a cached program when available.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] when the source exceeds the size limit or fails
    /// to parse.
    pub fn compile(&self, source: &str) -> Result<Arc<Program>, EvalError> {
        if source.len() > self.limits.max_source_bytes {
            return Err(EvalError::limit(
                format!(
                    "source is {} bytes; limit is {} bytes",
                    source.len(),
                    self.limits.max_source_bytes
                ),
                0,
            ));
        }
        if let Ok(cache) = self.cache.read()
            && let Some(program) = cache.get(source)
        {
            return Ok(Arc::clone(program));
        }
        let program = Arc::new(parse_program(source, self.limits.max_nesting)?);
        if let Ok(mut cache) = self.cache.write()
            && cache.len() < self.limits.max_cache_entries
        {
            cache.entry(source.to_string()).or_insert_with(|| Arc::clone(&program));
        }
        Ok(program)
    }

    /// Evaluates `source` as a function body with `args` bound to `arguments`.
    ///
    /// Returns `Ok(None)` when the body produces `undefined`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] for syntax errors, uncaught script exceptions,
    /// results with no JSON form, and exhausted budgets.
    pub fn evaluate(&self, source: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
        let program = self.compile(source)?;
        let mut interpreter = Interpreter::new(&self.limits);
        interpreter.run(&program, args)
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn cache_stops_growing_at_entry_cap() {
        let sandbox = Sandbox::new(SandboxLimits {
            max_cache_entries: 2,
            ..SandboxLimits::default()
        });
        for value in 0 .. 4 {
            let source = format!("return {value};");
            assert_eq!(sandbox.evaluate(&source, &[]).unwrap(), Some(Value::from(value)));
        }
        assert_eq!(sandbox.cached_programs(), 2);
    }

    #[test]
    fn identical_source_reuses_compiled_program() {
        let sandbox = Sandbox::with_defaults();
        let first = sandbox.compile("return 1;").unwrap();
        let second = sandbox.compile("return 1;").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(sandbox.cached_programs(), 1);
    }

    #[test]
    fn failed_compilations_are_not_cached() {
        let sandbox = Sandbox::with_defaults();
        assert!(sandbox.compile("return (;").is_err());
        assert_eq!(sandbox.cached_programs(), 0);
    }
}
