// crates/genui-script/src/lib.rs
// ============================================================================
// Module: Transform Script Root
// Description: Public API surface for the sandboxed transform language.
// Purpose: Expose compilation and budgeted evaluation of transform bodies.
// Dependencies: crate::{ast, builtins, error, interpreter, lexer, parser, sandbox, value}
// ============================================================================

//! ## Overview
//! Transforms are short function bodies written by a language model to reshape
//! tool output into what a component needs. This crate runs them in a
//! restricted, deterministic language: a JavaScript subset with a pure
//! data-shaping library and hard budgets on size, steps, and depth.
//!
//! ```
//! use genui_script::Sandbox;
//! use serde_json::json;
//!
//! let sandbox = Sandbox::with_defaults();
//! let rows = sandbox
//!     .evaluate("return arguments[0].map(s => ({ sym: s.symbol }));", &[json!([{ "symbol": "AAPL" }])])
//!     .ok()
//!     .flatten();
//! assert_eq!(rows, Some(json!([{ "sym": "AAPL" }])));
//! ```

// ============================================================================
// SECTION: Core Modules
// ============================================================================

mod ast;
mod builtins;
pub mod error;
mod interpreter;
mod lexer;
mod parser;
pub mod sandbox;
mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ast::Program;
pub use error::EvalError;
pub use error::EvalErrorKind;
pub use sandbox::Sandbox;
pub use sandbox::SandboxLimits;
