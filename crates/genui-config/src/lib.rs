// crates/genui-config/src/lib.rs
// ============================================================================
// Module: GenUI Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for genui.toml semantics.
// Dependencies: genui-core, genui-script, serde, toml
// ============================================================================

//! ## Overview
//! `genui-config` defines the configuration model for the GenUI resolver
//! and converts it into the pipeline, sandbox, and feedback settings the
//! runtime consumes. Validation is strict and fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
