// crates/genui-cli/src/lib.rs
// ============================================================================
// Module: GenUI CLI Library
// Description: Shared helpers for the `genui` binary.
// Purpose: Expose the message catalog to the binary and integration tests.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Library half of the `genui` CLI. Command dispatch lives in `main.rs`;
//! user-facing strings live in [`i18n`] and are formatted with [`t!`].

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Internationalization helpers and message catalog.
pub mod i18n;

#[cfg(test)]
mod tests;
