// crates/genui-cli/src/tests/mod.rs
// ============================================================================
// Module: CLI Unit Tests
// Description: Unit test modules for crate-private CLI helpers.
// Purpose: Group catalog tests that need crate-private access.
// Dependencies: genui-cli
// ============================================================================

//! Unit tests for crate-private CLI helpers.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions are permitted."
)]
