// crates/genui-config/tests/common/mod.rs
// ============================================================================
// Module: Config Test Helpers
// Description: Shared builders for genui-config integration tests.
// Purpose: Keep validation suites focused on the rule under test.
// ============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use genui_config::ConfigError;
use genui_config::GenuiConfig;

/// Result type for fallible tests.
pub type TestResult = Result<(), String>;

/// Parses TOML without validating it.
pub fn config_from_toml(content: &str) -> Result<GenuiConfig, String> {
    toml::from_str(content).map_err(|err| err.to_string())
}

/// Smallest valid configuration.
pub fn minimal_config() -> GenuiConfig {
    GenuiConfig::default()
}

/// Assert that a validation result is an error containing a specific substring.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
