// crates/rule-adapter-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for rule-adapter-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use rule_adapter_config::ConfigError;
use rule_adapter_config::RuleAdapterConfig;

/// Result type for tests that report failures as messages.
pub type TestResult = Result<(), String>;

/// Minimal TOML selecting a `SQLite` database at `path`.
pub fn sqlite_toml(path: &str) -> String {
    format!("[database]\nbackend = \"sqlite\"\npath = \"{path}\"\n")
}

/// Parses a TOML string into a `RuleAdapterConfig` without validation.
pub fn config_from_toml(toml_str: &str) -> Result<RuleAdapterConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal `SQLite` config with all defaults applied.
pub fn minimal_config() -> Result<RuleAdapterConfig, String> {
    config_from_toml(&sqlite_toml("policy.db")).map_err(|err| err.to_string())
}

/// Asserts that `result` is an invalid-config error mentioning `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(ConfigError::Invalid(message)) => {
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Err(other) => Err(format!("expected invalid config, got {other}")),
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
