// everest-control-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for everest-control-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use everest_control_config::ConfigError;
use everest_control_config::EverestControlConfig;

/// Parses a TOML string into a config without validating it.
pub fn config_from_toml(toml_str: &str) -> Result<EverestControlConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<EverestControlConfig, toml::de::Error> {
    config_from_toml("")
}

/// Asserts that a validation result failed with a message containing `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

/// RBAC section with one reader role bound to `alice`.
pub const READER_RBAC: &str = r#"
[rbac]
enabled = true

[[rbac.roles]]
name = "reader"
permissions = [
  { resource = "database-clusters", action = "read", object = "prod/*" },
  { resource = "namespaces", action = "read", object = "*/*" },
]

[[rbac.bindings]]
subject = "alice"
roles = ["reader"]

[[rbac.bindings]]
subject = "root"
roles = ["admin"]
"#;
