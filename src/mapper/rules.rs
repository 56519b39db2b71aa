//! Loading of reconcile rules.
//!
//! - `default_rules()` parses the table embedded in the binary
//! - `load_rules(path)` parses a replacement table from disk

use anyhow::Result;
use std::path::Path;

use super::types::RulesConfig;

/// Default rules embedded at compile time from `config/reconcile_rules.toml`.
const DEFAULT_RULES: &str = include_str!("../../config/reconcile_rules.toml");

pub fn load_rules(path: &Path) -> Result<RulesConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: RulesConfig = toml::from_str(&content)?;
    Ok(config)
}

/// # Panics
/// Panics if the embedded TOML is invalid (a build-time bug, covered by tests).
pub fn default_rules() -> RulesConfig {
    toml::from_str(DEFAULT_RULES).expect("embedded reconcile_rules.toml must be valid TOML")
}
