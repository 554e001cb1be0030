//! Reward rule configuration loading from rewards.toml
//!
//! The rules defined here are seeded into the catalog on start-up. Rules that
//! already exist (matched case-insensitively by activity name) are left alone, so
//! edits made by an admin at runtime survive restarts.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "rewards.toml";
const DEFAULT_CODE_PREFIX: &str = "RR";

/// Configuration structure representing the entire rewards.toml file
#[derive(Debug, Deserialize)]
pub struct RewardsConfig {
    /// Prefix for generated activity codes
    #[serde(default = "default_code_prefix")]
    pub activity_code_prefix: String,
    /// Reward rules to seed
    #[serde(default)]
    pub rules: Vec<RewardRuleConfig>,
}

/// Configuration for a single reward rule
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RewardRuleConfig {
    /// Activity name, e.g. `"UPLOAD_PRESCRIPTION"`
    pub activity_name: String,
    /// Points per occurrence
    pub points: i32,
    /// Whether the activity consumes points
    #[serde(default)]
    pub is_deductible: bool,
    /// Whether repeats for the same prescription are ignored
    #[serde(default)]
    pub is_idempotent: bool,
}

fn default_code_prefix() -> String {
    DEFAULT_CODE_PREFIX.to_string()
}

/// Loads reward configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RewardsConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading reward configuration from {}", path_ref.display());
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses reward configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<RewardsConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse rewards config: {e}"),
    })
}

/// Loads reward configuration from `REWARDS_CONFIG`, or `./rewards.toml` when unset.
pub fn load_default_config() -> Result<RewardsConfig> {
    let path =
        std::env::var("REWARDS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config(path)
}
