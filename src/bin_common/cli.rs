//! CLI utilities for binaries
//!
//! Handles configuration loading, environment variables and positional
//! arguments for the console binaries.

use anyhow::{anyhow, Context};
use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Dashboard client configuration (config/workhub.yaml)
    Workhub,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Workhub => "config/workhub.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Workhub => "WORKHUB_CONFIG_PATH",
            ConfigType::Custom(_) => "CONFIG_PATH",
        }
    }
}

/// Load configuration path from environment or use default
///
/// # Examples
/// ```
/// use workhub_dashboard::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Workhub);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// First positional argument as a numeric id
///
/// `name` only shows up in the error message.
pub fn parse_id_arg(args: &[String], name: &str) -> anyhow::Result<i64> {
    let raw = args
        .first()
        .ok_or_else(|| anyhow!("missing <{}> argument", name))?;
    raw.trim()
        .parse::<i64>()
        .with_context(|| format!("<{}> must be a number, got {:?}", name, raw))
}
