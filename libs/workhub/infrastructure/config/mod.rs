use livelink::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::application::controller::DeliveryMode;
use crate::application::session::SessionSettings;

/// Bearer credential, environment only
pub const TOKEN_ENV: &str = "WORKHUB_TOKEN";
pub const API_URL_ENV: &str = "WORKHUB_API_URL";
pub const WS_URL_ENV: &str = "WORKHUB_WS_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Dashboard client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkhubConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub socket: SocketConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bearer token from .env (not in YAML)
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for WorkhubConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            socket: SocketConfig::default(),
            sync: SyncConfig::default(),
            log_level: default_log_level(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    pub base_url: String,
    pub reconnect: ReconnectConfig,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            base_url: "ws://localhost:8000/ws".to_string(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Omit for unlimited retries
    pub max_attempts: Option<usize>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 8000,
            max_attempts: Some(5),
        }
    }
}

impl ReconnectConfig {
    pub fn strategy(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.max_attempts,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub pending_ttl_secs: u64,
    pub activity_feed_limit: usize,
    pub delivery: DeliveryMode,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: 10,
            activity_feed_limit: 50,
            delivery: DeliveryMode::Socket,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl WorkhubConfig {
    /// Load configuration from YAML file, then apply `.env` and environment overrides
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config = Self::from_yaml_str(&yaml_content)?;

        dotenv::dotenv().ok();
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file means defaults
    pub fn load_or_default(config_path: impl AsRef<Path>) -> Result<Self> {
        let path = config_path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        info!("Config file {} not found, using defaults", path.display());
        let mut config = Self::default();
        dotenv::dotenv().ok();
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply overrides from `lookup` (the environment in production)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.is_empty()) {
            self.token = Some(token);
        }
        if let Some(url) = lookup(API_URL_ENV) {
            info!("Overriding API URL from environment variable");
            self.api.base_url = url;
        }
        if let Some(url) = lookup(WS_URL_ENV) {
            info!("Overriding socket URL from environment variable");
            self.socket.base_url = url;
        }
    }

    /// Bearer token, required by binaries that talk to the API
    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| ConfigError::EnvVarMissing(TOKEN_ENV.to_string()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api.base_url must not be empty".to_string(),
            ));
        }
        if self.socket.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "socket.base_url must not be empty".to_string(),
            ));
        }
        if self.sync.activity_feed_limit == 0 {
            return Err(ConfigError::ValidationError(
                "sync.activity_feed_limit must be greater than 0".to_string(),
            ));
        }
        if self.sync.pending_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sync.pending_ttl_secs must be greater than 0".to_string(),
            ));
        }
        let reconnect = &self.socket.reconnect;
        if reconnect.initial_delay_ms > reconnect.max_delay_ms {
            return Err(ConfigError::ValidationError(
                "socket.reconnect.initial_delay_ms must not exceed max_delay_ms".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    /// Session settings derived from this configuration
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            ws_base_url: self.socket.base_url.clone(),
            token: self.token.clone(),
            reconnect: self.socket.reconnect.strategy(),
            delivery: self.sync.delivery,
            pending_ttl: Duration::from_secs(self.sync.pending_ttl_secs),
            activity_feed_limit: self.sync.activity_feed_limit,
            initial_counterparty: None,
        }
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  API: {}", self.api.base_url);
        info!("  Socket: {}", self.socket.base_url);
        info!(
            "  Reconnect: {}ms..{}ms, attempts {:?}",
            self.socket.reconnect.initial_delay_ms,
            self.socket.reconnect.max_delay_ms,
            self.socket.reconnect.max_attempts
        );
        info!("  Delivery: {:?}", self.sync.delivery);
        info!("  Pending TTL: {}s", self.sync.pending_ttl_secs);
        info!("  Token: {}", if self.token.is_some() { "set" } else { "missing" });
    }
}
