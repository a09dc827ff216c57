use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "gate.toml";
const CONFIG_VERSION: u32 = 1;

/// Default authentication grace period in milliseconds.
pub const DEFAULT_TIMEOUT_MS: i64 = 1000;

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Reject peers that are not on a loopback address.
    #[serde(default = "default_loopback_only")]
    pub loopback_only: bool,
    /// Namespaces created at startup. More may be created on demand.
    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            loopback_only: default_loopback_only(),
            namespaces: default_namespaces(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Milliseconds a connection may stay unauthenticated. `<= 0` disables the timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: i64,
    /// Environment variable holding the shared token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            token_env: default_token_env(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    19876
}
fn default_loopback_only() -> bool {
    true
}
fn default_namespaces() -> Vec<String> {
    vec!["/".to_string()]
}
fn default_timeout_ms() -> i64 {
    DEFAULT_TIMEOUT_MS
}
fn default_token_env() -> String {
    "GATE_AUTH_TOKEN".to_string()
}

// ============================================
// IMPLEMENTATION
// ============================================

impl GateConfig {
    /// Load config from {config_dir}/gate.toml.
    ///
    /// A missing file yields defaults. A file that exists but cannot be read,
    /// parsed or validated is an error.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::caller(),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: GateConfig = toml::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config TOML: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::caller(),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/gate.toml using temp file + rename.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::caller(),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::caller(),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, contents).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::caller(),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::caller(),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::validation(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::validation("server.bind cannot be empty"));
        }

        if let Some(name) = self
            .server
            .namespaces
            .iter()
            .find(|name| !name.starts_with('/'))
        {
            return Err(ConfigError::validation(format!(
                "Invalid namespace: {name:?} (must start with '/')"
            )));
        }

        if self.auth.token_env.trim().is_empty() {
            return Err(ConfigError::validation("auth.token_env cannot be empty"));
        }

        Ok(())
    }
}
