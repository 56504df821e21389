//! Configuration management for govchain

use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "GOVCHAIN_CONFIG";
pub const API_KEY_ENV: &str = "GOVCHAIN_API_KEY";
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Shared secret expected in the `X-API-Key` header of mutating requests.
    #[serde(default)]
    pub api_key: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "./data/govchain.db".to_string()
}

impl Config {
    pub fn from_toml(raw: &str) -> Result<Self, ChainError> {
        toml::from_str(raw).map_err(|e| ChainError::ConfigError(format!("Invalid config: {}", e)))
    }

    /// Apply `GOVCHAIN_API_KEY` and `PORT` when they are set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.server.api_key = key;
            }
        }
        if let Some(port) = std::env::var(PORT_ENV).ok().and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.database.path.is_empty() {
            return Err(ChainError::ConfigError(
                "database.path must be set in config.toml".to_string(),
            ));
        }
        Ok(())
    }

    /// The HTTP server refuses to start without a shared secret.
    pub fn require_api_key(&self) -> Result<&str, ChainError> {
        if self.server.api_key.is_empty() {
            return Err(ChainError::ConfigError(format!(
                "server.api_key must be set in config.toml or via {}",
                API_KEY_ENV
            )));
        }
        Ok(&self.server.api_key)
    }
}

/// Load configuration from `path`, falling back to defaults when the file is absent.
pub fn load_config_from(path: &Path) -> Result<Config, ChainError> {
    let mut config = if path.exists() {
        let raw = fs::read_to_string(path)?;
        Config::from_toml(&raw)?
    } else {
        Config::default()
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Load `config.toml` (or the file named by `GOVCHAIN_CONFIG`).
pub fn load_config() -> Result<Config, ChainError> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config_from(Path::new(&path))
}
