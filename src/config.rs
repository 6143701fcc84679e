//! Configuration management for my-claude.
//!
//! Loads settings from `~/.config/my-claude/config.toml` with environment
//! overrides (`ANTHROPIC_API_KEY`, `CLAUDE_MODEL`, `HOST`, `PORT`, `DEBUG`,
//! `CORS_ORIGINS`).

use crate::catalog::{builtin_models, ModelInfo};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const APP_NAME: &str = "my-claude";
pub const APP_DESCRIPTION: &str = "Simple web interface for chatting with Claude through the Anthropic API";

pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_RATE_URL: &str = "https://api.frankfurter.app/latest?from=USD&to=EUR";
pub const DEFAULT_USD_TO_EUR_RATE: f64 = 0.92;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub anthropic: AnthropicConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "builtin_models")]
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnthropicConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrencyConfig {
    #[serde(default = "default_rate_url")]
    pub rate_url: String,
    #[serde(default = "default_rate")]
    pub default_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbosity: LogVerbosity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogVerbosity {
    Minimal,
    #[default]
    Compact,
    Verbose,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_cors_origins() -> Vec<String> { vec!["*".to_string()] }
fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_api_url() -> String { DEFAULT_API_URL.to_string() }
fn default_api_version() -> String { DEFAULT_API_VERSION.to_string() }
fn default_max_tokens() -> u32 { DEFAULT_MAX_TOKENS }
fn default_rate_url() -> String { DEFAULT_RATE_URL.to_string() }
fn default_rate() -> f64 { DEFAULT_USD_TO_EUR_RATE }

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            anthropic: AnthropicConfig::default(),
            currency: CurrencyConfig::default(),
            logging: LoggingConfig::default(),
            models: builtin_models(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: default_model(),
            api_url: default_api_url(),
            api_version: default_api_version(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            rate_url: default_rate_url(),
            default_rate: default_rate(),
        }
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
            .join("config.toml")
    }

    /// Load config from file, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path())
    }

    /// Load config from a specific path.
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            self.anthropic.api_key = if key.is_empty() { None } else { Some(key) };
        }
        if let Ok(model) = std::env::var("CLAUDE_MODEL") {
            if !model.is_empty() {
                self.anthropic.default_model = model;
            }
        }
        if let Ok(host) = std::env::var("HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(val) = std::env::var("PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("DEBUG") {
            self.server.debug = val.eq_ignore_ascii_case("true");
        }
        if let Ok(val) = std::env::var("CORS_ORIGINS") {
            let origins: Vec<String> = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !origins.is_empty() {
                self.server.cors_origins = origins;
            }
        }
        self
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(&path, content).map_err(ConfigError::Io)
    }

    /// Whether the configured default model is part of the catalog.
    pub fn default_model_in_catalog(&self) -> bool {
        self.models.iter().any(|m| m.id == self.anthropic.default_model)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
