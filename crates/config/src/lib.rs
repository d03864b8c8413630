//! kiosk-config - configuration loading

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use thiserror::Error;

use secrecy::Secret;

/// Prefix of environment overrides, e.g. `KIOSK_DATABASE__URL`
pub const ENV_PREFIX: &str = "KIOSK_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    // development: 10, production: 50
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

fn default_connect_timeout_secs() -> u64 {
    30
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// JSON log lines instead of human-readable ones
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Access-control service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Insert the default permission catalog at startup
    #[serde(default = "default_true")]
    pub seed_catalog: bool,
    /// Serialize replace-saves of the same role/user with an advisory lock
    #[serde(default = "default_true")]
    pub lock_replacements: bool,
    /// Run saves at SERIALIZABLE; conflicting saves then fail with a conflict
    #[serde(default)]
    pub serializable_saves: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            seed_catalog: true,
            lock_replacements: true,
            serializable_saves: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub app_env: String,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub access: AccessConfig,
}

impl AppConfig {
    /// Load from config files and environment variables
    ///
    /// Layers, later wins: `{dir}/default.toml`, `{dir}/{APP_ENV}.toml`,
    /// `KIOSK_*` environment variables (`__` separates nested keys).
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

#[cfg(test)]
mod tests;
