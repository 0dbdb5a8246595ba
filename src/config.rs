//! Configuration module for the report service.
//!
//! Loads configuration from YAML files and environment variables.

use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub downstream: DownstreamConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub fixtures: FixtureConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path prefix the report routes are nested under.
    #[serde(default = "default_mount_path")]
    pub mount_path: String,
}

fn default_mount_path() -> String {
    "/api/report".to_string()
}

/// Limits applied to collaborator calls.
#[derive(Debug, Clone, Deserialize)]
pub struct DownstreamConfig {
    /// Upper bound for a single collaborator call.
    pub timeout_secs: u64,
}

impl DownstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Caller identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// When disabled, every request is attributed to `dev_issuer`.
    pub enabled: bool,
    pub dev_issuer: String,
}

/// Seed links for the visibility graph.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub links: Vec<NetworkLink>,
}

/// `agent` is allowed to see `subject`.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkLink {
    pub subject: String,
    pub agent: String,
}

/// Fixture backend configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureConfig {
    /// JSON file with fixture records. No records are served when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (REPORT__*)
    /// 2. config/local.yaml (if exists)
    /// 3. config/default.yaml
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("REPORT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
