use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::error::MatchingError;
use crate::models::{AlgorithmType, ScoringWeights};
use crate::services::MatchingDefaults;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Defaults applied to rounds created without explicit settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingSettings {
    #[serde(default)]
    pub default_algorithm: AlgorithmType,
    #[serde(default)]
    pub weights: ScoringWeights,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataSettings {
    /// JSON or TOML snapshot seeding the in-memory store
    pub snapshot_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with PLACEMENT__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., PLACEMENT__SERVER__PORT -> server.port
            .add_source(environment())
            .build()?;

        apply_overrides(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        settings.try_deserialize()
    }

    /// Configured round defaults, rejecting unusable weights
    pub fn matching_defaults(&self) -> Result<MatchingDefaults, MatchingError> {
        self.matching.weights.validate()?;
        Ok(MatchingDefaults {
            algorithm_type: self.matching.default_algorithm,
            weights: self.matching.weights,
        })
    }
}

fn environment() -> Environment {
    Environment::with_prefix("PLACEMENT")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Honour the conventional SNAPSHOT_PATH variable when the prefixed one is absent
fn apply_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let snapshot_path = env::var("PLACEMENT__DATA__SNAPSHOT_PATH")
        .or_else(|_| env::var("SNAPSHOT_PATH"))
        .ok();

    let mut builder = Config::builder().add_source(settings);
    if let Some(path) = snapshot_path {
        builder = builder.set_override("data.snapshot_path", path)?;
    }
    builder.build()
}
