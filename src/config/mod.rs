//! Typed configuration.
//!
//! Process-level settings come from environment variables and are loaded
//! once at startup, failing fast on malformed values. Per-queue settings
//! live in a TOML file.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Chunk size used when neither the environment nor a queue override sets one.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 25;

#[derive(Debug, Clone)]
pub struct Config {
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    pub service_name: String,
    /// Upper bound on items handed to a processor in one call.
    pub max_chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            otel_endpoint: None,
            log_level: "info".to_string(),
            service_name: "batchq".to_string(),
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Read a `.env` file if present, then load from the environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let max_chunk_size = match std::env::var("BATCHQ_MAX_CHUNK_SIZE") {
            Ok(raw) => parse_chunk_size("BATCHQ_MAX_CHUNK_SIZE", &raw)?,
            Err(_) => defaults.max_chunk_size,
        };

        Ok(Self {
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            service_name: std::env::var("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),
            max_chunk_size,
        })
    }
}

fn parse_chunk_size(name: &str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(Error::Config(format!("{name} must be greater than zero"))),
        Ok(n) => Ok(n),
        Err(e) => Err(Error::Config(format!("{name}={raw:?} is not a valid size: {e}"))),
    }
}

/// Per-queue overrides, keyed by queue name.
///
/// ```toml
/// [queues.posts]
/// max_chunk_size = 10
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub queues: HashMap<String, QueueSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueSettings {
    pub max_chunk_size: Option<usize>,
}

impl QueueConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("bad queue config: {e}")))?;
        for (queue, settings) in &config.queues {
            if settings.max_chunk_size == Some(0) {
                return Err(Error::Config(format!(
                    "queue {queue:?}: max_chunk_size must be greater than zero"
                )));
            }
        }
        Ok(config)
    }

    /// Load queue settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read queue config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Chunk size for `queue`, falling back to `default`.
    pub fn max_chunk_size(&self, queue: &str, default: usize) -> usize {
        self.queues
            .get(queue)
            .and_then(|settings| settings.max_chunk_size)
            .unwrap_or(default)
    }
}
