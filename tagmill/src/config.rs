//! Tagmill configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main tagmill configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ordered endpoint list - defines the pool size and slot order
    pub endpoints: Vec<EndpointConfig>,

    /// Minimum seconds between calls issued by one concurrent stream
    pub call_interval_secs: f64,

    /// Attempt budget per task before recording a soft failure
    pub max_attempts: usize,

    /// Base URL of the OpenAI-compatible API
    pub base_url: String,

    /// Max completion tokens per call
    pub max_tokens: u32,

    /// Per-request HTTP timeout in seconds
    pub timeout_secs: u64,

    /// Ask the API for a JSON object response
    pub json_response: bool,

    /// Log level (overridden by --log-level)
    pub log_level: Option<String>,
}

/// One endpoint: a model reachable through its own credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Model identity for this endpoint
    pub model: String,

    /// Environment variable holding this endpoint's API key
    pub api_key_env: String,
}

fn default_call_interval_secs() -> f64 {
    // Just under the 30 requests/minute tier limit
    60.0 / 29.5
}

fn default_max_attempts() -> usize {
    3
}

fn default_base_url() -> String {
    "https://api.groq.com/openai".to_string()
}

fn default_max_tokens() -> u32 {
    120
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_json_response() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            call_interval_secs: default_call_interval_secs(),
            max_attempts: default_max_attempts(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            json_response: default_json_response(),
            log_level: None,
        }
    }
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks everything that would doom the whole batch equally.
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(eyre::eyre!(
                "No endpoints configured. Add at least one model/api_key_env pair under `endpoints`."
            ));
        }

        if self.max_attempts == 0 {
            return Err(eyre::eyre!("max_attempts must be at least 1"));
        }

        if !self.call_interval_secs.is_finite() || self.call_interval_secs < 0.0 {
            return Err(eyre::eyre!("call_interval_secs must be a non-negative number"));
        }

        for endpoint in &self.endpoints {
            if std::env::var(&endpoint.api_key_env).is_err() {
                return Err(eyre::eyre!(
                    "API key for {} not found. Set the {} environment variable.",
                    endpoint.model,
                    endpoint.api_key_env
                ));
            }
        }

        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: tagmill.yml
        let local_config = PathBuf::from("tagmill.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/tagmill/tagmill.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tagmill").join("tagmill.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Throttle period as a Duration
    pub fn call_interval(&self) -> Duration {
        Duration::from_secs_f64(self.call_interval_secs)
    }

    /// Per-request HTTP timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
