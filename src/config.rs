//! Configuration management.
//!
//! Configuration is read from environment variables:
//! - `OPENROUTER_API_KEY` - Optional. Enables task enrichment when set.
//! - `TASKLANE_MODEL` - Optional. Model identifier. Defaults to `anthropic/claude-3-haiku`.
//! - `TASKLANE_MAX_TOKENS` - Optional. Output token budget for extraction. Defaults to 1024.
//! - `TASKLANE_API_URL` - Optional. Chat-completions endpoint. Defaults to OpenRouter.
//! - `TASKLANE_DEFAULT_DURATION` - Optional. Duration used when none is known. Defaults to `15m`.
//! - `TASKLANE_ENRICHMENT` - Optional. `details` (default) or `duration`.
//! - `HOST` - Optional. Bind address. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Listen port. Defaults to 3000.

use thiserror::Error;

use crate::extract::DEFAULT_MAX_TOKENS;
use crate::llm::OPENROUTER_API_URL;
use crate::task::DEFAULT_DURATION;

/// Default model for task extraction.
pub const DEFAULT_MODEL: &str = "anthropic/claude-3-haiku";

/// What enrichment fills in after a task is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnrichmentMode {
    /// Title, due date, priority, duration and categories.
    #[default]
    Details,
    /// Duration estimate only.
    DurationOnly,
}

impl std::str::FromStr for EnrichmentMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "details" => Ok(Self::Details),
            "duration" | "duration_only" => Ok(Self::DurationOnly),
            other => Err(ConfigError::InvalidValue(
                "TASKLANE_ENRICHMENT".to_string(),
                other.to_string(),
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer credential for the completion service. `None` disables enrichment.
    pub api_key: Option<String>,

    /// Model identifier sent with every completion request.
    pub model: String,

    /// Output token budget for extraction replies.
    pub max_tokens: u64,

    /// Chat-completions endpoint URL.
    pub api_url: String,

    /// Duration assigned when no estimate is available.
    pub default_duration: String,

    /// Which fields enrichment fills in.
    pub enrichment: EnrichmentMode,

    /// Server host.
    pub host: String,

    /// Server port.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            api_url: OPENROUTER_API_URL.to_string(),
            default_duration: DEFAULT_DURATION.to_string(),
            enrichment: EnrichmentMode::Details,
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let max_tokens = match get("TASKLANE_MAX_TOKENS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue("TASKLANE_MAX_TOKENS".to_string(), raw))?,
            None => defaults.max_tokens,
        };

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string(), raw))?,
            None => defaults.port,
        };

        let enrichment = match get("TASKLANE_ENRICHMENT") {
            Some(raw) => raw.parse::<EnrichmentMode>()?,
            None => defaults.enrichment,
        };

        Ok(Self {
            api_key: get("OPENROUTER_API_KEY"),
            model: get("TASKLANE_MODEL").unwrap_or(defaults.model),
            max_tokens,
            api_url: get("TASKLANE_API_URL").unwrap_or(defaults.api_url),
            default_duration: get("TASKLANE_DEFAULT_DURATION").unwrap_or(defaults.default_duration),
            enrichment,
            host: get("HOST").unwrap_or(defaults.host),
            port,
        })
    }

    /// Whether tasks will be enriched by the completion service.
    pub fn enrichment_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Socket address string for the HTTP server.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
