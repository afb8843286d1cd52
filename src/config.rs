//! Configuration module - environment sourcing and validation

use std::sync::Arc;

use crate::error::EnhanceError;

/// Environment variable for the chat-completion API key
pub const ENV_API_KEY: &str = "PROMPTGLOW_API_KEY";

/// Environment variable for a custom API base URL
pub const ENV_BASE_URL: &str = "PROMPTGLOW_BASE_URL";

/// Environment variable for a comma-separated model candidate override
pub const ENV_MODELS: &str = "PROMPTGLOW_MODELS";

/// Default chat-completion API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";

/// Default model candidates in priority order: primary, fallback, fast
pub const DEFAULT_MODELS: [&str; 3] = [
    "llama-3.3-70b-versatile",
    "llama-3.1-70b-versatile",
    "llama-3.1-8b-instant",
];

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub api_key: String,
    /// Model identifiers tried in priority order
    pub models: Vec<String>,
}

impl Config {
    /// Create a new Config with an explicit base URL, key, and candidate list
    pub fn new(
        base_url: String,
        api_key: String,
        models: Vec<String>,
    ) -> Result<Arc<Self>, EnhanceError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        if base_url.is_empty() {
            return Err(EnhanceError::Configuration(
                "base URL cannot be empty".to_string(),
            ));
        }

        if api_key.trim().is_empty() {
            return Err(EnhanceError::Configuration(format!(
                "{} is required for prompt enhancement",
                ENV_API_KEY
            )));
        }

        let models: Vec<String> = models
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();

        if models.is_empty() {
            return Err(EnhanceError::Configuration(
                "at least one model candidate is required".to_string(),
            ));
        }

        Ok(Arc::new(Self {
            base_url,
            api_key: api_key.trim().to_string(),
            models,
        }))
    }

    /// Build configuration from environment variables.
    ///
    /// A missing or empty API key fails here with a `Configuration` error so
    /// the caller can surface "enhancement unavailable" up front instead of
    /// failing individual requests later.
    pub fn from_env() -> Result<Arc<Self>, EnhanceError> {
        let api_key = std::env::var(ENV_API_KEY).unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(EnhanceError::Configuration(format!(
                "{} environment variable is required for prompt enhancement",
                ENV_API_KEY
            )));
        }

        let base_url = match std::env::var(ENV_BASE_URL) {
            Ok(value) if !value.trim().is_empty() => normalize_base_url(&value),
            _ => DEFAULT_BASE_URL.to_string(),
        };

        let models = match std::env::var(ENV_MODELS) {
            Ok(value) if !value.trim().is_empty() => {
                value.split(',').map(|m| m.to_string()).collect()
            }
            _ => default_models(),
        };

        Self::new(base_url, api_key, models)
    }
}

/// Normalize an environment-sourced base URL: force https and trim any
/// trailing slash. `strip_prefix` avoids touching an `http://` that appears
/// later in a path.
pub fn normalize_base_url(base_url: &str) -> String {
    let base_url = base_url.trim();
    let base_url = if let Some(rest) = base_url.strip_prefix("http://") {
        format!("https://{}", rest)
    } else if base_url.starts_with("https://") {
        base_url.to_string()
    } else {
        format!("https://{}", base_url)
    };

    base_url.trim_end_matches('/').to_string()
}

/// Default model candidate list as owned strings
pub fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
}
