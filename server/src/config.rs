//! Server Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Persona sent as the first message of every model request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant built with GitHub Copilot Extensions.
You have deep knowledge of software development and GitHub.
Be concise, accurate, and friendly.";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:3000")
    pub bind_address: String,

    /// Base URL of the OpenAI-compatible model backend (no trailing slash)
    pub llm_base_url: String,

    /// Model name sent with every completion request
    pub llm_model: String,

    /// Fallback model credential, used when the caller sends no token
    pub llm_api_key: Option<String>,

    /// System message that replaces any caller-supplied one
    pub system_prompt: String,

    /// Endpoint publishing the platform's request-signing keys
    pub public_keys_url: String,

    /// Endpoint returning the caller's profile for prompt enrichment
    pub identity_url: String,

    /// How long a fetched key set is trusted (zero disables caching)
    pub key_cache_ttl: Duration,

    /// Minimum key set age before an unknown identifier forces a refetch
    pub key_refresh_cooldown: Duration,

    /// Maximum silence between two upstream chunks while relaying
    pub upstream_idle_timeout: Duration,

    /// Maximum inbound request body size in bytes (default: 1MB)
    pub max_body_size: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;

        Ok(Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| format!("0.0.0.0:{port}")),
            llm_base_url: lookup("LLM_BASE_URL")
                .unwrap_or_else(|| "https://models.inference.ai.azure.com".into())
                .trim_end_matches('/')
                .to_string(),
            llm_model: lookup("LLM_MODEL").unwrap_or_else(|| "gpt-4o".into()),
            llm_api_key: lookup("LLM_API_KEY").filter(|k| !k.is_empty()),
            system_prompt: lookup("SYSTEM_PROMPT").unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.into()),
            public_keys_url: lookup("PUBLIC_KEYS_URL").unwrap_or_else(|| {
                "https://api.github.com/meta/public_keys/copilot_api".into()
            }),
            identity_url: lookup("IDENTITY_URL")
                .unwrap_or_else(|| "https://api.github.com/user".into()),
            key_cache_ttl: Duration::from_secs(parse_or(&lookup, "KEY_CACHE_TTL_SECS", 300)?),
            key_refresh_cooldown: Duration::from_secs(parse_or(
                &lookup,
                "KEY_REFRESH_COOLDOWN_SECS",
                30,
            )?),
            upstream_idle_timeout: Duration::from_secs(parse_or(
                &lookup,
                "UPSTREAM_IDLE_TIMEOUT_SECS",
                120,
            )?),
            max_body_size: parse_or(&lookup, "MAX_BODY_SIZE", 1024 * 1024)?, // 1MB
        })
    }

    /// Create a default configuration for testing.
    ///
    /// All outbound endpoints point at an unroutable local port; tests
    /// override the ones they exercise with mock servers.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".into(),
            llm_base_url: "http://127.0.0.1:9".into(),
            llm_model: "test-model".into(),
            llm_api_key: Some("local-secret".into()),
            system_prompt: "You are a test assistant.".into(),
            public_keys_url: "http://127.0.0.1:9/keys".into(),
            identity_url: "http://127.0.0.1:9/user".into(),
            key_cache_ttl: Duration::from_secs(300),
            key_refresh_cooldown: Duration::from_secs(30),
            upstream_idle_timeout: Duration::from_secs(5),
            max_body_size: 1024 * 1024,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number, got {raw:?}")),
        None => Ok(default),
    }
}
