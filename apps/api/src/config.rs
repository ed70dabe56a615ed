use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_API_URL;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub llm_api_key: String,
    pub llm_api_url: String,
    pub ai: AiDefaults,
    pub site_url: String,
    pub port: u16,
    pub rust_log: String,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    pub session_ttl_hours: i64,
}

/// Environment-level fallbacks for the AI settings stored in `ai_config`.
#[derive(Debug, Clone, Default)]
pub struct AiDefaults {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            llm_api_key: require_env("LLM_API_KEY")?,
            llm_api_url: std::env::var("LLM_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            ai: AiDefaults {
                model: optional_env("AI_MODEL"),
                system_prompt: optional_env("SYSTEM_PROMPT"),
            },
            site_url: std::env::var("SITE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            rate_limit_max: parse_env("RATE_LIMIT_MAX", 10)?,
            rate_limit_window_secs: parse_env("RATE_LIMIT_WINDOW_SECS", 60)?,
            session_ttl_hours: parse_env("SESSION_TTL_HOURS", 24 * 7)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Treats an empty or whitespace-only variable as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/shadway_test".to_string(),
            llm_api_key: "test-key".to_string(),
            llm_api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            ai: AiDefaults::default(),
            site_url: "http://localhost:3000".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            rate_limit_max: 3,
            rate_limit_window_secs: 60,
            session_ttl_hours: 1,
        }
    }
}
