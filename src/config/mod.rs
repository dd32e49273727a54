// src/config/mod.rs
// Service configuration, loaded from .env and the process environment

use once_cell::sync::Lazy;
use std::str::FromStr;
use std::time::Duration;

use crate::http::CONNECT_TIMEOUT;

#[derive(Debug, Clone)]
pub struct QuestConfig {
    // ── Completion provider
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub max_tokens: u32,

    // ── External reference services
    pub context_url: String,
    pub image_search_url: String,

    // ── Server
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub body_limit_mb: usize,

    // ── Outbound HTTP (seconds)
    pub connect_timeout: u64,

    // ── Logging
    pub log_level: String,
}

/// Parse `raw` as `T`, ignoring a trailing `# comment` and surrounding whitespace.
fn parse_clean<T: FromStr>(raw: &str) -> Option<T> {
    let clean = raw.split('#').next().unwrap_or("").trim();
    clean.parse::<T>().ok()
}

fn value_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match parse_clean(&raw) {
            Some(parsed) => parsed,
            None => {
                eprintln!("Config: {} = '{}' (parse failed, using default)", key, raw);
                default
            }
        },
        None => default,
    }
}

impl QuestConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Self {
        // A missing .env is normal in containers
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset or unparsable keys
    /// fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            // URLs and keys may legitimately contain '#', so they skip comment stripping
            openai_api_key: lookup("OPENAI_API_KEY").map(|v| v.trim().to_string()).unwrap_or_default(),
            openai_base_url: lookup("QUEST_OPENAI_BASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            model: value_or(&lookup, "QUEST_MODEL", "gpt-4o".to_string()),
            max_tokens: value_or(&lookup, "QUEST_MAX_TOKENS", 1500),
            context_url: lookup("QUEST_CONTEXT_URL")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| "https://dev.sarvah.ai/api/v0/qa/".to_string()),
            image_search_url: lookup("QUEST_IMAGE_SEARCH_URL")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| "https://dev.sarvah.ai/api/v0/imgsearch/".to_string()),
            host: value_or(&lookup, "QUEST_HOST", "0.0.0.0".to_string()),
            port: value_or(&lookup, "QUEST_PORT", 3000),
            cors_origin: value_or(&lookup, "QUEST_CORS_ORIGIN", "*".to_string()),
            body_limit_mb: value_or(&lookup, "QUEST_BODY_LIMIT_MB", 25),
            connect_timeout: value_or(&lookup, "QUEST_CONNECT_TIMEOUT", CONNECT_TIMEOUT.as_secs()),
            log_level: value_or(&lookup, "QUEST_LOG_LEVEL", "info".to_string()),
        }
    }

    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.openai_base_url)
    }

    /// Server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn has_api_key(&self) -> bool {
        !self.openai_api_key.is_empty()
    }
}

// Global config instance - loaded once at startup
pub static CONFIG: Lazy<QuestConfig> = Lazy::new(QuestConfig::from_env);
