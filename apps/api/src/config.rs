use std::str::FromStr;

use anyhow::{Context, Result};

use crate::llm_client::LlmError;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Application configuration loaded from environment variables.
/// Startup fails if the API key is missing or a numeric variable is malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,
    pub max_prompt_chars: usize,
    pub cover_letter_max_words: u32,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            openai_api_key: lookup("OPENAI_API_KEY")
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            openai_base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            llm_temperature: parse_or(&lookup, "LLM_TEMPERATURE", 0.2)?,
            llm_max_tokens: parse_or(&lookup, "LLM_MAX_TOKENS", 1800)?,
            llm_timeout_secs: parse_or(&lookup, "LLM_TIMEOUT_SECS", 120)?,
            llm_max_retries: parse_or(&lookup, "LLM_MAX_RETRIES", 3)?,
            max_prompt_chars: parse_or(&lookup, "MAX_PROMPT_CHARS", 60_000)?,
            cover_letter_max_words: parse_or(&lookup, "COVER_LETTER_MAX_WORDS", 300)?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// The one load-and-validate step for the chat credential.
    pub fn require_api_key(&self) -> Result<&str, LlmError> {
        self.openai_api_key
            .as_deref()
            .ok_or(LlmError::MissingCredential)
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
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}
