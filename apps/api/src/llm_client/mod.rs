/// LLM Client: the single point of entry for all chat-completion calls in Jobfit.
///
/// ARCHITECTURAL RULE: No other module may call the provider API directly.
/// All LLM interactions go through the `ChatClient` trait defined here.
///
/// The model name is configuration (`OPENAI_MODEL`), not a constant.
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

/// First backoff delay; doubles on every further attempt.
const BASE_RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("No API key configured for the chat service")]
    MissingCredential,

    #[error("Chat service rejected the credential (status {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Chat service rate limit exceeded: {message}")]
    RateLimited { message: String },

    #[error("Chat service error: {0}")]
    Upstream(String),

    #[error("Chat service did not answer within {secs}s")]
    Timeout { secs: u64 },
}

impl LlmError {
    /// Only rate limiting and generic upstream failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. } | LlmError::Upstream(_))
    }
}

/// A hosted chat model: system instruction + user prompt in, generated text out.
///
/// Carried in `AppState` as `Arc<dyn ChatClient>` so tests can substitute a stub.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier reported back to callers.
    fn model(&self) -> &str;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (OpenAI-compatible chat completions)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Trimmed content of the first choice, if it carries any text.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Connection and sampling settings for [`OpenAiChatClient`].
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl ChatSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
            timeout_secs: config.llm_timeout_secs,
            max_attempts: config.llm_max_retries.max(1),
        }
    }
}

/// Chat client for OpenAI-compatible `/chat/completions` endpoints.
/// Retries 429 and transient failures with exponential backoff.
#[derive(Clone)]
pub struct OpenAiChatClient {
    client: Client,
    settings: ChatSettings,
}

impl OpenAiChatClient {
    pub fn new(settings: ChatSettings) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| LlmError::Upstream(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    /// Makes one HTTP round trip, without retries.
    async fn call_once(&self, api_key: &str, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.settings.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        parsed
            .text()
            .map(str::to_string)
            .ok_or_else(|| LlmError::Upstream("LLM returned empty content".to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout {
                secs: self.settings.timeout_secs,
            }
        } else {
            LlmError::Upstream(e.to_string())
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        // Checked before any network I/O.
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingCredential)?;

        with_backoff(self.settings.max_attempts, BASE_RETRY_DELAY, |_| {
            self.call_once(api_key, system, prompt)
        })
        .await
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}

/// Maps a non-success HTTP status to the error taxonomy.
fn classify_status(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<ProviderError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        401 | 403 => LlmError::Authentication { status, message },
        429 => LlmError::RateLimited { message },
        _ => LlmError::Upstream(format!("status {status}: {message}")),
    }
}

/// Runs `op` up to `max_attempts` times, sleeping 1x, 2x, 4x... `base_delay`
/// between attempts. Non-retryable errors are returned immediately.
pub async fn with_backoff<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, LlmError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                let delay = base_delay * (1u32 << attempt.min(16));
                warn!(
                    "LLM call attempt {} failed ({e}), retrying after {}ms...",
                    attempt + 1,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn settings(api_key: Option<&str>) -> ChatSettings {
        ChatSettings {
            api_key: api_key.map(String::from),
            // Unroutable; any attempted request would surface as Upstream, not MissingCredential.
            base_url: "http://127.0.0.1:9".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 1800,
            timeout_secs: 1,
            max_attempts: 1,
        }
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_network() {
        let client = OpenAiChatClient::new(settings(None)).unwrap();
        let err = client.complete("system", "prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::MissingCredential));
    }

    #[tokio::test]
    async fn test_empty_credential_is_missing() {
        let client = OpenAiChatClient::new(settings(Some(""))).unwrap();
        let err = client.complete("system", "prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::MissingCredential));
    }

    #[test]
    fn test_classify_status_auth() {
        let body = r#"{"error": {"message": "Incorrect API key provided"}}"#;
        match classify_status(401, body) {
            LlmError::Authentication { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("expected Authentication, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_status_rate_limited_and_upstream() {
        assert!(matches!(
            classify_status(429, "slow down"),
            LlmError::RateLimited { .. }
        ));
        match classify_status(503, "overloaded") {
            LlmError::Upstream(msg) => assert!(msg.contains("503")),
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[test]
    fn test_response_text_takes_first_choice_trimmed() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "  Tailored resume\n"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("Tailored resume"));
    }

    #[test]
    fn test_response_without_content_has_no_text() {
        let json = r#"{"choices": [{"message": {"content": null}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_only_rate_limit_and_upstream_are_retryable() {
        assert!(LlmError::RateLimited {
            message: String::new()
        }
        .is_retryable());
        assert!(LlmError::Upstream(String::new()).is_retryable());
        assert!(!LlmError::MissingCredential.is_retryable());
        assert!(!LlmError::Timeout { secs: 1 }.is_retryable());
        assert!(!LlmError::Authentication {
            status: 401,
            message: String::new()
        }
        .is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_retries_rate_limit_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(3, Duration::from_secs(1), |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LlmError::RateLimited {
                        message: "429".to_string(),
                    })
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(3, Duration::from_secs(1), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Upstream("boom".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(LlmError::Upstream(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_does_not_retry_authentication() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(3, Duration::from_secs(1), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(LlmError::Authentication {
                    status: 401,
                    message: "bad key".to_string(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(LlmError::Authentication { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
