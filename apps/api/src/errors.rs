use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::llm_client::LlmError;
use crate::render::RenderError;
use crate::tailoring::prompt_builder::PromptError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Each failure kind has its own status, code, and user-visible message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Prompt too long: {length} characters (limit {limit})")]
    PromptTooLong { length: usize, limit: usize },

    #[error("Missing credential for the chat service")]
    MissingCredential,

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Render failure: {0}")]
    Render(#[from] RenderError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PromptError> for AppError {
    fn from(e: PromptError) -> Self {
        match e {
            PromptError::InvalidRequest(msg) => AppError::InvalidRequest(msg),
            PromptError::PromptTooLong { length, limit } => AppError::PromptTooLong { length, limit },
        }
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingCredential => AppError::MissingCredential,
            LlmError::Authentication { .. } => AppError::Authentication(e.to_string()),
            LlmError::RateLimited { .. } => AppError::RateLimited(e.to_string()),
            LlmError::Upstream(msg) => AppError::Upstream(msg),
            LlmError::Timeout { .. } => AppError::Timeout(e.to_string()),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PromptTooLong { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Authentication(_) => StatusCode::BAD_GATEWAY,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match &self {
            AppError::Extraction(e) => (
                "EXTRACTION_FAILURE",
                format!("Could not read the uploaded document. {e}"),
            ),
            AppError::InvalidRequest(msg) => ("INVALID_REQUEST", msg.clone()),
            AppError::PromptTooLong { length, limit } => (
                "PROMPT_TOO_LONG",
                format!(
                    "The documents are too long to process together ({length} characters, limit {limit}). \
                     Shorten the resume or job description."
                ),
            ),
            AppError::MissingCredential => {
                tracing::error!("Chat service API key is not configured");
                (
                    "MISSING_CREDENTIAL",
                    "The AI service is not configured. Set OPENAI_API_KEY.".to_string(),
                )
            }
            AppError::Authentication(msg) => {
                tracing::error!("Chat service authentication error: {msg}");
                (
                    "AUTHENTICATION_ERROR",
                    "The AI service rejected the configured API key".to_string(),
                )
            }
            AppError::RateLimited(msg) => {
                tracing::warn!("Chat service rate limited: {msg}");
                (
                    "RATE_LIMITED",
                    "The AI service is busy. Please try again shortly.".to_string(),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!("Chat service error: {msg}");
                (
                    "UPSTREAM_ERROR",
                    "The AI service returned an error".to_string(),
                )
            }
            AppError::Timeout(msg) => {
                tracing::warn!("Chat service timeout: {msg}");
                (
                    "TIMEOUT",
                    "The AI service took too long to respond".to_string(),
                )
            }
            AppError::Render(e) => {
                tracing::error!("Render error: {e}");
                (
                    "RENDER_FAILURE",
                    "The document could not be rendered".to_string(),
                )
            }
            AppError::Conflict(msg) => ("CONFLICT", msg.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
