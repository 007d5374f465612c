use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ChatClient;
use crate::tailoring::prompt_builder::PromptBuilder;
use crate::tailoring::session::InFlightSessions;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Chat model backend. Default: OpenAiChatClient. Tests substitute a scripted stub.
    pub chat: Arc<dyn ChatClient>,
    pub prompt_builder: PromptBuilder,
    /// Sessions with a tailoring request currently running.
    pub sessions: InFlightSessions,
    pub config: Config,
}
