//! LLM integration: persona synthesis and in-character chat.

pub mod chat;
pub mod persona;
pub mod provider;

use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::http::HttpClient;

pub use chat::{ChatEntry, ChatRelay, ChatRole, ChatSession};
pub use persona::{Persona, PersonaGenerator};
pub use provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, OpenAiCompatibleProvider,
};

/// Create the completion provider for the configured backend.
pub fn create_provider(config: &LlmConfig, http: &HttpClient) -> Arc<dyn CompletionProvider> {
    let http = if config.timeout_secs > 0 {
        HttpClient::new(Duration::from_secs(config.timeout_secs)).with_proxy(http.proxy().cloned())
    } else {
        http.clone()
    };
    tracing::debug!(
        backend = config.backend.as_str(),
        model = %config.model,
        "Using chat-completion backend"
    );
    Arc::new(OpenAiCompatibleProvider::new(http, config))
}
