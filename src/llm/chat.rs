//! In-character chat with a minted persona.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::llm::persona::Persona;
use crate::llm::provider::{CompletionProvider, CompletionRequest};

const CHAT_TEMPERATURE: f32 = 0.8;
const CHAT_MAX_TOKENS: u32 = 300;

/// Reply used when the backend answers with an unexpected shape.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't respond properly.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatEntry {
    fn now(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

pub fn build_chat_prompt(persona: &Persona, user_message: &str) -> String {
    format!(
        "You are {name}, a character with the following background:\n\n\
         Name: {name}\n\
         Tagline: {tagline}\n\
         Tags: {tags}\n\
         Background: {background}\n\n\
         Please respond as this character. Keep responses in character and engaging. \
         The user is chatting with you directly.\n\n\
         User message: {user_message}",
        name = persona.name,
        tagline = persona.tagline,
        tags = persona.tags.join(", "),
        background = persona.long_description,
    )
}

/// Stateless relay: one completion request per user message.
#[derive(Clone)]
pub struct ChatRelay {
    provider: Arc<dyn CompletionProvider>,
}

impl ChatRelay {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub async fn reply(&self, persona: &Persona, user_message: &str) -> Result<String, LlmError> {
        let request = CompletionRequest::single(
            build_chat_prompt(persona, user_message),
            CHAT_TEMPERATURE,
        )
        .with_max_tokens(CHAT_MAX_TOKENS);

        let response = self.provider.complete(request).await?;
        Ok(match response.first_content() {
            Some(content) if !content.trim().is_empty() => content.to_string(),
            _ => FALLBACK_REPLY.to_string(),
        })
    }
}

/// Transcript of one chat. Failures land in the transcript, never in the caller.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    entries: Vec<ChatEntry>,
    loading: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Send one message. No-op without a persona or with a blank message.
    pub async fn send(&mut self, relay: &ChatRelay, persona: Option<&Persona>, message: &str) {
        let Some(persona) = persona else {
            return;
        };
        let message = message.trim();
        if message.is_empty() {
            return;
        }

        self.entries.push(ChatEntry::now(ChatRole::User, message));
        self.loading = true;
        match relay.reply(persona, message).await {
            Ok(reply) => self.entries.push(ChatEntry::now(ChatRole::Assistant, reply)),
            Err(e) => {
                tracing::warn!(error = %e, "Chat reply failed");
                self.entries
                    .push(ChatEntry::now(ChatRole::System, format!("Error: {e}")));
            }
        }
        self.loading = false;
    }
}
