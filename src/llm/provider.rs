//! OpenAI-compatible chat-completion provider.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{ConfigError, LlmError};
use crate::http::HttpClient;

/// Max characters of an error body kept for diagnostics.
const ERROR_BODY_MAX: usize = 2_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One completion request. The provider supplies the model.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn single(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            messages: vec![ChatTurn::user(prompt)],
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// `{choices:[{message:{content}}]}`; every level is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub message: Option<CompletionMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Content of the first choice, if the response has the expected shape.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref())
    }
}

/// Anything that can answer a chat-completion request.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Provider for api.openai.com and OpenAI-compatible gateways.
pub struct OpenAiCompatibleProvider {
    http: HttpClient,
    provider: String,
    base_url: String,
    api_key: Option<SecretString>,
    api_key_env: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(http: HttpClient, config: &LlmConfig) -> Self {
        Self {
            http,
            provider: config.backend.as_str().to_string(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            api_key_env: config.api_key_env().to_string(),
            model: config.model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let api_key = match &self.api_key {
            Some(key) if !key.expose_secret().trim().is_empty() => key,
            _ => {
                return Err(LlmError::Config(ConfigError::MissingRequired {
                    key: self.api_key_env.clone(),
                    hint: "Set the LLM credential before generating".to_string(),
                }));
            }
        };

        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        tracing::debug!(provider = %self.provider, model = %self.model, "Sending completion request");
        let response = self
            .http
            .post(&self.endpoint())
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let body = truncate(&redact_sensitive_detail(&raw), ERROR_BODY_MAX);
            tracing::warn!(provider = %self.provider, status = status.as_u16(), "Completion request failed");
            return Err(LlmError::Http {
                provider: self.provider.clone(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<CompletionResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse {
                provider: self.provider.clone(),
                reason: e.to_string(),
            })
    }
}

static REDACTIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\b(bearer)\s+[a-z0-9._\-~+/]+=*", "$1 [REDACTED]"),
        (
            r"(?i)\b(token|api[_\-]?key|secret|password)\b(\s*[:=]\s*)([^,\s]+)",
            "$1$2[REDACTED]",
        ),
        (r"(?i)\bsk-[a-z0-9\-]{10,}\b", "sk-[REDACTED]"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

/// Mask bearer tokens and API keys echoed back in error bodies.
pub(crate) fn redact_sensitive_detail(raw: &str) -> String {
    REDACTIONS
        .iter()
        .fold(raw.to_string(), |value, (re, replacement)| {
            re.replace_all(&value, *replacement).into_owned()
        })
}

fn truncate(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmBackend;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str, key: Option<&str>) -> LlmConfig {
        LlmConfig {
            backend: LlmBackend::OpenAiCompatible,
            base_url: base_url.to_string(),
            api_key: key.map(|k| SecretString::from(k.to_string())),
            model: "test-model".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn redact_sensitive_detail_masks_tokens() {
        let redacted = redact_sensitive_detail(
            "Incorrect API key provided: sk-abcdef1234567890xyz, header Bearer abc.def",
        );
        assert!(!redacted.contains("sk-abcdef1234567890xyz"));
        assert!(!redacted.contains("abc.def"));
        assert!(redacted.contains("[REDACTED]"));
    }

    #[test]
    fn redaction_patterns_all_compile() {
        assert_eq!(REDACTIONS.len(), 3);
        assert_eq!(
            redact_sensitive_detail("password = hunter2, retry"),
            "password = [REDACTED], retry"
        );
    }

    #[test]
    fn first_content_tolerates_missing_levels() {
        let empty: CompletionResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.first_content(), None);
        let no_message: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{}]}"#).unwrap();
        assert_eq!(no_message.first_content(), None);
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(
            HttpClient::new(Duration::from_secs(5)),
            &config(&server.uri(), None),
        );
        let err = provider
            .complete(CompletionRequest::single("hi", 0.7))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Config(ConfigError::MissingRequired { .. })));
    }

    #[tokio::test]
    async fn sends_bearer_model_and_max_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "max_tokens": 300,
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "hey"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(
            HttpClient::new(Duration::from_secs(5)),
            &config(&server.uri(), Some("sk-test")),
        );
        let response = provider
            .complete(CompletionRequest::single("hello", 0.8).with_max_tokens(300))
            .await
            .unwrap();
        assert_eq!(response.first_content(), Some("hey"));
    }

    #[tokio::test]
    async fn non_success_status_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(
            HttpClient::new(Duration::from_secs(5)),
            &config(&server.uri(), Some("sk-test")),
        );
        match provider
            .complete(CompletionRequest::single("hello", 0.7))
            .await
            .unwrap_err()
        {
            LlmError::Http { status, body, .. } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
