use secrecy::SecretString;

use crate::config::helpers::{
    first_non_empty_env, optional_env, parse_positive_u64_env, require_http_url,
};
use crate::error::ConfigError;
use crate::settings::{Settings, normalize_llm_backend};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

const ZERO_G_COMPUTE_UNSUPPORTED: &str = "the 0G Compute broker signs per-request billing \
     headers with the serving-broker SDK, which is not available here; run a gateway that adds \
     them and use LLM_BACKEND=openai_compatible with LLM_BASE_URL pointing at it";

/// Which chat-completion backend persona generation and chat talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    /// api.openai.com with `OPENAI_API_KEY`.
    OpenAi,
    /// Any OpenAI-compatible endpoint (0G compute provider, local gateway).
    OpenAiCompatible,
}

impl LlmBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenAiCompatible => "openai_compatible",
        }
    }
}

/// Resolved LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub base_url: String,
    /// Bearer credential. Absence is reported when a request is attempted.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let backend_raw = optional_env("LLM_BACKEND")?
            .or_else(|| settings.llm_backend.clone())
            .unwrap_or_else(|| "openai".to_string());
        let backend = match normalize_llm_backend(&backend_raw).as_deref() {
            Some("openai") => LlmBackend::OpenAi,
            Some("openai_compatible") => LlmBackend::OpenAiCompatible,
            Some("0g_compute") => {
                return Err(ConfigError::InvalidValue {
                    key: "LLM_BACKEND".to_string(),
                    message: ZERO_G_COMPUTE_UNSUPPORTED.to_string(),
                });
            }
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "LLM_BACKEND".to_string(),
                    message: format!(
                        "expected 'openai' or 'openai_compatible', got '{backend_raw}'"
                    ),
                });
            }
        };

        let base_url = match backend {
            LlmBackend::OpenAi => optional_env("LLM_BASE_URL")?
                .or_else(|| settings.llm_base_url.clone())
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            LlmBackend::OpenAiCompatible => optional_env("LLM_BASE_URL")?
                .or_else(|| settings.llm_base_url.clone())
                .ok_or_else(|| ConfigError::MissingRequired {
                    key: "LLM_BASE_URL".to_string(),
                    hint: "Set LLM_BASE_URL when LLM_BACKEND=openai_compatible".to_string(),
                })?,
        };
        require_http_url("LLM_BASE_URL", &base_url)?;

        let key_order: &[&str] = match backend {
            LlmBackend::OpenAi => &["OPENAI_API_KEY", "LLM_API_KEY"],
            LlmBackend::OpenAiCompatible => &["LLM_API_KEY", "OPENAI_API_KEY"],
        };
        let api_key = first_non_empty_env(key_order)?.map(SecretString::from);

        let model = optional_env("LLM_MODEL")?
            .or_else(|| settings.llm_model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            backend,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            timeout_secs: parse_positive_u64_env("LLM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        })
    }

    /// Env var the user should set when the credential is missing.
    pub fn api_key_env(&self) -> &'static str {
        match self.backend {
            LlmBackend::OpenAi => "OPENAI_API_KEY",
            LlmBackend::OpenAiCompatible => "LLM_API_KEY",
        }
    }
}
