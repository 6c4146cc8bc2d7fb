//! User settings persistence.
//!
//! Optional overrides live in `~/.persona-forge/config.toml`. Settings are
//! resolved with env var > config.toml > default priority.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Supported LLM backends for settings/config wiring.
pub const SUPPORTED_LLM_BACKENDS: [&str; 2] = ["openai", "openai_compatible"];

/// Normalize backend aliases to canonical values used across config/runtime.
pub fn normalize_llm_backend(value: &str) -> Option<String> {
    let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");

    match normalized.as_str() {
        "openai" => Some("openai".to_string()),
        "openai_compatible" | "openaicompat" | "openai_compat" => {
            Some("openai_compatible".to_string())
        }
        "0g_compute" | "zg_compute" | "og_compute" => Some("0g_compute".to_string()),
        _ => None,
    }
}

/// User settings loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// LLM backend: "openai" or "openai_compatible".
    #[serde(default, alias = "provider")]
    pub llm_backend: Option<String>,

    /// Chat-completion base URL.
    #[serde(default)]
    pub llm_base_url: Option<String>,

    /// Model used for persona generation and chat.
    #[serde(default, alias = "model")]
    pub llm_model: Option<String>,

    #[serde(default)]
    pub chain: ChainSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub wallet: WalletSettings,

    #[serde(default)]
    pub mint: MintSettings,

    /// Proxy base used to rewrite insecure `http://` requests.
    #[serde(default)]
    pub http_proxy_base: Option<String>,

    /// Base of the shareable draft address.
    #[serde(default)]
    pub share_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChainSettings {
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub chain_name: Option<String>,
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub rpc_fallback_urls: Vec<String>,
    #[serde(default)]
    pub explorer_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub indexer_rpc: Option<String>,
    #[serde(default)]
    pub indexer_fallback_urls: Vec<String>,
    #[serde(default)]
    pub flow_contract: Option<String>,
    #[serde(default)]
    pub upload_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WalletSettings {
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MintSettings {
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub contract_abi: Vec<String>,
    #[serde(default)]
    pub receipt_poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub receipt_timeout_secs: Option<u64>,
}

impl Settings {
    /// Default TOML config file path (~/.persona-forge/config.toml).
    pub fn default_toml_path() -> PathBuf {
        crate::bootstrap::forge_home_dir().join("config.toml")
    }

    /// Load settings from a TOML file.
    ///
    /// Returns `None` if the file doesn't exist. Returns an error only
    /// if the file exists but can't be parsed.
    pub fn load_toml(path: &Path) -> Result<Option<Self>, String> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {}", path.display(), e)),
        };

        let mut settings: Self = toml::from_str(&data)
            .map_err(|e| format!("invalid TOML in {}: {}", path.display(), e))?;
        settings.sanitize_llm_backend();
        Ok(Some(settings))
    }

    fn sanitize_llm_backend(&mut self) {
        if let Some(raw) = self.llm_backend.take() {
            match normalize_llm_backend(&raw) {
                Some(backend) => self.llm_backend = Some(backend),
                None => tracing::warn!(
                    "Ignoring unsupported llm_backend '{}' (expected one of {:?})",
                    raw,
                    SUPPORTED_LLM_BACKENDS
                ),
            }
        }
    }
}
