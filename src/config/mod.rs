//! Configuration for persona-forge.
//!
//! Settings are loaded with priority: env var > `./.env` >
//! `~/.persona-forge/.env` > `~/.persona-forge/config.toml` > default.
//! Missing credentials and contract addresses do not fail loading; they
//! are reported by [`Config::validate_for_generate`] and
//! [`Config::validate_for_mint`] (and by `persona-forge doctor`) so the
//! problem is discoverable at startup instead of mid-workflow.

mod chain;
pub(crate) mod helpers;
mod llm;
mod mint;
mod storage;

use std::path::Path;

use secrecy::ExposeSecret;

use crate::error::ConfigError;
use crate::settings::Settings;

pub use self::chain::ChainConfig;
pub use self::llm::{LlmBackend, LlmConfig};
pub use self::mint::{DEFAULT_INFT_ABI, DEFAULT_WALLET_TARGET, MintConfig, WalletConfig};
pub use self::storage::StorageConfig;

const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:5173/explore";

/// Main configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub chain: ChainConfig,
    pub storage: StorageConfig,
    pub wallet: WalletConfig,
    pub mint: MintConfig,
    /// Proxy base for rewriting insecure `http://` requests.
    pub http_proxy_base: Option<String>,
    /// Base of the shareable draft address (`?draftId=` is appended).
    pub share_base_url: String,
}

impl Config {
    /// Load configuration from env vars, dotenv files and the default TOML file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_toml(None)
    }

    /// Load from env with an optional TOML config file overlay.
    ///
    /// If `explicit_path` is `Some`, the file must exist. Otherwise
    /// `~/.persona-forge/config.toml` is read when present.
    pub fn from_env_with_toml(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        crate::bootstrap::load_forge_env();

        let path = explicit_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Settings::default_toml_path);
        let settings = match Settings::load_toml(&path) {
            Ok(Some(settings)) => {
                tracing::debug!("Loaded TOML config from {}", path.display());
                settings
            }
            Ok(None) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Settings::default()
            }
            Err(e) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(e));
                }
                tracing::warn!("Failed to load default config file: {}", e);
                Settings::default()
            }
        };

        Self::build(&settings)
    }

    /// Build config from already-loaded settings.
    pub fn build(settings: &Settings) -> Result<Self, ConfigError> {
        let http_proxy_base = helpers::optional_env("HTTP_PROXY_BASE")?
            .or_else(|| settings.http_proxy_base.clone());
        if let Some(base) = &http_proxy_base {
            helpers::require_http_url("HTTP_PROXY_BASE", base)?;
        }

        let share_base_url = helpers::optional_env("SHARE_BASE_URL")?
            .or_else(|| settings.share_base_url.clone())
            .unwrap_or_else(|| DEFAULT_SHARE_BASE_URL.to_string());
        helpers::require_http_url("SHARE_BASE_URL", &share_base_url)?;

        Ok(Self {
            llm: LlmConfig::resolve(settings)?,
            chain: ChainConfig::resolve(settings)?,
            storage: StorageConfig::resolve(settings)?,
            wallet: WalletConfig::resolve(settings)?,
            mint: MintConfig::resolve(settings)?,
            http_proxy_base,
            share_base_url,
        })
    }

    /// Everything persona generation and chat need.
    pub fn validate_for_generate(&self) -> Result<(), ConfigError> {
        match &self.llm.api_key {
            Some(key) if !key.expose_secret().trim().is_empty() => Ok(()),
            _ => Err(ConfigError::MissingRequired {
                key: self.llm.api_key_env().to_string(),
                hint: "Set the LLM credential in the environment or ~/.persona-forge/.env"
                    .to_string(),
            }),
        }
    }

    /// Everything the mint workflow needs.
    pub fn validate_for_mint(&self) -> Result<(), ConfigError> {
        if self.mint.contract_address.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "INFT_CONTRACT_ADDRESS".to_string(),
                hint: "Set the deployed INFT contract address".to_string(),
            });
        }
        if self.storage.flow_contract.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "OG_FLOW_CONTRACT".to_string(),
                hint: "Set the 0G storage flow contract address".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const MANAGED_VARS: &[&str] = &[
        "LLM_BACKEND",
        "LLM_BASE_URL",
        "LLM_API_KEY",
        "OPENAI_API_KEY",
        "LLM_MODEL",
        "LLM_TIMEOUT_SECS",
        "OG_CHAIN_ID",
        "OG_CHAIN_NAME",
        "OG_RPC_URL",
        "OG_RPC_FALLBACK_URLS",
        "OG_EXPLORER_URL",
        "OG_INDEXER_RPC",
        "OG_INDEXER_FALLBACK_URLS",
        "OG_FLOW_CONTRACT",
        "OG_UPLOAD_TIMEOUT_SECS",
        "INFT_CONTRACT_ADDRESS",
        "INFT_CONTRACT_ABI",
        "WALLET_RPC_URL",
        "WALLET_TARGET",
        "HTTP_PROXY_BASE",
        "RECEIPT_POLL_INTERVAL_MS",
        "RECEIPT_TIMEOUT_SECS",
        "SHARE_BASE_URL",
    ];

    fn clear_env() {
        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            for key in MANAGED_VARS {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    fn resolvers_use_safe_defaults() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_env();

        let config = Config::build(&Settings::default()).expect("config");
        assert_eq!(config.llm.backend, LlmBackend::OpenAi);
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.chain.chain_id, 16601);
        assert_eq!(config.chain.rpc_urls, vec!["https://evmrpc-testnet.0g.ai"]);
        assert_eq!(
            config.storage.indexer_urls,
            vec!["https://indexer-storage-testnet-turbo.0g.ai"]
        );
        assert_eq!(config.storage.upload_timeout_secs, 60);
        assert_eq!(config.mint.contract_abi.len(), 2);
        assert!(config.http_proxy_base.is_none());
        assert_eq!(config.wallet.rpc_url, "http://127.0.0.1:1248");
        assert_eq!(config.wallet.target, "Frame");

        assert!(matches!(
            config.validate_for_generate(),
            Err(ConfigError::MissingRequired { ref key, .. }) if key == "OPENAI_API_KEY"
        ));
        assert!(matches!(
            config.validate_for_mint(),
            Err(ConfigError::MissingRequired { ref key, .. }) if key == "INFT_CONTRACT_ADDRESS"
        ));
    }

    #[test]
    fn resolvers_apply_env_overrides_and_fallback_lists() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_env();

        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::set_var("OPENAI_API_KEY", "sk-test-key-1234567890");
            std::env::set_var("OG_CHAIN_ID", "16602");
            std::env::set_var(
                "OG_RPC_FALLBACK_URLS",
                "https://rpc-b.example, https://evmrpc-testnet.0g.ai",
            );
            std::env::set_var("OG_INDEXER_FALLBACK_URLS", "https://indexer-b.example");
            std::env::set_var(
                "OG_FLOW_CONTRACT",
                "0x22e03a6a89b950f1c82ec5e74f8eca321a105296",
            );
            std::env::set_var(
                "INFT_CONTRACT_ADDRESS",
                "0x00000000000000000000000000000000000000aa",
            );
        }

        let config = Config::build(&Settings::default()).expect("config");
        assert_eq!(config.chain.chain_id, 16602);
        assert_eq!(
            config.chain.rpc_urls,
            vec!["https://evmrpc-testnet.0g.ai", "https://rpc-b.example"]
        );
        assert_eq!(
            config.storage.indexer_urls,
            vec![
                "https://indexer-storage-testnet-turbo.0g.ai",
                "https://indexer-b.example"
            ]
        );
        assert!(config.validate_for_generate().is_ok());
        assert!(config.validate_for_mint().is_ok());

        clear_env();
    }

    #[test]
    fn resolvers_reject_invalid_values() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_env();

        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::set_var(
                "INFT_CONTRACT_ADDRESS",
                "0x0000000000000000000000000000000000000000",
            );
        }
        match Config::build(&Settings::default()).unwrap_err() {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "INFT_CONTRACT_ADDRESS"),
            other => panic!("unexpected error: {other}"),
        }

        clear_env();
        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::set_var("OG_UPLOAD_TIMEOUT_SECS", "0");
        }
        match Config::build(&Settings::default()).unwrap_err() {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "OG_UPLOAD_TIMEOUT_SECS"),
            other => panic!("unexpected error: {other}"),
        }

        clear_env();
        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::set_var("LLM_BACKEND", "openai_compatible");
        }
        match Config::build(&Settings::default()).unwrap_err() {
            ConfigError::MissingRequired { key, .. } => assert_eq!(key, "LLM_BASE_URL"),
            other => panic!("unexpected error: {other}"),
        }

        clear_env();
    }

    #[test]
    fn zero_g_compute_backend_points_at_a_gateway() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_env();

        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::set_var("LLM_BACKEND", "0g-compute");
        }
        match Config::build(&Settings::default()).unwrap_err() {
            ConfigError::InvalidValue { key, message } => {
                assert_eq!(key, "LLM_BACKEND");
                assert!(message.contains("LLM_BACKEND=openai_compatible"));
            }
            other => panic!("unexpected error: {other}"),
        }

        clear_env();
    }

    #[test]
    fn settings_fill_in_when_env_is_silent() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_env();

        let mut settings = Settings::default();
        settings.llm_model = Some("deepseek-r1-70b".to_string());
        settings.storage.upload_timeout_secs = Some(15);
        settings.wallet.target = Some("Rabby".to_string());

        let config = Config::build(&settings).expect("config");
        assert_eq!(config.llm.model, "deepseek-r1-70b");
        assert_eq!(config.storage.upload_timeout_secs, 15);
        assert_eq!(config.wallet.target, "Rabby");
    }
}
