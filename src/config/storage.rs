use crate::config::helpers::{optional_env, parse_positive_u64_env, require_http_url, split_list};
use crate::error::ConfigError;
use crate::settings::Settings;

const DEFAULT_INDEXER_RPC: &str = "https://indexer-storage-testnet-turbo.0g.ai";
const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 60;

/// 0G storage upload configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Primary indexer first, then fallbacks in preference order.
    pub indexer_urls: Vec<String>,
    /// Flow contract that records file commitments. Required to upload.
    pub flow_contract: Option<String>,
    /// Hard timeout for a single (indexer, rpc) attempt.
    pub upload_timeout_secs: u64,
}

impl StorageConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let primary = optional_env("OG_INDEXER_RPC")?
            .or_else(|| settings.storage.indexer_rpc.clone())
            .unwrap_or_else(|| DEFAULT_INDEXER_RPC.to_string());
        let fallbacks = match optional_env("OG_INDEXER_FALLBACK_URLS")? {
            Some(raw) => split_list(&raw),
            None => settings.storage.indexer_fallback_urls.clone(),
        };

        let mut indexer_urls = vec![primary];
        for url in fallbacks {
            if !indexer_urls.contains(&url) {
                indexer_urls.push(url);
            }
        }
        for url in &indexer_urls {
            require_http_url("OG_INDEXER_RPC", url)?;
        }

        let flow_contract = optional_env("OG_FLOW_CONTRACT")?
            .or_else(|| settings.storage.flow_contract.clone());
        if let Some(address) = &flow_contract {
            crate::crypto::parse_address(address).map_err(|message| {
                ConfigError::InvalidValue {
                    key: "OG_FLOW_CONTRACT".to_string(),
                    message,
                }
            })?;
        }

        let upload_timeout_secs = parse_positive_u64_env(
            "OG_UPLOAD_TIMEOUT_SECS",
            settings
                .storage
                .upload_timeout_secs
                .unwrap_or(DEFAULT_UPLOAD_TIMEOUT_SECS),
        )?;

        Ok(Self {
            indexer_urls,
            flow_contract,
            upload_timeout_secs,
        })
    }
}
