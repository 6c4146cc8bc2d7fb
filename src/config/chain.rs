use crate::config::helpers::{optional_env, require_http_url, split_list};
use crate::error::ConfigError;
use crate::settings::Settings;

const DEFAULT_CHAIN_ID: u64 = 16601;
const DEFAULT_CHAIN_NAME: &str = "0G Galileo Testnet";
const DEFAULT_RPC_URL: &str = "https://evmrpc-testnet.0g.ai";
const DEFAULT_EXPLORER_URL: &str = "https://explorer.0g.ai/galileo";

/// Target chain for storage submissions and minting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub chain_name: String,
    /// Primary RPC first, then fallbacks in preference order.
    pub rpc_urls: Vec<String>,
    pub explorer_url: String,
    pub currency_name: String,
    pub currency_symbol: String,
    pub currency_decimals: u8,
}

impl ChainConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let chain_id = optional_env("OG_CHAIN_ID")?
            .map(|s| s.parse::<u64>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "OG_CHAIN_ID".to_string(),
                message: format!("must be a decimal chain id: {e}"),
            })?
            .or(settings.chain.chain_id)
            .unwrap_or(DEFAULT_CHAIN_ID);
        if chain_id == 0 {
            return Err(ConfigError::InvalidValue {
                key: "OG_CHAIN_ID".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let primary = optional_env("OG_RPC_URL")?
            .or_else(|| settings.chain.rpc_url.clone())
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        let fallbacks = match optional_env("OG_RPC_FALLBACK_URLS")? {
            Some(raw) => split_list(&raw),
            None => settings.chain.rpc_fallback_urls.clone(),
        };

        let mut rpc_urls = vec![primary];
        for url in fallbacks {
            if !rpc_urls.contains(&url) {
                rpc_urls.push(url);
            }
        }
        for url in &rpc_urls {
            require_http_url("OG_RPC_URL", url)?;
        }

        let explorer_url = optional_env("OG_EXPLORER_URL")?
            .or_else(|| settings.chain.explorer_url.clone())
            .unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string());

        Ok(Self {
            chain_id,
            chain_name: optional_env("OG_CHAIN_NAME")?
                .or_else(|| settings.chain.chain_name.clone())
                .unwrap_or_else(|| DEFAULT_CHAIN_NAME.to_string()),
            rpc_urls,
            explorer_url: explorer_url.trim_end_matches('/').to_string(),
            currency_name: "OG".to_string(),
            currency_symbol: "OG".to_string(),
            currency_decimals: 18,
        })
    }

    pub fn primary_rpc(&self) -> &str {
        &self.rpc_urls[0]
    }
}
