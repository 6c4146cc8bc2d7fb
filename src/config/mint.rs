use crate::config::helpers::{optional_env, parse_positive_u64_env, require_http_url};
use crate::error::ConfigError;
use crate::settings::Settings;

const DEFAULT_WALLET_RPC_URL: &str = "http://127.0.0.1:1248";

/// Frame serves JSON-RPC on 1248 and reports itself as `Frame/<version>`.
pub const DEFAULT_WALLET_TARGET: &str = "Frame";
const DEFAULT_RECEIPT_POLL_INTERVAL_MS: u64 = 1_500;
const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 180;
const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Human-readable ABI entries the INFT contract is expected to expose.
pub const DEFAULT_INFT_ABI: [&str; 2] = [
    "function mint(address to,string encryptedURI,bytes32 metadataHash) returns (uint256)",
    "function mintINFT(address to,string storageURI,string agentURI) returns (uint256)",
];

/// Wallet endpoint and identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConfig {
    /// EIP-1193 JSON-RPC endpoint (Frame, a local signer, a dev node).
    pub rpc_url: String,
    /// Self-reported wallet identity the accessor accepts.
    pub target: String,
}

impl WalletConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let rpc_url = optional_env("WALLET_RPC_URL")?
            .or_else(|| settings.wallet.rpc_url.clone())
            .unwrap_or_else(|| DEFAULT_WALLET_RPC_URL.to_string());
        require_http_url("WALLET_RPC_URL", &rpc_url)?;

        Ok(Self {
            rpc_url,
            target: optional_env("WALLET_TARGET")?
                .or_else(|| settings.wallet.target.clone())
                .unwrap_or_else(|| DEFAULT_WALLET_TARGET.to_string()),
        })
    }
}

/// INFT contract and confirmation policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintConfig {
    /// Required to mint. The zero address is rejected.
    pub contract_address: Option<String>,
    pub contract_abi: Vec<String>,
    pub receipt_poll_interval_ms: u64,
    pub receipt_timeout_secs: u64,
}

impl MintConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let contract_address = optional_env("INFT_CONTRACT_ADDRESS")?
            .or_else(|| settings.mint.contract_address.clone());
        if let Some(address) = &contract_address {
            crate::crypto::parse_address(address).map_err(|message| {
                ConfigError::InvalidValue {
                    key: "INFT_CONTRACT_ADDRESS".to_string(),
                    message,
                }
            })?;
            if address.eq_ignore_ascii_case(ZERO_ADDRESS) {
                return Err(ConfigError::InvalidValue {
                    key: "INFT_CONTRACT_ADDRESS".to_string(),
                    message: "the zero address is a placeholder, not a deployed contract"
                        .to_string(),
                });
            }
        }

        let contract_abi = match optional_env("INFT_CONTRACT_ABI")? {
            Some(raw) => raw
                .split(';')
                .map(|entry| entry.trim().to_string())
                .filter(|entry| !entry.is_empty())
                .collect(),
            None if !settings.mint.contract_abi.is_empty() => settings.mint.contract_abi.clone(),
            None => DEFAULT_INFT_ABI.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            contract_address,
            contract_abi,
            receipt_poll_interval_ms: parse_positive_u64_env(
                "RECEIPT_POLL_INTERVAL_MS",
                settings
                    .mint
                    .receipt_poll_interval_ms
                    .unwrap_or(DEFAULT_RECEIPT_POLL_INTERVAL_MS),
            )?,
            receipt_timeout_secs: parse_positive_u64_env(
                "RECEIPT_TIMEOUT_SECS",
                settings
                    .mint
                    .receipt_timeout_secs
                    .unwrap_or(DEFAULT_RECEIPT_TIMEOUT_SECS),
            )?,
        })
    }
}
