use async_trait::async_trait;
use serde_json::Value;

use crate::error::WalletError;
use crate::http::HttpClient;
use crate::wallet::{WalletIdentity, WalletProvider};

/// Wallet reached over HTTP JSON-RPC.
pub struct JsonRpcWallet {
    http: HttpClient,
    url: String,
    identity: WalletIdentity,
}

impl JsonRpcWallet {
    pub fn new(http: HttpClient, url: impl Into<String>, identity: WalletIdentity) -> Self {
        Self {
            http,
            url: url.into(),
            identity,
        }
    }

    /// Ask the endpoint who it is via `web3_clientVersion`.
    ///
    /// `"Frame/v0.6.9"` yields the identity `Frame`.
    pub async fn discover(http: HttpClient, url: impl Into<String>) -> Result<Self, WalletError> {
        let url = url.into();
        let version = http
            .json_rpc(&url, "web3_clientVersion", Value::Array(Vec::new()))
            .await
            .map_err(|e| WalletError::from_rpc("web3_clientVersion", e))?;
        let version = version.as_str().unwrap_or_default();
        let name = version.split('/').next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(WalletError::InvalidResponse {
                method: "web3_clientVersion".to_string(),
                reason: "empty client version".to_string(),
            });
        }
        tracing::debug!(wallet = %name, url = %url, "Discovered wallet endpoint");
        Ok(Self::new(http, url, WalletIdentity::named(name)))
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    fn identity(&self) -> &WalletIdentity {
        &self.identity
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        self.http
            .json_rpc(&self.url, method, params)
            .await
            .map_err(|e| WalletError::from_rpc(method, e))
    }
}
