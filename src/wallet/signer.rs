//! Transaction signing through the wallet.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::crypto::encode_hex_prefixed;
use crate::error::WalletError;
use crate::wallet::{WalletProvider, request_account};

/// `eth_sendTransaction` parameter object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl TransactionRequest {
    pub fn call(from: impl Into<String>, to: impl Into<String>, calldata: &[u8]) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            data: encode_hex_prefixed(calldata),
            value: None,
        }
    }
}

/// Something that can sign and broadcast a transaction.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> &str;

    /// Submit a call and return its transaction hash.
    async fn send_transaction(
        &self,
        to: &str,
        calldata: &[u8],
    ) -> Result<String, WalletError>;
}

/// Hands out a signer on demand.
#[async_trait]
pub trait SignerSource: Send + Sync {
    async fn signer(&self) -> Result<Arc<dyn TransactionSigner>, WalletError>;
}

/// Signer backed by a wallet account.
#[derive(Clone)]
pub struct WalletSigner {
    wallet: Arc<dyn WalletProvider>,
    address: String,
}

impl WalletSigner {
    pub fn new(wallet: Arc<dyn WalletProvider>, address: impl Into<String>) -> Self {
        Self {
            wallet,
            address: address.into(),
        }
    }

    /// Connect and use the wallet's first account.
    pub async fn connect(wallet: Arc<dyn WalletProvider>) -> Result<Self, WalletError> {
        let address = request_account(wallet.as_ref()).await?;
        Ok(Self::new(wallet, address))
    }
}

#[async_trait]
impl TransactionSigner for WalletSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn send_transaction(
        &self,
        to: &str,
        calldata: &[u8],
    ) -> Result<String, WalletError> {
        let tx = TransactionRequest::call(&self.address, to, calldata);
        let params = serde_json::to_value([tx]).map_err(|e| WalletError::InvalidResponse {
            method: "eth_sendTransaction".to_string(),
            reason: e.to_string(),
        })?;
        let value = self.wallet.request("eth_sendTransaction", params).await?;
        match value {
            Value::String(hash) if !hash.is_empty() => {
                tracing::debug!(tx_hash = %hash, to = %to, "Transaction submitted");
                Ok(hash)
            }
            other => Err(WalletError::InvalidResponse {
                method: "eth_sendTransaction".to_string(),
                reason: format!("expected a transaction hash, got {other}"),
            }),
        }
    }
}

/// Every wallet is a signer source: each request reconnects and takes the
/// first account.
#[async_trait]
impl SignerSource for Arc<dyn WalletProvider> {
    async fn signer(&self) -> Result<Arc<dyn TransactionSigner>, WalletError> {
        let signer = WalletSigner::connect(Arc::clone(self)).await?;
        Ok(Arc::new(signer))
    }
}

/// A signer already bound to an account.
#[async_trait]
impl SignerSource for WalletSigner {
    async fn signer(&self) -> Result<Arc<dyn TransactionSigner>, WalletError> {
        Ok(Arc::new(self.clone()))
    }
}
