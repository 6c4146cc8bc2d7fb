//! EIP-1193 wallet access.
//!
//! A wallet is anything that answers `request(method, params)`. The
//! [`accessor`] picks the single trusted provider out of whatever is
//! injected; [`JsonRpcWallet`] forwards requests to an HTTP JSON-RPC
//! endpoint such as Frame or a dev node with unlocked accounts.

pub mod accessor;
mod json_rpc;
pub mod receipt;
pub mod signer;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::WalletError;

pub use accessor::select_wallet;
pub use json_rpc::JsonRpcWallet;
pub use receipt::{TxReceipt, wait_for_receipt};
pub use signer::{SignerSource, TransactionRequest, TransactionSigner, WalletSigner};

/// What a provider says about itself.
///
/// `claims` mirrors the `isMetaMask`-style flags of injected providers: a
/// wallet may claim more than one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletIdentity {
    pub name: String,
    pub claims: Vec<String>,
}

impl WalletIdentity {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            claims: vec![name.clone()],
            name,
        }
    }

    /// Whether the provider claims to be `target` (case-insensitive).
    pub fn is(&self, target: &str) -> bool {
        self.claims
            .iter()
            .any(|claim| claim.eq_ignore_ascii_case(target))
    }
}

/// An EIP-1193 request surface.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn identity(&self) -> &WalletIdentity;

    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError>;
}

/// The injected provider object plus the `providers` list some extensions
/// expose when several wallets compete for the same slot.
#[derive(Clone, Default)]
pub struct InjectedWallets {
    pub primary: Option<Arc<dyn WalletProvider>>,
    pub providers: Vec<Arc<dyn WalletProvider>>,
}

impl InjectedWallets {
    pub fn single(wallet: Arc<dyn WalletProvider>) -> Self {
        Self {
            primary: Some(wallet),
            providers: Vec::new(),
        }
    }
}

impl std::fmt::Debug for InjectedWallets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectedWallets")
            .field("primary", &self.primary.as_ref().map(|w| w.identity().name.clone()))
            .field(
                "providers",
                &self
                    .providers
                    .iter()
                    .map(|w| w.identity().name.clone())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// `eth_requestAccounts`, returning the first account.
pub async fn request_account(wallet: &dyn WalletProvider) -> Result<String, WalletError> {
    let value = wallet
        .request("eth_requestAccounts", Value::Array(Vec::new()))
        .await?;
    let accounts: Vec<String> =
        serde_json::from_value(value).map_err(|e| WalletError::InvalidResponse {
            method: "eth_requestAccounts".to_string(),
            reason: e.to_string(),
        })?;
    accounts.into_iter().next().ok_or(WalletError::NoAccounts)
}
