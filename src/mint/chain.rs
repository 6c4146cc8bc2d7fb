//! Chain switching through the wallet.

use serde::Serialize;
use serde_json::json;

use crate::config::ChainConfig;
use crate::error::WalletError;
use crate::wallet::WalletProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// `wallet_addEthereumChain` parameter object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    /// `0x`-prefixed, unpadded hex.
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl ChainDescriptor {
    pub fn from_config(config: &ChainConfig) -> Self {
        Self {
            chain_id: format!("0x{:x}", config.chain_id),
            chain_name: config.chain_name.clone(),
            native_currency: NativeCurrency {
                name: config.currency_name.clone(),
                symbol: config.currency_symbol.clone(),
                decimals: config.currency_decimals,
            },
            rpc_urls: vec![config.primary_rpc().to_string()],
            block_explorer_urls: vec![config.explorer_url.clone()],
        }
    }

    /// Explorer link for a transaction.
    pub fn tx_url(&self, tx_hash: &str) -> Option<String> {
        self.block_explorer_urls
            .first()
            .map(|base| format!("{}/tx/{tx_hash}", base.trim_end_matches('/')))
    }
}

/// How the wallet ended up on the target chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainSwitch {
    Switched,
    AddedThenSwitched,
}

/// Switch to `descriptor`, registering it first if the wallet reports 4902.
pub async fn ensure_chain(
    wallet: &dyn WalletProvider,
    descriptor: &ChainDescriptor,
) -> Result<ChainSwitch, WalletError> {
    let switch_params = json!([{ "chainId": descriptor.chain_id }]);
    match wallet
        .request("wallet_switchEthereumChain", switch_params.clone())
        .await
    {
        Ok(_) => Ok(ChainSwitch::Switched),
        Err(e) if e.is_unknown_chain() => {
            tracing::info!(chain_id = %descriptor.chain_id, "Wallet does not know the chain; adding it");
            wallet
                .request("wallet_addEthereumChain", json!([descriptor]))
                .await?;
            wallet
                .request("wallet_switchEthereumChain", switch_params)
                .await?;
            Ok(ChainSwitch::AddedThenSwitched)
        }
        Err(e) => Err(e),
    }
}
