//! In-memory wallet and storage network shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use persona_forge::config::{ChainConfig, DEFAULT_INFT_ABI};
use persona_forge::error::{StorageError, UNKNOWN_CHAIN_CODE, USER_REJECTED_CODE, WalletError};
use persona_forge::http::HttpClient;
use persona_forge::mint::{ChainDescriptor, InftContract, MintOrchestrator};
use persona_forge::storage::{AssetUploader, MerkleTree, StorageNetwork, UploadEndpoint};
use persona_forge::wallet::{InjectedWallets, TransactionSigner, WalletIdentity, WalletProvider};

pub const ACCOUNT: &str = "0x1111111111111111111111111111111111111111";
pub const CONTRACT: &str = "0x2222222222222222222222222222222222222222";
pub const MINT_TX: &str = "0xfeedfacefeedfacefeedfacefeedfacefeedfacefeedfacefeedfacefeedface";

/// What `eth_getTransactionReceipt` answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptMode {
    Success,
    Reverted,
    /// Always `null`, as if the transaction never gets mined.
    Pending,
}

/// Wallet that starts on an unknown chain and records every request.
pub struct FakeWallet {
    identity: WalletIdentity,
    chain_known: AtomicBool,
    send_error: Option<(i64, &'static str)>,
    receipt: ReceiptMode,
    pub calls: Mutex<Vec<String>>,
}

impl FakeWallet {
    pub fn new(name: &str) -> Self {
        Self {
            identity: WalletIdentity::named(name),
            chain_known: AtomicBool::new(false),
            send_error: None,
            receipt: ReceiptMode::Success,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(name: &str) -> Self {
        Self::failing_send(name, USER_REJECTED_CODE, "User denied transaction signature")
    }

    /// `eth_sendTransaction` fails with this wallet error.
    pub fn failing_send(name: &str, code: i64, message: &'static str) -> Self {
        Self {
            send_error: Some((code, message)),
            ..Self::new(name)
        }
    }

    pub fn with_receipt(mut self, receipt: ReceiptMode) -> Self {
        self.receipt = receipt;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    fn identity(&self) -> &WalletIdentity {
        &self.identity
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        self.calls.lock().unwrap().push(method.to_string());
        let rpc_error = |code: i64, message: &str| WalletError::Rpc {
            method: method.to_string(),
            code,
            message: message.to_string(),
        };

        match method {
            "eth_requestAccounts" => Ok(json!([ACCOUNT])),
            "wallet_switchEthereumChain" => {
                if self.chain_known.load(Ordering::SeqCst) {
                    Ok(Value::Null)
                } else {
                    Err(rpc_error(UNKNOWN_CHAIN_CODE, "Unrecognized chain ID"))
                }
            }
            "wallet_addEthereumChain" => {
                assert_eq!(params[0]["chainId"], "0x40d9");
                self.chain_known.store(true, Ordering::SeqCst);
                Ok(Value::Null)
            }
            "eth_sendTransaction" => {
                if let Some((code, message)) = self.send_error {
                    return Err(rpc_error(code, message));
                }
                assert_eq!(params[0]["from"], ACCOUNT);
                assert_eq!(params[0]["to"], CONTRACT);
                Ok(json!(MINT_TX))
            }
            "eth_getTransactionReceipt" => Ok(match self.receipt {
                ReceiptMode::Pending => Value::Null,
                mode => json!({
                    "transactionHash": params[0],
                    "blockNumber": "0x10",
                    "status": if mode == ReceiptMode::Reverted { "0x0" } else { "0x1" },
                }),
            }),
            other => Err(rpc_error(-32601, &format!("method {other} not supported"))),
        }
    }
}

/// Storage network that accepts every upload after an optional delay.
#[derive(Default)]
pub struct FakeNetwork {
    pub delay: Option<Duration>,
    pub uploads: AtomicUsize,
    pub blobs: Mutex<Vec<Vec<u8>>>,
}

impl FakeNetwork {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn blobs(&self) -> Vec<Vec<u8>> {
        self.blobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageNetwork for FakeNetwork {
    async fn upload(
        &self,
        blob: &[u8],
        _tree: &MerkleTree,
        _indexer_url: &str,
        _rpc_url: &str,
        _signer: &dyn TransactionSigner,
    ) -> Result<String, StorageError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        self.blobs.lock().unwrap().push(blob.to_vec());
        Ok(format!("0x{:064x}", n + 1))
    }
}

pub fn galileo() -> ChainConfig {
    ChainConfig {
        chain_id: 16601,
        chain_name: "0G Galileo Testnet".to_string(),
        rpc_urls: vec!["https://evmrpc-testnet.0g.ai".to_string()],
        explorer_url: "https://explorer.0g.ai/galileo".to_string(),
        currency_name: "OG".to_string(),
        currency_symbol: "OG".to_string(),
        currency_decimals: 18,
    }
}

pub fn orchestrator(wallet: Arc<FakeWallet>, network: Arc<FakeNetwork>) -> MintOrchestrator {
    orchestrator_with_timeout(wallet, network, Duration::from_secs(2))
}

pub fn orchestrator_with_timeout(
    wallet: Arc<FakeWallet>,
    network: Arc<FakeNetwork>,
    receipt_timeout: Duration,
) -> MintOrchestrator {
    let wallet: Arc<dyn WalletProvider> = wallet;
    let uploader = AssetUploader::new(
        network,
        vec![UploadEndpoint::new(
            "https://indexer.example",
            "https://rpc.example",
        )],
        Duration::from_secs(5),
    );
    let contract = InftContract::new(CONTRACT, &DEFAULT_INFT_ABI).unwrap();

    MintOrchestrator::new(
        HttpClient::new(Duration::from_secs(5)),
        InjectedWallets::single(wallet),
        "MetaMask",
        ChainDescriptor::from_config(&galileo()),
        uploader,
        contract,
    )
    .with_receipt_polling(Duration::from_millis(10), receipt_timeout)
}
