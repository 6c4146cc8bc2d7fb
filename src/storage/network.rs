//! Storage network client.
//!
//! The uploader only needs "put these bytes under this root through this
//! (indexer, rpc) pair and tell me the transaction hash", so the network is a
//! narrow trait.
//!
//! [`IndexerClient`] is a simplified stand-in, not a wire-compatible 0G
//! client. It commits the bare root with `submit(bytes32,uint256)` where the
//! real flow contract takes a `Submission` struct, and it pushes segments
//! through `zgs_uploadSegments` without the Merkle proofs real storage nodes
//! require. Talking to a live 0G deployment needs a [`StorageNetwork`]
//! implementation that speaks the full flow ABI and segment protocol.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::abi::{Token, encode_call};
use crate::error::{RpcError, StorageError};
use crate::http::HttpClient;
use crate::storage::merkle::{MerkleTree, padded_segments};
use crate::wallet::{TransactionSigner, TxReceipt, wait_for_receipt};

const SUBMIT_SIGNATURE: &str = "submit(bytes32,uint256)";

#[async_trait]
pub trait StorageNetwork: Send + Sync {
    /// Store `blob` (whose tree is `tree`) via one endpoint pair and return
    /// the commitment transaction hash.
    async fn upload(
        &self,
        blob: &[u8],
        tree: &MerkleTree,
        indexer_url: &str,
        rpc_url: &str,
        signer: &dyn TransactionSigner,
    ) -> Result<String, StorageError>;
}

#[derive(Debug, Default, Deserialize)]
struct ShardedNodes {
    #[serde(default)]
    trusted: Option<Vec<StorageNode>>,
    #[serde(default)]
    discovered: Option<Vec<StorageNode>>,
}

#[derive(Debug, Deserialize)]
struct StorageNode {
    url: String,
}

/// 0G indexer client.
pub struct IndexerClient {
    http: HttpClient,
    flow_contract: String,
    poll_interval: Duration,
    inclusion_timeout: Duration,
}

impl IndexerClient {
    pub fn new(http: HttpClient, flow_contract: impl Into<String>) -> Self {
        Self {
            http,
            flow_contract: flow_contract.into(),
            poll_interval: Duration::from_millis(1_500),
            inclusion_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_inclusion_polling(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.inclusion_timeout = timeout;
        self
    }

    async fn storage_nodes(&self, indexer_url: &str) -> Result<Vec<String>, StorageError> {
        let value = self
            .http
            .json_rpc(indexer_url, "indexer_getShardedNodes", json!([]))
            .await
            .map_err(|source| StorageError::Rpc {
                endpoint: indexer_url.to_string(),
                source,
            })?;
        let nodes: ShardedNodes =
            serde_json::from_value(value).map_err(|e| StorageError::Rpc {
                endpoint: indexer_url.to_string(),
                source: RpcError::Decode(e.to_string()),
            })?;

        let urls: Vec<String> = nodes
            .trusted
            .filter(|nodes| !nodes.is_empty())
            .or(nodes.discovered)
            .unwrap_or_default()
            .into_iter()
            .map(|node| node.url)
            .collect();
        if urls.is_empty() {
            return Err(StorageError::NoStorageNodes {
                indexer: indexer_url.to_string(),
            });
        }
        Ok(urls)
    }

    async fn wait_for_inclusion(&self, rpc_url: &str, tx_hash: &str) -> Result<(), StorageError> {
        let http = &self.http;
        let receipt = wait_for_receipt(
            move || async move {
                let value = http
                    .json_rpc(rpc_url, "eth_getTransactionReceipt", json!([tx_hash]))
                    .await
                    .map_err(|source| StorageError::Rpc {
                        endpoint: rpc_url.to_string(),
                        source,
                    })?;
                TxReceipt::from_value(value).map_err(|reason| StorageError::Submission {
                    tx_hash: tx_hash.to_string(),
                    reason,
                })
            },
            self.poll_interval,
            self.inclusion_timeout,
        )
        .await?;

        match receipt {
            Some(receipt) if receipt.reverted() => Err(StorageError::Submission {
                tx_hash: tx_hash.to_string(),
                reason: "flow submission reverted".to_string(),
            }),
            Some(_) => Ok(()),
            None => Err(StorageError::Submission {
                tx_hash: tx_hash.to_string(),
                reason: format!("not included within {:?}", self.inclusion_timeout),
            }),
        }
    }

    async fn push_segments(
        &self,
        node_url: &str,
        blob: &[u8],
        tree: &MerkleTree,
    ) -> Result<(), StorageError> {
        let root = tree.root_hash();
        let segments: Vec<Value> = padded_segments(blob)
            .enumerate()
            .map(|(index, data)| {
                json!({
                    "root": root,
                    "index": index,
                    "data": STANDARD.encode(data),
                    "fileSize": tree.size(),
                })
            })
            .collect();

        self.http
            .json_rpc(node_url, "zgs_uploadSegments", json!([segments]))
            .await
            .map_err(|source| StorageError::Rpc {
                endpoint: node_url.to_string(),
                source,
            })?;
        Ok(())
    }
}

#[async_trait]
impl StorageNetwork for IndexerClient {
    async fn upload(
        &self,
        blob: &[u8],
        tree: &MerkleTree,
        indexer_url: &str,
        rpc_url: &str,
        signer: &dyn TransactionSigner,
    ) -> Result<String, StorageError> {
        let nodes = self.storage_nodes(indexer_url).await?;

        let calldata = encode_call(
            SUBMIT_SIGNATURE,
            &[Token::Bytes32(tree.root()), Token::Uint(u128::from(tree.size()))],
        );
        let tx_hash = signer
            .send_transaction(&self.flow_contract, &calldata)
            .await?;
        tracing::info!(tx_hash = %tx_hash, root = %tree.root_hash(), "Storage commitment submitted");

        self.wait_for_inclusion(rpc_url, &tx_hash).await?;

        for node in &nodes {
            self.push_segments(node, blob, tree).await?;
        }
        tracing::debug!(nodes = nodes.len(), "Segments uploaded");
        Ok(tx_hash)
    }
}
