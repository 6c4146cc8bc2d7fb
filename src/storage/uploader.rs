//! Content-addressed uploads with (indexer, rpc) fallback.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ChainConfig, StorageConfig};
use crate::error::{StorageError, UploadFailure};
use crate::storage::UploadResult;
use crate::storage::merkle::MerkleTree;
use crate::storage::network::StorageNetwork;
use crate::wallet::SignerSource;

/// One endpoint pair tried by the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEndpoint {
    pub indexer: String,
    pub rpc: String,
}

impl UploadEndpoint {
    pub fn new(indexer: impl Into<String>, rpc: impl Into<String>) -> Self {
        Self {
            indexer: indexer.into(),
            rpc: rpc.into(),
        }
    }
}

/// Indexers outer, rpcs inner, primaries first.
pub fn endpoint_pairs(indexers: &[String], rpcs: &[String]) -> Vec<UploadEndpoint> {
    indexers
        .iter()
        .flat_map(|indexer| rpcs.iter().map(move |rpc| UploadEndpoint::new(indexer, rpc)))
        .collect()
}

pub struct AssetUploader {
    network: Arc<dyn StorageNetwork>,
    endpoints: Vec<UploadEndpoint>,
    attempt_timeout: Duration,
}

impl AssetUploader {
    pub fn new(
        network: Arc<dyn StorageNetwork>,
        endpoints: Vec<UploadEndpoint>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            network,
            endpoints,
            attempt_timeout,
        }
    }

    pub fn from_config(
        network: Arc<dyn StorageNetwork>,
        storage: &StorageConfig,
        chain: &ChainConfig,
    ) -> Self {
        Self::new(
            network,
            endpoint_pairs(&storage.indexer_urls, &chain.rpc_urls),
            Duration::from_secs(storage.upload_timeout_secs),
        )
    }

    pub fn endpoints(&self) -> &[UploadEndpoint] {
        &self.endpoints
    }

    /// Upload `blob` and return its root hash and commitment transaction.
    ///
    /// The root is computed once, so it is the same whichever pair succeeds.
    /// Each pair gets at most `attempt_timeout`; failures are collected in
    /// attempt order and returned together when every pair fails.
    pub async fn upload(
        &self,
        blob: &[u8],
        signers: &dyn SignerSource,
    ) -> Result<UploadResult, StorageError> {
        let tree = MerkleTree::build(blob)?;
        let root_hash = tree.root_hash();
        let signer = signers.signer().await?;

        let mut failures = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let attempt = self.network.upload(
                blob,
                &tree,
                &endpoint.indexer,
                &endpoint.rpc,
                signer.as_ref(),
            );
            let reason = match tokio::time::timeout(self.attempt_timeout, attempt).await {
                Ok(Ok(tx_hash)) => {
                    tracing::info!(
                        root = %root_hash,
                        tx_hash = %tx_hash,
                        indexer = %endpoint.indexer,
                        rpc = %endpoint.rpc,
                        "Upload succeeded"
                    );
                    return Ok(UploadResult { root_hash, tx_hash });
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => StorageError::Timeout(self.attempt_timeout).to_string(),
            };

            tracing::warn!(
                indexer = %endpoint.indexer,
                rpc = %endpoint.rpc,
                reason = %reason,
                "Upload attempt failed"
            );
            failures.push(UploadFailure {
                indexer: endpoint.indexer.clone(),
                rpc: endpoint.rpc.clone(),
                reason,
            });
        }

        Err(StorageError::AllEndpointsFailed { failures })
    }
}
