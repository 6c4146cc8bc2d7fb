//! 0G storage uploads.

pub mod blob;
pub mod merkle;
pub mod network;
pub mod uploader;

use serde::Serialize;

pub use blob::{ImageBlob, ImageSource};
pub use merkle::MerkleTree;
pub use network::{IndexerClient, StorageNetwork};
pub use uploader::{AssetUploader, UploadEndpoint};

/// Where an uploaded blob landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub root_hash: String,
    pub tx_hash: String,
}

impl UploadResult {
    pub fn uri(&self) -> String {
        storage_uri(&self.root_hash)
    }
}

/// `zg://<root>`.
pub fn storage_uri(root_hash: &str) -> String {
    format!("zg://{root_hash}")
}
