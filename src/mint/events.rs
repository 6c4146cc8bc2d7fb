//! Mint progress events.

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MintStage {
    Idle,
    Connecting,
    SwitchingChain,
    UploadingImage,
    UploadingMetadata,
    CallingContract,
    Confirming,
    Failed,
}

impl MintStage {
    /// Short status label for the mint button / prompt.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Mint as INFT",
            Self::Connecting => "Connecting wallet...",
            Self::SwitchingChain => "Switching chain...",
            Self::UploadingImage => "Uploading image to 0G Storage...",
            Self::UploadingMetadata => "Uploading metadata.json to 0G Storage...",
            Self::CallingContract => "Calling INFT contract...",
            Self::Confirming => "Waiting for confirmation...",
            Self::Failed => "Mint failed",
        }
    }
}

impl fmt::Display for MintStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MintDetail {
    Entered,
    Account { address: String },
    ChainReady { chain_name: String, chain_id: String },
    ImageUploaded { root: String, tx_hash: String },
    MetadataPreview { json: String },
    MetadataUploaded { uri: String, hash: String, tx_hash: String },
    ContractSubmitted { tx_hash: String },
    Completed { tx_hash: String },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintEvent {
    pub stage: MintStage,
    pub detail: MintDetail,
}

impl MintEvent {
    pub fn log_line(&self) -> String {
        match &self.detail {
            MintDetail::Entered => match self.stage {
                MintStage::UploadingImage => "Step 1: Uploading image to 0G Storage...".to_string(),
                MintStage::UploadingMetadata => {
                    "Step 2: Uploading metadata.json to 0G Storage...".to_string()
                }
                MintStage::CallingContract => "Step 3: Calling INFT contract...".to_string(),
                stage => stage.label().to_string(),
            },
            MintDetail::Account { address } => format!("Using account: {address}"),
            MintDetail::ChainReady {
                chain_name,
                chain_id,
            } => format!("Switched to chain {chain_name} ({chain_id})."),
            MintDetail::ImageUploaded { root, tx_hash } => {
                format!("Image tx: {tx_hash} (imageRoot: {root})")
            }
            MintDetail::MetadataPreview { json } => format!("metadata preview: {json}"),
            MintDetail::MetadataUploaded { uri, hash, tx_hash } => {
                format!("Metadata tx: {tx_hash} (metadataURI: {uri}, metadataHash: {hash})")
            }
            MintDetail::ContractSubmitted { tx_hash } => format!("INFT tx: {tx_hash}"),
            MintDetail::Completed { .. } => "Mint transaction confirmed.".to_string(),
            MintDetail::Failed { message } => format!("Error: {message}"),
        }
    }
}

/// Sending half of the progress stream. A dropped receiver is not an error.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<MintEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MintEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that only traces.
    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, stage: MintStage, detail: MintDetail) {
        let event = MintEvent { stage, detail };
        tracing::info!(stage = ?event.stage, "{}", event.log_line());
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
