//! Connect, switch chain, upload, mint, confirm.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde_json::json;

use crate::error::{MintError, WalletError};
use crate::http::HttpClient;
use crate::llm::Persona;
use crate::mint::chain::{ChainDescriptor, ensure_chain};
use crate::mint::contract::{InftContract, MintMethod};
use crate::mint::events::{EventSink, MintDetail, MintStage};
use crate::mint::metadata::MintMetadata;
use crate::storage::{AssetUploader, ImageSource, storage_uri};
use crate::wallet::{
    InjectedWallets, TxReceipt, WalletProvider, WalletSigner, request_account, select_wallet,
    wait_for_receipt,
};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_500);
const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Where the image and metadata landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoragePointers {
    pub metadata_uri: String,
    pub metadata_hash: String,
    pub image_root: String,
    pub image_tx_hash: String,
    pub metadata_tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintReceipt {
    pub tx_hash: String,
    pub account: String,
    pub method: MintMethod,
    pub pointers: StoragePointers,
    pub explorer_url: Option<String>,
}

/// Clears the in-flight flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, MintError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| MintError::AlreadyInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct MintOrchestrator {
    http: HttpClient,
    wallets: InjectedWallets,
    wallet_target: String,
    chain: ChainDescriptor,
    uploader: AssetUploader,
    contract: InftContract,
    poll_interval: Duration,
    confirmation_timeout: Duration,
    in_flight: AtomicBool,
}

impl MintOrchestrator {
    pub fn new(
        http: HttpClient,
        wallets: InjectedWallets,
        wallet_target: impl Into<String>,
        chain: ChainDescriptor,
        uploader: AssetUploader,
        contract: InftContract,
    ) -> Self {
        Self {
            http,
            wallets,
            wallet_target: wallet_target.into(),
            chain,
            uploader,
            contract,
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_receipt_polling(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.confirmation_timeout = timeout;
        self
    }

    pub fn chain(&self) -> &ChainDescriptor {
        &self.chain
    }

    pub fn method(&self) -> MintMethod {
        self.contract.method()
    }

    pub fn is_minting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one mint attempt. Every failure is also emitted as a
    /// [`MintStage::Failed`] event.
    pub async fn mint(
        &self,
        persona: &Persona,
        image: Option<&ImageSource>,
        events: &EventSink,
    ) -> Result<MintReceipt, MintError> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        let result = self.run(persona, image, events).await;
        if let Err(e) = &result {
            events.emit(
                MintStage::Failed,
                MintDetail::Failed {
                    message: e.to_string(),
                },
            );
        }
        result
    }

    async fn run(
        &self,
        persona: &Persona,
        image: Option<&ImageSource>,
        events: &EventSink,
    ) -> Result<MintReceipt, MintError> {
        let image = image.ok_or(MintError::NoImage)?;
        let wallet = select_wallet(&self.wallets, &self.wallet_target).ok_or_else(|| {
            MintError::WalletUnavailable {
                target: self.wallet_target.clone(),
            }
        })?;

        events.emit(MintStage::Connecting, MintDetail::Entered);
        let account = request_account(wallet.as_ref()).await?;
        events.emit(
            MintStage::Connecting,
            MintDetail::Account {
                address: account.clone(),
            },
        );

        events.emit(MintStage::SwitchingChain, MintDetail::Entered);
        ensure_chain(wallet.as_ref(), &self.chain).await?;
        events.emit(
            MintStage::SwitchingChain,
            MintDetail::ChainReady {
                chain_name: self.chain.chain_name.clone(),
                chain_id: self.chain.chain_id.clone(),
            },
        );

        let signer = WalletSigner::new(Arc::clone(&wallet), account.clone());
        let pointers = self
            .upload_image_and_metadata(&signer, persona, image, events)
            .await?;

        events.emit(MintStage::CallingContract, MintDetail::Entered);
        let tx_hash = self
            .contract
            .mint(
                &signer,
                &account,
                &pointers.metadata_uri,
                &pointers.metadata_hash,
            )
            .await?;
        events.emit(
            MintStage::CallingContract,
            MintDetail::ContractSubmitted {
                tx_hash: tx_hash.clone(),
            },
        );

        events.emit(MintStage::Confirming, MintDetail::Entered);
        self.confirm(wallet.as_ref(), &tx_hash).await?;
        events.emit(
            MintStage::Idle,
            MintDetail::Completed {
                tx_hash: tx_hash.clone(),
            },
        );

        Ok(MintReceipt {
            explorer_url: self.chain.tx_url(&tx_hash),
            tx_hash,
            account,
            method: self.contract.method(),
            pointers,
        })
    }

    /// Upload the avatar, then the metadata document that points at it.
    pub async fn upload_image_and_metadata(
        &self,
        signer: &WalletSigner,
        persona: &Persona,
        image: &ImageSource,
        events: &EventSink,
    ) -> Result<StoragePointers, MintError> {
        events.emit(MintStage::UploadingImage, MintDetail::Entered);
        let blob = image.load(&self.http).await?;
        let image_upload = self.uploader.upload(&blob.bytes, signer).await?;
        events.emit(
            MintStage::UploadingImage,
            MintDetail::ImageUploaded {
                root: image_upload.root_hash.clone(),
                tx_hash: image_upload.tx_hash.clone(),
            },
        );

        events.emit(MintStage::UploadingMetadata, MintDetail::Entered);
        let created_at = chrono::Utc::now().timestamp_millis();
        let sealed = MintMetadata::new(persona, &image_upload.root_hash, created_at).seal()?;
        events.emit(
            MintStage::UploadingMetadata,
            MintDetail::MetadataPreview {
                json: sealed.json.clone(),
            },
        );
        let metadata_upload = self.uploader.upload(sealed.json.as_bytes(), signer).await?;
        let metadata_uri = storage_uri(&metadata_upload.root_hash);
        events.emit(
            MintStage::UploadingMetadata,
            MintDetail::MetadataUploaded {
                uri: metadata_uri.clone(),
                hash: sealed.hash.clone(),
                tx_hash: metadata_upload.tx_hash.clone(),
            },
        );

        Ok(StoragePointers {
            metadata_uri,
            metadata_hash: sealed.hash,
            image_root: image_upload.root_hash,
            image_tx_hash: image_upload.tx_hash,
            metadata_tx_hash: metadata_upload.tx_hash,
        })
    }

    async fn confirm(&self, wallet: &dyn WalletProvider, tx_hash: &str) -> Result<(), MintError> {
        let receipt = wait_for_receipt(
            move || async move {
                let value = wallet
                    .request("eth_getTransactionReceipt", json!([tx_hash]))
                    .await?;
                TxReceipt::from_value(value).map_err(|reason| WalletError::InvalidResponse {
                    method: "eth_getTransactionReceipt".to_string(),
                    reason,
                })
            },
            self.poll_interval,
            self.confirmation_timeout,
        )
        .await?;

        match receipt {
            Some(receipt) if receipt.reverted() => Err(MintError::Reverted {
                tx_hash: tx_hash.to_string(),
            }),
            Some(_) => Ok(()),
            None => Err(MintError::ConfirmationTimeout {
                tx_hash: tx_hash.to_string(),
                timeout: self.confirmation_timeout,
            }),
        }
    }
}
