//! Wires configured components into a runnable persona-forge session.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ConfigError, Error};
use crate::http::{HttpClient, ProxyRewrite};
use crate::llm::{ChatRelay, PersonaGenerator, create_provider};
use crate::mint::{ChainDescriptor, InftContract, MintOrchestrator};
use crate::storage::{AssetUploader, IndexerClient};
use crate::wallet::{InjectedWallets, JsonRpcWallet, WalletProvider};
use crate::workflow::{Confirm, PersonaWorkflow};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Configured components shared by every CLI command.
pub struct App {
    config: Config,
    http: HttpClient,
    generator: PersonaGenerator,
    relay: ChatRelay,
}

impl App {
    pub fn new(config: Config) -> Self {
        let http = HttpClient::new(HTTP_TIMEOUT)
            .with_proxy(config.http_proxy_base.clone().map(ProxyRewrite::new));
        let provider = create_provider(&config.llm, &http);
        Self {
            generator: PersonaGenerator::new(Arc::clone(&provider)),
            relay: ChatRelay::new(provider),
            config,
            http,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn generator(&self) -> &PersonaGenerator {
        &self.generator
    }

    pub fn relay(&self) -> &ChatRelay {
        &self.relay
    }

    /// Look for a wallet at the configured endpoint.
    ///
    /// An unreachable endpoint leaves the list empty, so a later mint reports
    /// the wallet as unavailable instead of failing here.
    pub async fn discover_wallets(&self) -> InjectedWallets {
        match JsonRpcWallet::discover(self.http.clone(), &self.config.wallet.rpc_url).await {
            Ok(wallet) => {
                let wallet: Arc<dyn WalletProvider> = Arc::new(wallet);
                InjectedWallets::single(wallet)
            }
            Err(e) => {
                tracing::warn!(
                    url = %self.config.wallet.rpc_url,
                    "No wallet at the configured endpoint: {e}"
                );
                InjectedWallets::default()
            }
        }
    }

    /// Build the mint pipeline. Fails when the contract or storage flow
    /// contract is not configured.
    pub async fn orchestrator(&self) -> Result<MintOrchestrator, Error> {
        self.config.validate_for_mint()?;
        let (Some(contract_address), Some(flow_contract)) = (
            self.config.mint.contract_address.as_deref(),
            self.config.storage.flow_contract.as_deref(),
        ) else {
            return Err(ConfigError::MissingRequired {
                key: "INFT_CONTRACT_ADDRESS".to_string(),
                hint: "Minting is not configured".to_string(),
            }
            .into());
        };

        let poll_interval = Duration::from_millis(self.config.mint.receipt_poll_interval_ms);
        let receipt_timeout = Duration::from_secs(self.config.mint.receipt_timeout_secs);

        let network = IndexerClient::new(self.http.clone(), flow_contract)
            .with_inclusion_polling(poll_interval, receipt_timeout);
        let uploader =
            AssetUploader::from_config(Arc::new(network), &self.config.storage, &self.config.chain);
        let contract = InftContract::new(contract_address, &self.config.mint.contract_abi)?;

        tracing::info!(
            contract = %contract.address(),
            method = contract.method().signature(),
            endpoints = uploader.endpoints().len(),
            "Mint pipeline ready"
        );

        Ok(MintOrchestrator::new(
            self.http.clone(),
            self.discover_wallets().await,
            self.config.wallet.target.clone(),
            ChainDescriptor::from_config(&self.config.chain),
            uploader,
            contract,
        )
        .with_receipt_polling(poll_interval, receipt_timeout))
    }

    /// Workflow controller for an interactive session. Minting is attached
    /// only when it is configured.
    pub async fn workflow(&self, confirm: Box<dyn Confirm>) -> Result<PersonaWorkflow, Error> {
        let workflow = PersonaWorkflow::new(
            self.generator.clone(),
            self.relay.clone(),
            confirm,
            &self.config.share_base_url,
        )?;
        match self.orchestrator().await {
            Ok(orchestrator) => Ok(workflow.with_orchestrator(Arc::new(orchestrator))),
            Err(Error::Config(e)) => {
                tracing::info!("Minting disabled: {e}");
                Ok(workflow)
            }
            Err(e) => Err(e),
        }
    }
}
