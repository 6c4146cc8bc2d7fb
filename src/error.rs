//! Error types for persona-forge.

use std::time::Duration;

use serde::Serialize;

/// Wallet-reported code for a user-rejected request (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;
/// Wallet-reported code for a chain the wallet does not know yet.
pub const UNKNOWN_CHAIN_CODE: i64 = 4902;
/// JSON-RPC server error most wallets use for insufficient funds or gas.
pub const INSUFFICIENT_FUNDS_CODE: i64 = -32000;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Mint error: {0}")]
    Mint(#[from] MintError),
}

/// Failure domains used to pick user-facing copy.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDomain {
    Config,
    Network,
    ModelOutput,
    Wallet,
    Contract,
    Unknown,
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON-RPC call failures shared by the wallet, indexer and chain RPC clients.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed RPC response: {0}")]
    Decode(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Input text is empty")]
    EmptyInput,

    #[error("Provider {provider} returned HTTP {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Model output is not valid persona JSON: {reason}")]
    MalformedPersona { reason: String },

    #[error("Model output violates the persona contract: field '{field}' is empty")]
    InvalidPersona { field: &'static str },

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl LlmError {
    /// Malformed model output, as opposed to a transport or backend failure.
    pub fn is_model_output_error(&self) -> bool {
        matches!(self, Self::MalformedPersona { .. } | Self::InvalidPersona { .. })
    }
}

/// Wallet interaction errors.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Wallet returned no accounts")]
    NoAccounts,

    #[error("Wallet request {method} failed with code {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Wallet request {method} failed: {reason}")]
    Transport { method: String, reason: String },

    #[error("Unexpected wallet response to {method}: {reason}")]
    InvalidResponse { method: String, reason: String },
}

impl WalletError {
    /// Build from a JSON-RPC failure, keeping the wallet code when present.
    pub fn from_rpc(method: &str, err: RpcError) -> Self {
        match err {
            RpcError::Rpc { code, message } => Self::Rpc {
                method: method.to_string(),
                code,
                message,
            },
            RpcError::Decode(reason) => Self::InvalidResponse {
                method: method.to_string(),
                reason,
            },
            other => Self::Transport {
                method: method.to_string(),
                reason: other.to_string(),
            },
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code() == Some(USER_REJECTED_CODE)
    }

    pub fn is_unknown_chain(&self) -> bool {
        self.code() == Some(UNKNOWN_CHAIN_CODE)
    }

    pub fn is_insufficient_funds(&self) -> bool {
        self.code() == Some(INSUFFICIENT_FUNDS_CODE)
    }
}

/// One failed (indexer, rpc) upload attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub indexer: String,
    pub rpc: String,
    pub reason: String,
}

impl std::fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[indexer={} rpc={}] {}",
            self.indexer, self.rpc, self.reason
        )
    }
}

fn join_failures(failures: &[UploadFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Storage network errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Refusing to upload an empty blob")]
    EmptyBlob,

    #[error("Merkle error: {0}")]
    Merkle(String),

    #[error("Signer unavailable: {0}")]
    Signer(#[from] WalletError),

    #[error("Indexer {indexer} returned no storage nodes")]
    NoStorageNodes { indexer: String },

    #[error("RPC call to {endpoint} failed: {source}")]
    Rpc {
        endpoint: String,
        #[source]
        source: RpcError,
    },

    #[error("Storage transaction {tx_hash} was not confirmed: {reason}")]
    Submission { tx_hash: String, reason: String },

    #[error("Upload timed out after {0:?}")]
    Timeout(Duration),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Upload failed on all {} endpoint(s): {}", .failures.len(), join_failures(.failures))]
    AllEndpointsFailed { failures: Vec<UploadFailure> },
}

/// Mint workflow errors.
#[derive(Debug, thiserror::Error)]
pub enum MintError {
    #[error("Please enable {target}")]
    WalletUnavailable { target: String },

    #[error("A mint is already in progress")]
    AlreadyInProgress,

    #[error("No image provided")]
    NoImage,

    #[error("No compatible mint method on the INFT contract")]
    NoCompatibleMethod,

    #[error("Invalid contract argument {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("User rejected the transaction")]
    UserRejected,

    #[error("Insufficient funds or gas")]
    InsufficientFunds,

    #[error("{0}")]
    Wallet(WalletError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Failed to serialize metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Mint transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("Mint transaction {tx_hash} not confirmed within {timeout:?}")]
    ConfirmationTimeout { tx_hash: String, timeout: Duration },
}

impl From<WalletError> for MintError {
    fn from(err: WalletError) -> Self {
        if err.is_user_rejected() {
            Self::UserRejected
        } else if err.is_insufficient_funds() {
            Self::InsufficientFunds
        } else {
            Self::Wallet(err)
        }
    }
}

impl Error {
    pub fn domain(&self) -> ErrorDomain {
        match self {
            Self::Config(_) => ErrorDomain::Config,
            Self::Llm(err) => match err {
                LlmError::Config(_) => ErrorDomain::Config,
                err if err.is_model_output_error() => ErrorDomain::ModelOutput,
                _ => ErrorDomain::Network,
            },
            Self::Wallet(_) => ErrorDomain::Wallet,
            Self::Storage(_) => ErrorDomain::Network,
            Self::Mint(err) => match err {
                MintError::WalletUnavailable { .. }
                | MintError::UserRejected
                | MintError::InsufficientFunds
                | MintError::Wallet(_) => ErrorDomain::Wallet,
                MintError::NoCompatibleMethod
                | MintError::InvalidArgument { .. }
                | MintError::Reverted { .. } => ErrorDomain::Contract,
                MintError::Config(_) => ErrorDomain::Config,
                MintError::Storage(_) | MintError::ConfirmationTimeout { .. } => {
                    ErrorDomain::Network
                }
                MintError::AlreadyInProgress | MintError::NoImage | MintError::Metadata(_) => {
                    ErrorDomain::Unknown
                }
            },
        }
    }

    /// Message suitable for the status line of the front-end.
    pub fn user_message(&self) -> String {
        match self {
            Self::Llm(err) if err.is_model_output_error() => {
                format!("The model returned malformed persona output ({err})")
            }
            Self::Llm(LlmError::Config(err)) => err.to_string(),
            Self::Llm(err) => format!("Network/LLM error: {err}"),
            Self::Mint(MintError::UserRejected) => "User rejected the transaction.".to_string(),
            Self::Mint(MintError::InsufficientFunds) => "Insufficient funds or gas.".to_string(),
            Self::Mint(err) => err.to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_codes_map_to_mint_errors() {
        let rejected = WalletError::Rpc {
            method: "eth_sendTransaction".to_string(),
            code: USER_REJECTED_CODE,
            message: "User denied".to_string(),
        };
        assert!(matches!(MintError::from(rejected), MintError::UserRejected));

        let broke = WalletError::Rpc {
            method: "eth_sendTransaction".to_string(),
            code: INSUFFICIENT_FUNDS_CODE,
            message: "insufficient funds for gas".to_string(),
        };
        assert!(matches!(MintError::from(broke), MintError::InsufficientFunds));

        let other = WalletError::Rpc {
            method: "eth_sendTransaction".to_string(),
            code: -32603,
            message: "internal".to_string(),
        };
        assert!(matches!(MintError::from(other), MintError::Wallet(_)));
    }

    #[test]
    fn storage_errors_belong_to_the_network_domain() {
        assert_eq!(Error::from(StorageError::EmptyBlob).domain(), ErrorDomain::Network);
        assert_eq!(
            Error::from(StorageError::NoStorageNodes {
                indexer: "https://indexer.example".to_string(),
            })
            .domain(),
            ErrorDomain::Network
        );
    }

    #[test]
    fn aggregate_upload_error_lists_every_attempt_in_order() {
        let err = StorageError::AllEndpointsFailed {
            failures: vec![
                UploadFailure {
                    indexer: "idx-a".to_string(),
                    rpc: "rpc-1".to_string(),
                    reason: "missing revert data".to_string(),
                },
                UploadFailure {
                    indexer: "idx-a".to_string(),
                    rpc: "rpc-2".to_string(),
                    reason: "timeout".to_string(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("Upload failed on all 2 endpoint(s)"));
        let first = text.find("[indexer=idx-a rpc=rpc-1] missing revert data").unwrap();
        let second = text.find("[indexer=idx-a rpc=rpc-2] timeout").unwrap();
        assert!(first < second);
    }

    #[test]
    fn model_output_errors_have_distinct_copy() {
        let parse = Error::from(LlmError::MalformedPersona {
            reason: "expected value at line 1".to_string(),
        });
        assert_eq!(parse.domain(), ErrorDomain::ModelOutput);
        assert!(parse.user_message().contains("malformed persona output"));

        let http = Error::from(LlmError::Http {
            provider: "openai".to_string(),
            status: 500,
            body: "boom".to_string(),
        });
        assert_eq!(http.domain(), ErrorDomain::Network);
        assert!(http.user_message().starts_with("Network/LLM error"));
    }

    #[test]
    fn mint_wallet_errors_use_fixed_copy() {
        let err = Error::from(MintError::UserRejected);
        assert_eq!(err.domain(), ErrorDomain::Wallet);
        assert_eq!(err.user_message(), "User rejected the transaction.");
        assert_eq!(
            Error::from(MintError::InsufficientFunds).user_message(),
            "Insufficient funds or gas."
        );
    }
}
