//! INFT contract binding.

use serde::Serialize;

use crate::abi::{Token, encode_call};
use crate::crypto::{parse_address, parse_bytes32};
use crate::error::MintError;
use crate::wallet::TransactionSigner;

/// One `function` entry of a human-readable ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiFunction {
    pub name: String,
    pub inputs: Vec<String>,
}

impl AbiFunction {
    /// Parse `function mint(address to,string uri) returns (uint256)`.
    /// The `function` keyword and parameter names are optional.
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        let entry = entry.strip_prefix("function ").unwrap_or(entry).trim_start();
        let open = entry.find('(')?;
        let close = open + entry[open..].find(')')?;

        let name = entry[..open].trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return None;
        }
        let inputs = entry[open + 1..close]
            .split(',')
            .map(str::trim)
            .filter(|param| !param.is_empty())
            .map(|param| param.split_whitespace().next().unwrap_or(param).to_string())
            .collect();

        Some(Self {
            name: name.to_string(),
            inputs,
        })
    }

    /// Canonical signature, e.g. `mint(address,string,bytes32)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.inputs.join(","))
    }
}

/// The mint entry point the contract exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MintMethod {
    /// `mint(address to, string encryptedURI, bytes32 metadataHash)`.
    StandardMint,
    /// `mintINFT(address to, string storageURI, string agentURI)`.
    LegacyMint,
}

impl MintMethod {
    pub fn signature(self) -> &'static str {
        match self {
            Self::StandardMint => "mint(address,string,bytes32)",
            Self::LegacyMint => "mintINFT(address,string,string)",
        }
    }

    /// Pick the method from the ABI, preferring [`MintMethod::StandardMint`].
    pub fn resolve<S: AsRef<str>>(abi: &[S]) -> Result<Self, MintError> {
        let signatures: Vec<String> = abi
            .iter()
            .filter_map(|entry| AbiFunction::parse(entry.as_ref()))
            .map(|function| function.signature())
            .collect();

        [Self::StandardMint, Self::LegacyMint]
            .into_iter()
            .find(|method| signatures.iter().any(|s| s == method.signature()))
            .ok_or(MintError::NoCompatibleMethod)
    }

    /// Calldata for minting `metadata_uri` to `to`.
    ///
    /// The legacy method has no hash slot and receives the metadata URI for
    /// both its storage and agent URI parameters.
    pub fn encode(
        self,
        to: &str,
        metadata_uri: &str,
        metadata_hash: &str,
    ) -> Result<Vec<u8>, MintError> {
        let to = parse_address(to).map_err(|reason| MintError::InvalidArgument {
            name: "to",
            reason,
        })?;
        let tokens = match self {
            Self::StandardMint => {
                let hash =
                    parse_bytes32(metadata_hash).map_err(|reason| MintError::InvalidArgument {
                        name: "metadataHash",
                        reason,
                    })?;
                vec![
                    Token::Address(to),
                    Token::String(metadata_uri.to_string()),
                    Token::Bytes32(hash),
                ]
            }
            Self::LegacyMint => vec![
                Token::Address(to),
                Token::String(metadata_uri.to_string()),
                Token::String(metadata_uri.to_string()),
            ],
        };
        Ok(encode_call(self.signature(), &tokens))
    }
}

/// Deployed INFT contract with its mint method resolved up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InftContract {
    address: String,
    method: MintMethod,
}

impl InftContract {
    pub fn new<S: AsRef<str>>(address: impl Into<String>, abi: &[S]) -> Result<Self, MintError> {
        let address = address.into();
        parse_address(&address).map_err(|reason| MintError::InvalidArgument {
            name: "contract",
            reason,
        })?;
        Ok(Self {
            address,
            method: MintMethod::resolve(abi)?,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn method(&self) -> MintMethod {
        self.method
    }

    /// Submit the mint and return its transaction hash.
    pub async fn mint(
        &self,
        signer: &dyn TransactionSigner,
        to: &str,
        metadata_uri: &str,
        metadata_hash: &str,
    ) -> Result<String, MintError> {
        let calldata = self.method.encode(to, metadata_uri, metadata_hash)?;
        tracing::debug!(method = self.method.signature(), contract = %self.address, "Calling INFT contract");
        signer
            .send_transaction(&self.address, &calldata)
            .await
            .map_err(MintError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::selector;
    use crate::config::DEFAULT_INFT_ABI;

    const TO: &str = "0x00000000000000000000000000000000000000a1";
    const HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

    #[test]
    fn parses_human_readable_entries() {
        let function = AbiFunction::parse(
            "function mint(address to,string encryptedURI,bytes32 metadataHash) returns (uint256)",
        )
        .unwrap();
        assert_eq!(function.signature(), "mint(address,string,bytes32)");
        assert_eq!(
            AbiFunction::parse("mintINFT(address, string, string)")
                .unwrap()
                .signature(),
            "mintINFT(address,string,string)"
        );
        assert!(AbiFunction::parse("event Transfer").is_none());
    }

    #[test]
    fn standard_mint_is_preferred() {
        assert_eq!(
            MintMethod::resolve(&DEFAULT_INFT_ABI).unwrap(),
            MintMethod::StandardMint
        );
        assert_eq!(
            MintMethod::resolve(&[DEFAULT_INFT_ABI[1]]).unwrap(),
            MintMethod::LegacyMint
        );
    }

    #[test]
    fn neither_method_is_a_compatibility_error() {
        let abi = ["function burn(uint256 tokenId)"];
        assert!(matches!(
            MintMethod::resolve(&abi),
            Err(MintError::NoCompatibleMethod)
        ));
        assert!(matches!(
            InftContract::new(TO, &abi),
            Err(MintError::NoCompatibleMethod)
        ));
    }

    #[test]
    fn standard_calldata_carries_hash_inline() {
        let data = MintMethod::StandardMint
            .encode(TO, "zg://0xmeta", HASH)
            .unwrap();
        assert_eq!(&data[..4], &selector("mint(address,string,bytes32)"));
        assert_eq!(data[4 + 31], 0xa1);
        // third head word is the hash
        assert!(data[4 + 64..4 + 96].iter().all(|b| *b == 0x11));
    }

    #[test]
    fn legacy_calldata_passes_uri_twice() {
        let data = MintMethod::LegacyMint
            .encode(TO, "zg://0xmeta", HASH)
            .unwrap();
        assert_eq!(&data[..4], &selector("mintINFT(address,string,string)"));
        let uri_hits = data
            .windows("zg://0xmeta".len())
            .filter(|w| *w == b"zg://0xmeta")
            .count();
        assert_eq!(uri_hits, 2);
    }

    #[test]
    fn bad_hash_is_an_argument_error() {
        assert!(matches!(
            MintMethod::StandardMint.encode(TO, "zg://x", "0x12"),
            Err(MintError::InvalidArgument {
                name: "metadataHash",
                ..
            })
        ));
    }
}
