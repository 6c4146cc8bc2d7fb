//! Minimal Solidity ABI encoding for contract calls.
//!
//! Covers the static and dynamic types the storage flow and INFT contracts
//! take: `address`, `bytes32`, `uint256` and `string`.

use crate::crypto::keccak256;

const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address([u8; 20]),
    Bytes32([u8; 32]),
    Uint(u128),
    String(String),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Self::String(_))
    }

    fn head_word(&self) -> [u8; WORD] {
        let mut word = [0u8; WORD];
        match self {
            Self::Address(address) => word[12..].copy_from_slice(address),
            Self::Bytes32(bytes) => word.copy_from_slice(bytes),
            Self::Uint(value) => word[16..].copy_from_slice(&value.to_be_bytes()),
            Self::String(_) => {}
        }
        word
    }

    fn tail(&self) -> Vec<u8> {
        match self {
            Self::String(value) => {
                let bytes = value.as_bytes();
                let mut out = uint_word(bytes.len()).to_vec();
                out.extend_from_slice(bytes);
                out.resize(WORD + bytes.len().div_ceil(WORD) * WORD, 0);
                out
            }
            _ => Vec::new(),
        }
    }
}

fn uint_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

/// First four bytes of Keccak-256 over the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encode `tokens` as a head/tail argument block.
pub fn encode_arguments(tokens: &[Token]) -> Vec<u8> {
    let mut head = Vec::with_capacity(tokens.len() * WORD);
    let mut tail = Vec::new();
    let head_len = tokens.len() * WORD;

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word(head_len + tail.len()));
            tail.extend_from_slice(&token.tail());
        } else {
            head.extend_from_slice(&token.head_word());
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Selector followed by encoded arguments.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend_from_slice(&encode_arguments(tokens));
    out
}
