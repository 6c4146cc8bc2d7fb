//! Merkle root over the 0G storage file layout.
//!
//! Data is cut into 256-byte chunks (the last one zero-padded) and grouped
//! into segments of 1024 chunks. Each segment root is the binary Keccak tree
//! over its chunk leaves, and the file root is the binary tree over segment
//! roots. An odd trailing node is promoted to the next level unchanged.

use crate::crypto::{encode_hex_prefixed, keccak256, keccak256_pair};
use crate::error::StorageError;

pub const CHUNK_SIZE: usize = 256;
pub const SEGMENT_CHUNKS: usize = 1024;
pub const SEGMENT_SIZE: usize = CHUNK_SIZE * SEGMENT_CHUNKS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    root: [u8; 32],
    segment_roots: Vec<[u8; 32]>,
    size: u64,
}

impl MerkleTree {
    pub fn build(data: &[u8]) -> Result<Self, StorageError> {
        if data.is_empty() {
            return Err(StorageError::EmptyBlob);
        }

        let segment_roots: Vec<[u8; 32]> = data.chunks(SEGMENT_SIZE).map(segment_root).collect();
        let root = binary_root(segment_roots.clone())
            .ok_or_else(|| StorageError::Merkle("no segments".to_string()))?;

        Ok(Self {
            root,
            segment_roots,
            size: data.len() as u64,
        })
    }

    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    /// `0x` + 64 lower-case hex characters.
    pub fn root_hash(&self) -> String {
        encode_hex_prefixed(&self.root)
    }

    pub fn segment_roots(&self) -> &[[u8; 32]] {
        &self.segment_roots
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Segments of `data`, each padded to a whole number of chunks.
pub fn padded_segments(data: &[u8]) -> impl Iterator<Item = Vec<u8>> + '_ {
    data.chunks(SEGMENT_SIZE).map(|segment| {
        let mut padded = segment.to_vec();
        padded.resize(segment.len().div_ceil(CHUNK_SIZE) * CHUNK_SIZE, 0);
        padded
    })
}

fn segment_root(segment: &[u8]) -> [u8; 32] {
    let leaves: Vec<[u8; 32]> = segment.chunks(CHUNK_SIZE).map(chunk_leaf).collect();
    // A segment always has at least one chunk.
    binary_root(leaves).unwrap_or_default()
}

fn chunk_leaf(chunk: &[u8]) -> [u8; 32] {
    if chunk.len() == CHUNK_SIZE {
        return keccak256(chunk);
    }
    let mut padded = [0u8; CHUNK_SIZE];
    padded[..chunk.len()].copy_from_slice(chunk);
    keccak256(&padded)
}

fn binary_root(mut level: Vec<[u8; 32]>) -> Option<[u8; 32]> {
    if level.is_empty() {
        return None;
    }
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => keccak256_pair(left, right),
                _ => pair[0],
            })
            .collect();
    }
    level.pop()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_data_is_rejected() {
        assert!(matches!(MerkleTree::build(&[]), Err(StorageError::EmptyBlob)));
    }

    #[test]
    fn single_chunk_root_is_padded_leaf_hash() {
        let tree = MerkleTree::build(b"hello").unwrap();
        let mut padded = [0u8; CHUNK_SIZE];
        padded[..5].copy_from_slice(b"hello");
        assert_eq!(tree.root(), keccak256(&padded));
        assert_eq!(tree.root_hash().len(), 66);
        assert!(tree.root_hash().starts_with("0x"));
    }

    #[test]
    fn odd_node_is_promoted() {
        let data = vec![7u8; CHUNK_SIZE * 3];
        let tree = MerkleTree::build(&data).unwrap();
        let leaf = keccak256(&[7u8; CHUNK_SIZE]);
        let expected = keccak256_pair(&keccak256_pair(&leaf, &leaf), &leaf);
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn multi_segment_root_combines_segment_roots() {
        let data = vec![1u8; SEGMENT_SIZE + 10];
        let tree = MerkleTree::build(&data).unwrap();
        assert_eq!(tree.segment_roots().len(), 2);
        let expected = keccak256_pair(&tree.segment_roots()[0], &tree.segment_roots()[1]);
        assert_eq!(tree.root(), expected);
        assert_eq!(tree.size(), (SEGMENT_SIZE + 10) as u64);
    }

    #[test]
    fn root_is_deterministic_and_content_sensitive() {
        let a = MerkleTree::build(b"persona").unwrap();
        let b = MerkleTree::build(b"persona").unwrap();
        let c = MerkleTree::build(b"persona!").unwrap();
        assert_eq!(a.root_hash(), b.root_hash());
        assert_ne!(a.root_hash(), c.root_hash());
    }

    #[test]
    fn padded_segments_round_up_to_chunks() {
        let data = vec![0u8; SEGMENT_SIZE + 300];
        let segments: Vec<_> = padded_segments(&data).collect();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len(), SEGMENT_SIZE);
        assert_eq!(segments[1].len(), 2 * CHUNK_SIZE);
    }
}
