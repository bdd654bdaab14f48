/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Binary Merkle tree over the live key-value pairs of a snapshot, and inclusion proofs against its
//! root.
//!
//! ## Construction
//!
//! Leaves are the key-value pairs of a snapshot sorted by key. A leaf hashes to
//! `SHA256(0x00 || len(key) || key || len(value) || value)` (lengths as little-endian `u32`), and an
//! inner node to `SHA256(0x01 || left || right)`. The distinct prefixes stop an inner node from being
//! passed off as a leaf. When a level has an odd number of nodes, the last node is promoted to the next
//! level unchanged. The root of an empty tree is the all-zeroes hash.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{
    crypto_primitives::{CryptoHasher, Digest},
    data_types::CryptoHash,
};

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Hash of a single key-value leaf.
pub fn leaf_hash(key: &[u8], value: &[u8]) -> CryptoHash {
    let mut hasher = CryptoHasher::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update((key.len() as u32).to_le_bytes());
    hasher.update(key);
    hasher.update((value.len() as u32).to_le_bytes());
    hasher.update(value);
    CryptoHash::new(hasher.finalize().into())
}

fn node_hash(left: &CryptoHash, right: &CryptoHash) -> CryptoHash {
    let mut hasher = CryptoHasher::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left.bytes());
    hasher.update(right.bytes());
    CryptoHash::new(hasher.finalize().into())
}

/// A fully materialized Merkle tree. `levels[0]` are the leaf hashes, the last level holds the root.
pub struct MerkleTree {
    levels: Vec<Vec<CryptoHash>>,
}

impl MerkleTree {
    /// Build a tree over `leaves`, which must already be sorted by key.
    pub fn from_leaves<'a>(leaves: impl IntoIterator<Item = (&'a [u8], &'a [u8])>) -> MerkleTree {
        let leaf_level: Vec<CryptoHash> = leaves
            .into_iter()
            .map(|(key, value)| leaf_hash(key, value))
            .collect();

        let mut levels = vec![leaf_level];
        while levels.last().map_or(false, |level| level.len() > 1) {
            let next = levels
                .last()
                .map(|level| {
                    level
                        .chunks(2)
                        .map(|pair| match pair {
                            [left, right] => node_hash(left, right),
                            [single] => *single,
                            _ => unreachable!("chunks(2) yields one or two elements"),
                        })
                        .collect()
                })
                .unwrap_or_default();
            levels.push(next);
        }

        MerkleTree { levels }
    }

    pub fn root(&self) -> CryptoHash {
        self.levels
            .last()
            .and_then(|level| level.first().copied())
            .unwrap_or_else(CryptoHash::zero)
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, |leaves| leaves.len())
    }

    /// Create an inclusion proof for the leaf at `leaf_index`.
    pub fn prove(&self, leaf_index: usize) -> Option<MerkleProof> {
        if leaf_index >= self.leaf_count() {
            return None;
        }

        let mut siblings = Vec::new();
        let mut index = leaf_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = if index % 2 == 1 {
                Some(index - 1)
            } else if index + 1 < level.len() {
                Some(index + 1)
            } else {
                None
            };
            if let Some(sibling) = sibling {
                siblings.push(level[sibling]);
            }
            index /= 2;
        }

        Some(MerkleProof {
            leaf_index: leaf_index as u64,
            leaf_count: self.leaf_count() as u64,
            siblings,
        })
    }
}

/// Proof that a key-value pair is a leaf of the tree with a given root.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MerkleProof {
    pub leaf_index: u64,
    pub leaf_count: u64,

    /// Sibling hashes from the leaf level upwards. Levels where the path node was promoted without a
    /// sibling contribute nothing.
    pub siblings: Vec<CryptoHash>,
}

impl MerkleProof {
    /// Check that `key` → `value` is the leaf at `leaf_index` of a tree whose root is `root`.
    pub fn verify(&self, root: &CryptoHash, key: &[u8], value: &[u8]) -> bool {
        if self.leaf_index >= self.leaf_count {
            return false;
        }

        let mut hash = leaf_hash(key, value);
        let mut index = self.leaf_index;
        let mut width = self.leaf_count;
        let mut siblings = self.siblings.iter();

        while width > 1 {
            if index % 2 == 1 {
                match siblings.next() {
                    Some(sibling) => hash = node_hash(sibling, &hash),
                    None => return false,
                }
            } else if index + 1 < width {
                match siblings.next() {
                    Some(sibling) => hash = node_hash(&hash, sibling),
                    None => return false,
                }
            }
            index /= 2;
            width = (width + 1) / 2;
        }

        siblings.next().is_none() && hash == *root
    }

    pub fn encode(&self) -> std::io::Result<Vec<u8>> {
        self.try_to_vec()
    }

    pub fn decode(bytes: &[u8]) -> std::io::Result<MerkleProof> {
        MerkleProof::try_from_slice(bytes)
    }
}
