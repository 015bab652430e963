//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Merkle tree utilities — leaf/node hashing, root computation, and
//! inclusion proof generation/verification. Odd levels duplicate the
//! trailing leaf, matching the continuity-chaining style in the receipt and
//! transparency-log modules.

use crate::crypto::hash::sha256_bytes;
use crate::error::ChainError;

/// `leaf(data) = SHA256(data)`.
pub fn leaf(data: &[u8]) -> [u8; 32] {
    sha256_bytes(data)
}

/// `node(l, r) = SHA256(l || r)`.
pub fn node(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(left);
    buf.extend_from_slice(right);
    sha256_bytes(&buf)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct InclusionProof {
    pub hashes: Vec<[u8; 32]>,
    pub directions: Vec<Side>,
}

/// Compute the Merkle root over `leaves` (already leaf-hashed values, not raw
/// data). Empty input is a fatal error — callers must have at least one leaf.
pub fn root(leaves: &[[u8; 32]]) -> Result<[u8; 32], ChainError> {
    if leaves.is_empty() {
        return Err(ChainError::Empty);
    }
    let mut level: Vec<[u8; 32]> = leaves.to_vec();
    while level.len() > 1 {
        level = reduce_level(&level);
    }
    Ok(level[0])
}

fn reduce_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    let mut next = Vec::with_capacity(level.len().div_ceil(2));
    let mut i = 0;
    while i < level.len() {
        if i + 1 < level.len() {
            next.push(node(&level[i], &level[i + 1]));
        } else {
            // Odd count at this level: duplicate the trailing leaf.
            next.push(node(&level[i], &level[i]));
        }
        i += 2;
    }
    next
}

/// Build the inclusion proof for `leaves[index]`.
pub fn inclusion_proof(index: usize, leaves: &[[u8; 32]]) -> Result<InclusionProof, ChainError> {
    if leaves.is_empty() {
        return Err(ChainError::Empty);
    }
    if index >= leaves.len() {
        return Err(ChainError::Gap(index));
    }

    let mut hashes = Vec::new();
    let mut directions = Vec::new();
    let mut level: Vec<[u8; 32]> = leaves.to_vec();
    let mut idx = index;

    while level.len() > 1 {
        let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
        let sibling = if sibling_idx < level.len() {
            level[sibling_idx]
        } else {
            // idx is the odd-one-out trailing leaf, duplicated against itself.
            level[idx]
        };
        let side = if idx % 2 == 0 { Side::Right } else { Side::Left };
        hashes.push(sibling);
        directions.push(side);

        level = reduce_level(&level);
        idx /= 2;
    }

    Ok(InclusionProof { hashes, directions })
}

/// Verify that `leaf_hash` combined with `proof` reproduces `expected_root`.
pub fn verify_inclusion(leaf_hash: &[u8; 32], proof: &InclusionProof, expected_root: &[u8; 32]) -> bool {
    if proof.hashes.len() != proof.directions.len() {
        return false;
    }
    let mut current = *leaf_hash;
    for (sibling, side) in proof.hashes.iter().zip(proof.directions.iter()) {
        current = match side {
            Side::Left => node(sibling, &current),
            Side::Right => node(&current, sibling),
        };
    }
    &current == expected_root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<[u8; 32]> {
        (0..n).map(|i| leaf(format!("leaf-{i}").as_bytes())).collect()
    }

    #[test]
    fn root_of_empty_is_fatal() {
        assert!(root(&[]).is_err());
    }

    #[test]
    fn root_of_single_leaf_is_the_leaf() {
        let l = leaves(1);
        assert_eq!(root(&l).unwrap(), l[0]);
    }

    #[test]
    fn inclusion_round_trip_for_many_sizes() {
        for n in 1..=17 {
            let l = leaves(n);
            let r = root(&l).unwrap();
            for i in 0..n {
                let proof = inclusion_proof(i, &l).unwrap();
                assert!(
                    verify_inclusion(&l[i], &proof, &r),
                    "inclusion proof failed for n={n}, i={i}"
                );
            }
        }
    }

    #[test]
    fn tampered_leaf_fails_inclusion() {
        let l = leaves(4);
        let r = root(&l).unwrap();
        let proof = inclusion_proof(1, &l).unwrap();
        let wrong_leaf = leaf(b"not-the-right-leaf");
        assert!(!verify_inclusion(&wrong_leaf, &proof, &r));
    }

    #[test]
    fn out_of_range_index_errors() {
        let l = leaves(3);
        assert!(inclusion_proof(3, &l).is_err());
    }
}
