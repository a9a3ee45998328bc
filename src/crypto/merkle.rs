//! Merkle tree root computation
//!
//! Leaves are Archas digests of serialized transactions; pair combination is
//! double SHA-256. The asymmetry is deliberate and fixed.

use sha2::{Digest, Sha256};

use super::Hash32;

/// Hash two nodes into their parent: `SHA256(SHA256(left || right))`.
pub fn double_sha256_pair(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(&left.0);
    buf[32..].copy_from_slice(&right.0);

    let first = Sha256::digest(buf);
    let second = Sha256::digest(first);
    Hash32(second.into())
}

/// Compute the Merkle root of ordered leaf hashes.
///
/// An empty list yields the zero hash. A level with an odd count duplicates
/// its last node; a single leaf therefore combines with itself.
pub fn merkle_root(leaves: &[Hash32]) -> Hash32 {
    if leaves.is_empty() {
        return Hash32::zero();
    }

    if leaves.len() == 1 {
        return double_sha256_pair(&leaves[0], &leaves[0]);
    }

    let mut level: Vec<Hash32> = leaves.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().expect("level is non-empty"));
        }

        let mut next = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks(2) {
            next.push(double_sha256_pair(&pair[0], &pair[1]));
        }
        level = next;
    }

    level[0]
}
