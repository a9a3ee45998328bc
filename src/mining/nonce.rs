//! Proof-of-work nonce search

use crate::consensus::{hash_meets_difficulty, Header};
use crate::crypto::Hash32;

use super::{CancelToken, MiningError};

/// Scan the 32-bit nonce space until the header's Archas digest satisfies its
/// difficulty.
///
/// Works on a local copy of the header; the caller applies the returned
/// nonce. Checks `cancel` on every iteration. A zero Merkle root is rejected
/// up front (the body hash must be committed before searching).
pub fn find_valid_nonce(
    cancel: &CancelToken,
    header: &Header,
) -> Result<(u32, Hash32), MiningError> {
    if header.difficulty == 0 {
        return Ok((header.nonce, header.hash()));
    }
    if header.merkle_root.is_zero() {
        return Err(MiningError::MerkleRootUnset);
    }

    let mut candidate = header.clone();
    let mut nonce: u32 = 0;

    loop {
        if cancel.is_canceled() {
            return Err(MiningError::Canceled);
        }

        candidate.nonce = nonce;
        let hash = candidate.hash();
        if hash_meets_difficulty(&hash, candidate.difficulty) {
            return Ok((nonce, hash));
        }

        nonce = match nonce.checked_add(1) {
            Some(next) => next,
            None => return Err(MiningError::NonceSpaceExhausted),
        };
    }
}
