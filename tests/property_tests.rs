//! Property-based tests
//!
//! Invariants that must hold for arbitrary inputs: hash determinism,
//! display/wire round-trips, and the fixed header layout.

use proptest::collection::vec;
use proptest::prelude::*;

use archas::consensus::{Header, Outpoint, Transaction, TxInput, TxOutput};
use archas::crypto::{archas, Hash32, PublicAddress};

fn arb_hash32() -> impl Strategy<Value = Hash32> {
    any::<[u8; 32]>().prop_map(Hash32::from_bytes)
}

fn arb_address() -> impl Strategy<Value = PublicAddress> {
    any::<[u8; 20]>().prop_map(PublicAddress::from_bytes)
}

fn arb_input() -> impl Strategy<Value = TxInput> {
    (arb_hash32(), any::<u32>(), vec(any::<u8>(), 0..80)).prop_map(|(tx_id, index, sig)| TxInput {
        prev: Outpoint { tx_id, index },
        sig,
    })
}

fn arb_output() -> impl Strategy<Value = TxOutput> {
    (arb_address(), any::<u32>()).prop_map(|(to, value)| TxOutput { to, value })
}

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (vec(arb_input(), 0..6), vec(arb_output(), 0..6))
        .prop_map(|(inputs, outputs)| Transaction::new(inputs, outputs))
}

proptest! {
    /// Archas is a pure function of its input.
    #[test]
    fn prop_archas_deterministic(data in vec(any::<u8>(), 0..512)) {
        prop_assert_eq!(archas(&data), archas(&data));
    }

    /// Appending a byte always moves the digest.
    #[test]
    fn prop_archas_extension_changes_digest(data in vec(any::<u8>(), 0..256), extra in any::<u8>()) {
        let mut extended = data.clone();
        extended.push(extra);
        prop_assert_ne!(archas(&data), archas(&extended));
    }

    /// Reversed-hex display round-trips to the identical hash.
    #[test]
    fn prop_hash_hex_roundtrip(hash in arb_hash32()) {
        let recovered = Hash32::from_hex(&hash.to_hex()).unwrap();
        prop_assert_eq!(hash, recovered);
    }

    /// Full wire serialization decodes back to the identical transaction.
    #[test]
    fn prop_transaction_wire_roundtrip(tx in arb_transaction()) {
        let decoded = Transaction::deserialize(&tx.serialize()).unwrap();
        prop_assert_eq!(tx, decoded);
    }

    /// The tx_id never depends on signature bytes.
    #[test]
    fn prop_tx_id_ignores_signatures(
        tx in arb_transaction(),
        new_sig in vec(any::<u8>(), 1..80),
        input_pick in any::<prop::sample::Index>(),
    ) {
        let mut mutated = tx.clone();
        if mutated.inputs.is_empty() {
            prop_assert_eq!(mutated.compute_tx_id(), tx.tx_id);
        } else {
            let idx = input_pick.index(mutated.inputs.len());
            mutated.inputs[idx].sig = new_sig;
            prop_assert_eq!(mutated.compute_tx_id(), tx.tx_id);
        }
    }

    /// Headers always serialize to exactly 80 bytes, hashed deterministically.
    #[test]
    fn prop_header_layout(
        version in any::<u32>(),
        timestamp in any::<u32>(),
        prev in arb_hash32(),
        merkle in arb_hash32(),
        difficulty in any::<u32>(),
        nonce in any::<u32>(),
    ) {
        let header = Header::new(version, timestamp, prev, merkle, difficulty, nonce);
        prop_assert_eq!(header.serialize().len(), 80);
        prop_assert_eq!(header.hash(), header.hash());
    }

    /// Distinct nonces give distinct header digests.
    #[test]
    fn prop_nonce_changes_block_hash(
        prev in arb_hash32(),
        merkle in arb_hash32(),
        nonce in 0u32..u32::MAX,
    ) {
        let a = Header::new(1, 0, prev, merkle, 3, nonce);
        let b = Header::new(1, 0, prev, merkle, 3, nonce + 1);
        prop_assert_ne!(a.hash(), b.hash());
    }
}
