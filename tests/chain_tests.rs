//! End-to-end chain scenarios
//!
//! Full engine flows: funded genesis, signed transfers, mined blocks,
//! double-spend rejection, and the stale-tip race between parallel miners.

use archas::consensus::{Body, Outpoint, Transaction, TxInput, TxOutput, ValidationError};
use archas::crypto::{archas, Hash32};
use archas::mining::{generate_block, CancelToken};
use archas::node::{create_genesis_block, User};
use archas::storage::{Blockchain, ChainError};
use sha2::{Digest, Sha256};

fn user(id: u32, name: &str) -> User {
    User::from_mnemonic(id, name.to_string(), &format!("{name} test seed")).unwrap()
}

/// Genesis funding each (user, value) pair with a single UTXO.
fn chain_with_funds(funds: &[(&User, u32)]) -> Blockchain {
    let txs: Vec<Transaction> = funds
        .iter()
        .map(|(user, value)| {
            Transaction::new(
                vec![],
                vec![TxOutput {
                    to: user.public_address,
                    value: *value,
                }],
            )
        })
        .collect();
    let genesis = create_genesis_block(&CancelToken::new(), txs, 1, 0).unwrap();

    let chain = Blockchain::new();
    chain.add_block(genesis).unwrap();
    chain
}

fn funding_outpoint(chain: &Blockchain, user: &User) -> Outpoint {
    let utxos = chain.utxos_for_address(&user.public_address);
    assert_eq!(utxos.len(), 1, "expected exactly one funding UTXO");
    utxos[0].outpoint
}

fn signed_transfer(
    sender: &User,
    outpoint: Outpoint,
    spent_value: u32,
    outputs: Vec<TxOutput>,
) -> Transaction {
    let mut tx = Transaction::new(
        vec![TxInput {
            prev: outpoint,
            sig: vec![],
        }],
        outputs,
    );
    let digest = tx.signature_hash(spent_value, &sender.public_address);
    tx.inputs[0].sig = sender.private_key.sign(&digest).unwrap();
    tx
}

#[test]
fn test_genesis_and_single_transfer() {
    let alice = user(1, "alice");
    let bob = user(2, "bob");
    let chain = chain_with_funds(&[(&alice, 100)]);
    chain.register_users(&[alice.clone(), bob.clone()]);

    let funded = funding_outpoint(&chain, &alice);
    let transfer = signed_transfer(
        &alice,
        funded,
        100,
        vec![
            TxOutput {
                to: bob.public_address,
                value: 60,
            },
            TxOutput {
                to: alice.public_address,
                value: 40,
            },
        ],
    );

    let block = generate_block(&chain, &CancelToken::new(), Body::new(vec![transfer]), 1, 1)
        .unwrap();
    chain.add_block(block).unwrap();

    assert_eq!(chain.len(), 2);
    assert_eq!(chain.balance(&alice.public_address), 40);
    assert_eq!(chain.balance(&bob.public_address), 60);

    let alice_utxos = chain.utxos_for_address(&alice.public_address);
    assert!(alice_utxos.iter().all(|u| u.outpoint != funded));
}

#[test]
fn test_intra_block_double_spend_rejected() {
    let alice = user(1, "alice");
    let bob = user(2, "bob");
    let chain = chain_with_funds(&[(&alice, 100)]);
    chain.register_users(&[alice.clone(), bob.clone()]);

    let funded = funding_outpoint(&chain, &alice);

    // Two transactions in one block, both consuming the same outpoint.
    let first = signed_transfer(
        &alice,
        funded,
        100,
        vec![TxOutput {
            to: bob.public_address,
            value: 50,
        }],
    );
    let second = signed_transfer(
        &alice,
        funded,
        100,
        vec![TxOutput {
            to: bob.public_address,
            value: 30,
        }],
    );

    let block = generate_block(
        &chain,
        &CancelToken::new(),
        Body::new(vec![first, second]),
        1,
        1,
    )
    .unwrap();

    assert_eq!(
        chain.add_block(block),
        Err(ChainError::Validation(ValidationError::DoubleSpend))
    );
    assert_eq!(chain.len(), 1);
}

#[test]
fn test_cross_block_double_spend_rejected() {
    let alice = user(1, "alice");
    let bob = user(2, "bob");
    let chain = chain_with_funds(&[(&alice, 100)]);
    chain.register_users(&[alice.clone(), bob.clone()]);

    let funded = funding_outpoint(&chain, &alice);

    let spend = signed_transfer(
        &alice,
        funded,
        100,
        vec![TxOutput {
            to: bob.public_address,
            value: 100,
        }],
    );
    let block1 = generate_block(&chain, &CancelToken::new(), Body::new(vec![spend]), 1, 1).unwrap();
    chain.add_block(block1).unwrap();

    // A later block trying to consume the now-spent outpoint again.
    let replay = signed_transfer(
        &alice,
        funded,
        100,
        vec![TxOutput {
            to: bob.public_address,
            value: 100,
        }],
    );
    let block2 =
        generate_block(&chain, &CancelToken::new(), Body::new(vec![replay]), 1, 1).unwrap();

    assert_eq!(
        chain.add_block(block2),
        Err(ChainError::Validation(ValidationError::UtxoNotFound))
    );
    assert_eq!(chain.len(), 2);
}

#[test]
fn test_invalid_signature_rejected() {
    let alice = user(1, "alice");
    let bob = user(2, "bob");
    let chain = chain_with_funds(&[(&alice, 100)]);
    chain.register_users(&[alice.clone(), bob.clone()]);

    let funded = funding_outpoint(&chain, &alice);
    let forged = Transaction::new(
        vec![TxInput {
            prev: funded,
            sig: vec![0x01, 0x02, 0x03],
        }],
        vec![TxOutput {
            to: bob.public_address,
            value: 50,
        }],
    );

    let block =
        generate_block(&chain, &CancelToken::new(), Body::new(vec![forged]), 1, 1).unwrap();

    assert_eq!(
        chain.add_block(block),
        Err(ChainError::Validation(ValidationError::InvalidSignature))
    );
}

#[test]
fn test_stale_tip_race_accepts_exactly_one_block() {
    let alice = user(1, "alice");
    let bob = user(2, "bob");
    let carol = user(3, "carol");
    let dave = user(4, "dave");
    let chain = chain_with_funds(&[(&alice, 100), (&carol, 100)]);
    chain.register_users(&[alice.clone(), bob.clone(), carol.clone(), dave.clone()]);

    // Two valid candidates mined over the same tip, spending disjoint UTXOs.
    let spend_a = signed_transfer(
        &alice,
        funding_outpoint(&chain, &alice),
        100,
        vec![TxOutput {
            to: bob.public_address,
            value: 100,
        }],
    );
    let spend_c = signed_transfer(
        &carol,
        funding_outpoint(&chain, &carol),
        100,
        vec![TxOutput {
            to: dave.public_address,
            value: 100,
        }],
    );
    let block_a =
        generate_block(&chain, &CancelToken::new(), Body::new(vec![spend_a]), 1, 1).unwrap();
    let block_c =
        generate_block(&chain, &CancelToken::new(), Body::new(vec![spend_c]), 1, 1).unwrap();

    let results: Vec<Result<(), ChainError>> = std::thread::scope(|scope| {
        let handle_a = scope.spawn(|| chain.add_block(block_a));
        let handle_c = scope.spawn(|| chain.add_block(block_c));
        vec![handle_a.join().unwrap(), handle_c.join().unwrap()]
    });

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one miner must win the tip");
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(ChainError::PrevHashMismatch))));
    assert_eq!(chain.len(), 2);
}

#[test]
fn test_archas_fixed_vector_stability() {
    let first = archas(b"hello");
    let second = archas(b"hello");
    assert_eq!(first, second);

    let sha: [u8; 32] = Sha256::digest(b"hello").into();
    assert_ne!(first, Hash32::from_bytes(sha));
}

#[test]
fn test_rescan_matches_incremental_application() {
    let alice = user(1, "alice");
    let bob = user(2, "bob");
    let chain = chain_with_funds(&[(&alice, 100)]);
    chain.register_users(&[alice.clone(), bob.clone()]);

    let transfer = signed_transfer(
        &alice,
        funding_outpoint(&chain, &alice),
        100,
        vec![TxOutput {
            to: bob.public_address,
            value: 70,
        }],
    );
    let block =
        generate_block(&chain, &CancelToken::new(), Body::new(vec![transfer]), 1, 1).unwrap();
    chain.add_block(block).unwrap();

    let alice_before = chain.balance(&alice.public_address);
    let bob_before = chain.balance(&bob.public_address);
    let count_before = chain.utxo_count();

    chain.rescan_utxos();

    assert_eq!(chain.balance(&alice.public_address), alice_before);
    assert_eq!(chain.balance(&bob.public_address), bob_before);
    assert_eq!(chain.utxo_count(), count_before);
}
