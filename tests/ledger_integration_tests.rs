//! Ledger integration tests
//!
//! Drives the public API against a sled database in a temporary directory,
//! covering the end-to-end flows a user of the CLI goes through.

use std::sync::Arc;
use std::thread;
use tempfile::tempdir;
use utxo_ledger::{
    hash_pub_key, pub_key_hash_from_address, Blockchain, LedgerError, ProofOfWork, SledStore,
    Store,
};

fn open_chain(path: &std::path::Path) -> Blockchain {
    let store = Arc::new(SledStore::open(path).unwrap());
    Blockchain::new(store, 1, 500).unwrap()
}

#[test]
fn test_send_moves_coins_and_keeps_supply() {
    let temp_dir = tempdir().unwrap();
    let chain = open_chain(&temp_dir.path().join("ledger"));

    let alice = chain.wallets().create_wallet().unwrap();
    let bob = chain.wallets().create_wallet().unwrap();

    let (genesis, existed) = chain.create_blockchain(alice.get_address()).unwrap();
    assert!(!existed);
    assert!(genesis.is_genesis());
    assert_eq!(chain.get_balance(alice.get_address()).unwrap(), 500);
    assert_eq!(chain.get_balance(bob.get_address()).unwrap(), 0);

    let block = chain
        .add_to_blockchain(alice.get_address(), bob.get_address(), 300)
        .unwrap();
    assert_eq!(block.get_prev_hash(), genesis.get_hash());

    assert_eq!(chain.get_balance(alice.get_address()).unwrap(), 200);
    assert_eq!(chain.get_balance(bob.get_address()).unwrap(), 300);

    let total: u64 = chain
        .get_balances()
        .unwrap()
        .iter()
        .map(|entry| entry.balance)
        .sum();
    assert_eq!(total, 500);
    assert_eq!(chain.validate_chain().unwrap(), 2);
}

#[test]
fn test_send_without_genesis_fails() {
    let temp_dir = tempdir().unwrap();
    let chain = open_chain(&temp_dir.path().join("ledger"));

    let alice = chain.wallets().create_wallet().unwrap();
    let bob = chain.wallets().create_wallet().unwrap();

    let result = chain.add_to_blockchain(alice.get_address(), bob.get_address(), 1);
    assert_eq!(result.unwrap_err(), LedgerError::NoGenesis);
    assert!(chain.get_blockchain().unwrap().is_empty());
}

#[test]
fn test_insufficient_funds_leaves_chain_untouched() {
    let temp_dir = tempdir().unwrap();
    let chain = open_chain(&temp_dir.path().join("ledger"));

    let alice = chain.wallets().create_wallet().unwrap();
    let bob = chain.wallets().create_wallet().unwrap();
    chain.create_blockchain(alice.get_address()).unwrap();
    let last = chain.get_last_block().unwrap();

    let err = chain
        .add_to_blockchain(alice.get_address(), bob.get_address(), 501)
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds {
            requested: 501,
            available: 500,
            ..
        }
    ));

    assert_eq!(chain.get_last_block().unwrap(), last);
    assert_eq!(chain.get_balance(alice.get_address()).unwrap(), 500);
    assert_eq!(chain.get_balance(bob.get_address()).unwrap(), 0);
}

#[test]
fn test_double_spend_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let chain = open_chain(&temp_dir.path().join("ledger"));

    let alice = chain.wallets().create_wallet().unwrap();
    let bob = chain.wallets().create_wallet().unwrap();
    let carol = chain.wallets().create_wallet().unwrap();
    chain.create_blockchain(alice.get_address()).unwrap();

    // Both spends are built against the same unspent genesis output
    let to_bob = chain
        .transactions()
        .create_transaction(alice.get_address(), bob.get_address(), 100)
        .unwrap();
    let to_carol = chain
        .transactions()
        .create_transaction(alice.get_address(), carol.get_address(), 100)
        .unwrap();

    chain.submit_transaction(to_bob).unwrap();
    let err = chain.submit_transaction(to_carol).unwrap_err();
    assert!(matches!(err, LedgerError::Transaction(_)));

    assert_eq!(chain.get_balance(alice.get_address()).unwrap(), 400);
    assert_eq!(chain.get_balance(bob.get_address()).unwrap(), 100);
    assert_eq!(chain.get_balance(carol.get_address()).unwrap(), 0);
    assert_eq!(chain.get_blockchain().unwrap().len(), 2);
}

#[test]
fn test_every_mined_block_meets_its_target() {
    let temp_dir = tempdir().unwrap();
    let store = Arc::new(SledStore::open(temp_dir.path().join("ledger")).unwrap());
    let chain = Blockchain::new(store, 8, 500).unwrap();

    let alice = chain.wallets().create_wallet().unwrap();
    let bob = chain.wallets().create_wallet().unwrap();
    chain.create_blockchain(alice.get_address()).unwrap();
    chain
        .add_to_blockchain(alice.get_address(), bob.get_address(), 50)
        .unwrap();

    let pow = ProofOfWork::new(8).unwrap();
    for block in chain.get_blockchain().unwrap() {
        assert!(pow.validate_proof(&block));
        assert!(ProofOfWork::verify_block_hash(&block));
    }
}

#[test]
fn test_address_decodes_to_wallet_key_hash() {
    let temp_dir = tempdir().unwrap();
    let chain = open_chain(&temp_dir.path().join("ledger"));

    let wallet = chain.wallets().create_wallet().unwrap();
    let decoded = pub_key_hash_from_address(wallet.get_address()).unwrap();
    assert_eq!(decoded, hash_pub_key(wallet.get_public_key()));
    assert!(chain.wallets().validate_address(wallet.get_address()).unwrap());
}

#[test]
fn test_spent_output_never_reappears() {
    let temp_dir = tempdir().unwrap();
    let chain = open_chain(&temp_dir.path().join("ledger"));

    let alice = chain.wallets().create_wallet().unwrap();
    let bob = chain.wallets().create_wallet().unwrap();
    let genesis = chain.create_blockchain(alice.get_address()).unwrap().0;
    let genesis_txn = genesis.get_transactions()[0].get_id().to_vec();

    chain
        .add_to_blockchain(alice.get_address(), bob.get_address(), 120)
        .unwrap();
    chain
        .add_to_blockchain(bob.get_address(), alice.get_address(), 20)
        .unwrap();

    let utxo = chain.transactions().utxo_set();
    assert!(utxo.is_output_spent(&genesis_txn, 0).unwrap());

    let alice_hash = pub_key_hash_from_address(alice.get_address()).unwrap();
    let unspent = utxo.get_unspent_transactions(&alice_hash).unwrap();
    assert!(unspent.iter().all(|txn| txn.get_id() != genesis_txn.as_slice()));

    assert_eq!(chain.get_balance(alice.get_address()).unwrap(), 400);
    assert_eq!(chain.get_balance(bob.get_address()).unwrap(), 100);
}

#[test]
fn test_chain_survives_reopen() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ledger");

    let (alice, bob, last_hash) = {
        let chain = open_chain(&db_path);
        let alice = chain.wallets().create_wallet().unwrap();
        let bob = chain.wallets().create_wallet().unwrap();
        chain.create_blockchain(alice.get_address()).unwrap();
        let block = chain
            .add_to_blockchain(alice.get_address(), bob.get_address(), 75)
            .unwrap();
        (
            alice.get_address().to_string(),
            bob.get_address().to_string(),
            block.get_hash().to_vec(),
        )
    };

    let store = Arc::new(SledStore::open(&db_path).unwrap());
    assert_eq!(store.get_last_block().unwrap().get_hash(), last_hash.as_slice());

    let chain = Blockchain::new(store, 1, 500).unwrap();
    assert_eq!(chain.get_balance(&alice).unwrap(), 425);
    assert_eq!(chain.get_balance(&bob).unwrap(), 75);
    assert_eq!(chain.wallets().get_addresses().unwrap().len(), 2);
    assert_eq!(chain.validate_chain().unwrap(), 2);
}

#[test]
fn test_concurrent_sends_build_one_linear_chain() {
    let temp_dir = tempdir().unwrap();
    let chain = Arc::new(open_chain(&temp_dir.path().join("ledger")));

    let alice = chain.wallets().create_wallet().unwrap();
    let bob = chain.wallets().create_wallet().unwrap();
    chain.create_blockchain(alice.get_address()).unwrap();

    // Every sender reads the last block, mines on it and appends; none may fork the chain
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let chain = Arc::clone(&chain);
            let from = alice.get_address().to_string();
            let to = bob.get_address().to_string();
            thread::spawn(move || chain.add_to_blockchain(&from, &to, 50))
        })
        .collect();
    let successes = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|result| result.is_ok())
        .count();

    assert_eq!(successes, 4);
    assert_eq!(chain.validate_chain().unwrap(), successes + 1);
    assert_eq!(chain.get_blockchain().unwrap().len(), successes + 1);

    assert_eq!(chain.get_balance(alice.get_address()).unwrap(), 300);
    assert_eq!(chain.get_balance(bob.get_address()).unwrap(), 200);
    let total: u64 = chain
        .get_balances()
        .unwrap()
        .iter()
        .map(|entry| entry.balance)
        .sum();
    assert_eq!(total, 500);
}
