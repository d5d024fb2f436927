//! Test utilities for ledger testing

use crate::core::{Block, Blockchain, PrevTxns, ProofOfWork, Transaction, TxnInput, TxnOutput};
use crate::storage::MemoryStore;
use crate::utils::{new_key_pair, public_key_from_pkcs8};
use crate::wallet::{create_address, hash_pub_key, Wallet};
use data_encoding::HEXLOWER;
use std::sync::Arc;

/// Fresh PKCS#8 document and its raw public key
pub fn test_key() -> (Vec<u8>, Vec<u8>) {
    let pkcs8 = new_key_pair().unwrap();
    let public_key = public_key_from_pkcs8(&pkcs8).unwrap();
    (pkcs8, public_key)
}

pub fn address_for(public_key: &[u8]) -> String {
    create_address(public_key)
}

/// A single unsigned transaction paying `values` to `public_key`, keyed by its hex id.
/// Returns the map together with the raw id so inputs can reference it.
pub fn funded_prev_txns(public_key: &[u8], values: &[u64]) -> (PrevTxns, Vec<u8>) {
    let pub_key_hash = hash_pub_key(public_key);
    let outputs = values
        .iter()
        .map(|value| TxnOutput::locked_to(*value, pub_key_hash.clone()))
        .collect();
    let txn = Transaction::assemble(vec![TxnInput::coinbase(b"test funds")], outputs).unwrap();
    let id = txn.get_id().to_vec();

    let mut prev_txns = PrevTxns::new();
    prev_txns.insert(HEXLOWER.encode(&id), txn);
    (prev_txns, id)
}

/// `count` linked coinbase-only blocks mined at difficulty 1, genesis first
pub fn mined_chain(count: usize) -> Vec<Block> {
    let pow = ProofOfWork::new(1).unwrap();
    let (_, public_key) = test_key();
    let address = address_for(&public_key);

    let mut blocks: Vec<Block> = Vec::with_capacity(count);
    for height in 0..count {
        let coinbase = Transaction::new_coinbase(&address, &format!("block {height}"), 500).unwrap();
        let prev_hash = blocks
            .last()
            .map(|block| block.get_hash().to_vec())
            .unwrap_or_default();
        let mut block = Block::new(vec![coinbase], prev_hash).unwrap();
        let (nonce, hash) = pow.solve(&block).unwrap();
        block.set_proof(nonce, hash);
        blocks.push(block);
    }
    blocks
}

/// In-memory ledger with the easiest proof-of-work target
pub struct TestLedger {
    pub store: Arc<MemoryStore>,
    pub chain: Blockchain,
}

impl TestLedger {
    pub fn new() -> TestLedger {
        let store = Arc::new(MemoryStore::new());
        let chain = Blockchain::new(store.clone(), 1, 500).unwrap();
        TestLedger { store, chain }
    }

    /// Stored wallet with no coins
    pub fn wallet(&self) -> Wallet {
        self.chain.wallets().create_wallet().unwrap()
    }

    /// Stored wallet that received the genesis reward
    pub fn funded_wallet(&self) -> Wallet {
        let wallet = self.wallet();
        let (_, existed) = self.chain.create_blockchain(wallet.get_address()).unwrap();
        assert!(!existed, "funded_wallet expects an empty ledger");
        wallet
    }
}
