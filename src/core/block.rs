// A block bundles transactions, points at its parent through prev_hash and carries the
// nonce and hash that proof-of-work found for it. The genesis block is the one with no
// parent.

use crate::core::merkle::{hash_transactions, MerkleProof, MerkleTree};
use crate::core::Transaction;
use crate::error::{LedgerError, Result};
use crate::utils::{current_timestamp, deserialize, serialize};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    id: String,
    timestamp: i64,
    transactions: Vec<Transaction>,
    // Empty for the genesis block
    prev_hash: Vec<u8>,
    hash: Vec<u8>,
    nonce: i64,
}

impl Block {
    /// Unmined block over `transactions`. Every transaction is stamped with the new
    /// block id; `hash` and `nonce` stay empty until the proof is attached.
    pub fn new(transactions: Vec<Transaction>, prev_hash: Vec<u8>) -> Result<Block> {
        if transactions.is_empty() {
            return Err(LedgerError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let mut transactions = transactions;
        for transaction in transactions.iter_mut() {
            transaction.set_block_id(&id);
        }

        Ok(Block {
            id,
            timestamp: current_timestamp()?,
            transactions,
            prev_hash,
            hash: vec![],
            nonce: 0,
        })
    }

    /// Records a solved proof of work
    pub(crate) fn set_proof(&mut self, nonce: i64, hash: Vec<u8>) {
        self.nonce = nonce;
        self.hash = hash;
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_id(&self) -> &str {
        self.id.as_str()
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_prev_hash(&self) -> &[u8] {
        self.prev_hash.as_slice()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    pub fn hash_transactions(&self) -> Vec<u8> {
        hash_transactions(&self.transactions)
    }

    pub fn merkle_tree(&self) -> Result<MerkleTree> {
        MerkleTree::new(&self.transactions)
    }

    /// Inclusion proof for the transaction at `transaction_index`
    pub fn generate_merkle_proof(&self, transaction_index: usize) -> Result<MerkleProof> {
        let transaction = self.transactions.get(transaction_index).ok_or_else(|| {
            LedgerError::InvalidBlock(format!(
                "Transaction index {} out of bounds (block has {})",
                transaction_index,
                self.transactions.len()
            ))
        })?;
        self.merkle_tree()?
            .generate_proof(transaction.get_id(), transaction_index)
    }

    /// Checks a proof against the Merkle root of this block's transactions
    pub fn verify_merkle_proof(&self, proof: &MerkleProof) -> Result<bool> {
        let tree = self.merkle_tree()?;
        Ok(proof.merkle_root == tree.root_hash() && MerkleTree::verify_proof(proof))
    }

    #[cfg(test)]
    pub(crate) fn set_timestamp(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
    }

    #[cfg(test)]
    pub(crate) fn transactions_mut(&mut self) -> &mut Vec<Transaction> {
        &mut self.transactions
    }
}
