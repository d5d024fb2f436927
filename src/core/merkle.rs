use crate::core::Transaction;
use crate::error::{LedgerError, Result};
use crate::utils::sha256_digest;
use serde::{Deserialize, Serialize};

/// Content hash of a transaction: SHA-256 over its JSON form with `id`, the owning
/// `block_id`, every signature and every `curr_txn_id` stamp cleared. This equals the
/// transaction id for any transaction built by `Transaction::assemble`, however it was
/// later signed, stamped or stored. Over a trimmed copy it is also the signing payload.
pub fn hash_transaction(txn: &Transaction) -> Result<Vec<u8>> {
    let mut copy = txn.clone();
    copy.clear_for_hashing();
    let bytes = serde_json::to_vec(&copy)?;
    Ok(sha256_digest(&bytes))
}

/// SHA-256 over the concatenated transaction ids, in list order. This is the
/// transactions digest that enters the proof-of-work hash.
pub fn hash_transactions(txns: &[Transaction]) -> Vec<u8> {
    let mut ids = vec![];
    for txn in txns {
        ids.extend(txn.get_id());
    }
    sha256_digest(ids.as_slice())
}

/// Binary hash tree over transaction ids, kept level by level (leaves first).
///
/// Leaves are `SHA256(txid)`, parents `SHA256(left ∥ right)`, and a level with an odd
/// number of nodes pairs its last node with itself. The tree is not part of the block
/// hash; it backs inclusion proofs only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleTree {
    levels: Vec<Vec<Vec<u8>>>,
}

/// Merkle proof for transaction inclusion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Transaction id being proven
    pub transaction_id: Vec<u8>,
    pub merkle_root: Vec<u8>,
    /// Sibling hashes from leaf level up to just below the root
    pub proof_path: Vec<ProofElement>,
    pub transaction_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofElement {
    pub hash: Vec<u8>,
    /// true if the sibling sits on the right
    pub is_right: bool,
}

impl MerkleTree {
    pub fn new(transactions: &[Transaction]) -> Result<Self> {
        let ids: Vec<Vec<u8>> = transactions.iter().map(|tx| tx.get_id().to_vec()).collect();
        Self::from_hashes(&ids)
    }

    /// Builds the tree from raw transaction ids
    pub fn from_hashes(ids: &[Vec<u8>]) -> Result<Self> {
        if ids.is_empty() {
            return Err(LedgerError::InvalidBlock(
                "Cannot create Merkle tree from empty transaction list".to_string(),
            ));
        }

        let leaves: Vec<Vec<u8>> = ids.iter().map(|id| sha256_digest(id)).collect();
        let mut levels = vec![leaves];

        while levels[levels.len() - 1].len() > 1 {
            let current = &levels[levels.len() - 1];
            let next: Vec<Vec<u8>> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => Self::hash_pair(left, right),
                    [single] => Self::hash_pair(single, single),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next);
        }

        Ok(MerkleTree { levels })
    }

    pub fn root_hash(&self) -> &[u8] {
        // from_hashes guarantees a non-empty top level
        &self.levels[self.levels.len() - 1][0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn generate_proof(&self, transaction_id: &[u8], transaction_index: usize) -> Result<MerkleProof> {
        if transaction_index >= self.leaf_count() {
            return Err(LedgerError::InvalidBlock(format!(
                "Transaction index {} out of bounds (leaves: {})",
                transaction_index,
                self.leaf_count()
            )));
        }
        if sha256_digest(transaction_id) != self.levels[0][transaction_index] {
            return Err(LedgerError::InvalidBlock(
                "Transaction id does not match the leaf at that index".to_string(),
            ));
        }

        let mut proof_path = Vec::new();
        let mut index = transaction_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let is_right = index % 2 == 0;
            let sibling_index = if is_right { index + 1 } else { index - 1 };
            // Odd level: the last node was paired with itself
            let sibling = level.get(sibling_index).unwrap_or(&level[index]);
            proof_path.push(ProofElement {
                hash: sibling.clone(),
                is_right,
            });
            index /= 2;
        }

        Ok(MerkleProof {
            transaction_id: transaction_id.to_vec(),
            merkle_root: self.root_hash().to_vec(),
            proof_path,
            transaction_index,
        })
    }

    pub fn verify_proof(proof: &MerkleProof) -> bool {
        let mut current = sha256_digest(&proof.transaction_id);
        for element in &proof.proof_path {
            current = if element.is_right {
                Self::hash_pair(&current, &element.hash)
            } else {
                Self::hash_pair(&element.hash, &current)
            };
        }
        current == proof.merkle_root
    }

    fn hash_pair(left: &[u8], right: &[u8]) -> Vec<u8> {
        let mut combined = Vec::with_capacity(left.len() + right.len());
        combined.extend_from_slice(left);
        combined.extend_from_slice(right);
        sha256_digest(&combined)
    }
}
