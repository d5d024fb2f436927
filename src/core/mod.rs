//! Core ledger functionality
//!
//! Blocks, transactions, proof-of-work, the transaction engine and the `Blockchain`
//! that ties them to a store.

pub mod block;
pub mod blockchain;
pub mod merkle;
pub mod proof_of_work;
pub mod readable;
pub mod transaction;
pub mod transaction_service;

pub use block::Block;
pub use blockchain::Blockchain;
pub use merkle::{hash_transaction, hash_transactions, MerkleProof, MerkleTree, ProofElement};
pub use proof_of_work::{ProofOfWork, DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
pub use readable::{
    AddressBalance, ReadableBlock, ReadableTransaction, ReadableTxnInput, ReadableTxnOutput,
    ReadableWallet,
};
pub use transaction::{PrevTxns, Transaction, TxnInput, TxnOutput, COINBASE_OUT_IDX};
pub use transaction_service::{TransactionService, DEFAULT_REWARD};
