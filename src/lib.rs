//! # UTXO Ledger - A Minimal Proof-of-Work Coin
//!
//! A single-node ledger in the Bitcoin mould: coins live in unspent transaction
//! outputs, every spend is signed with ECDSA P-256, and each block carries a
//! proof-of-work over its transactions and its link to the previous block.
//!
//! ## What It Does
//! - **Wallets**: P-256 key pairs with base58-check addresses
//! - **Transactions**: coinbase issuance, signed spends with change back to the sender
//! - **UTXO Scan**: balances and spendable outputs derived by walking the chain
//! - **Mining**: leading-zero-bit target, one block per accepted transaction
//! - **Storage**: a `Store` trait with sled and in-memory backends
//!
//! ## How the Code Is Organized
//! - `core/`: blocks, transactions, merkle proofs, mining and the `Blockchain` engine
//! - `wallet/`: key management, addresses and the wallet service
//! - `storage/`: the `Store` trait, its backends and the UTXO scanner
//! - `config/`: difficulty, reward and database location
//! - `utils/`: hashing, base58, signatures and the storage codec
//! - `cli/`: command-line arguments for the binary
//!
//! ## Where to Start
//! 1. `core/blockchain.rs` for the create/append/read operations
//! 2. `core/transaction_service.rs` for building, signing and checking spends
//! 3. `storage/utxo_set.rs` for how balances are derived

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    AddressBalance, Block, Blockchain, MerkleProof, ProofOfWork, ReadableBlock,
    ReadableTransaction, ReadableWallet, Transaction, TransactionService, TxnInput, TxnOutput,
    DEFAULT_DIFFICULTY, DEFAULT_REWARD,
};
pub use error::{LedgerError, Result};
pub use storage::{BlockIterator, MemoryStore, SledStore, Store, UtxoSet};
pub use utils::{base58_decode, base58_encode, current_timestamp, ripemd160_digest, sha256_digest};
pub use wallet::{
    convert_address, create_address, hash_pub_key, pub_key_hash_from_address, PrivateKey,
    Wallet, WalletService, ADDRESS_CHECK_SUM_LEN,
};
