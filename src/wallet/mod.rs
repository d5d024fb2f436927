//! Wallet management and cryptographic operations
//!
//! Key pairs, public key hashes and base58-check addresses, plus the store-backed
//! wallet service.

pub mod service;
#[allow(clippy::module_inception)]
pub mod wallet;

pub use service::WalletService;
pub use wallet::{
    checksum_matches, convert_address, create_address, create_checksum, create_key_pair,
    hash_pub_key, pub_key_hash_from_address, PrivateKey, Wallet, ADDRESS_CHECK_SUM_LEN,
    PUB_KEY_HASH_LEN,
};
