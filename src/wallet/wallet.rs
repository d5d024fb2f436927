// Wallets are just key pairs plus the address I derive from the public key.
// Address layout is Bitcoin's: base58(version byte, RIPEMD160(SHA256(pub key)), checksum).

use crate::error::{LedgerError, Result};
use crate::utils::{
    base58_decode, base58_encode, new_key_pair, public_key_from_pkcs8, ripemd160_digest,
    sha256_digest,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

const VERSION: u8 = 0x00;
pub const ADDRESS_CHECK_SUM_LEN: usize = 4;
/// Length of a RIPEMD-160 public key hash
pub const PUB_KEY_HASH_LEN: usize = 20;

/// PKCS#8 document of a P-256 signing key. Wiped on drop, never printed.
#[derive(
    Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode, Zeroize,
    ZeroizeOnDrop,
)]
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    pub fn new(pkcs8: Vec<u8>) -> PrivateKey {
        PrivateKey(pkcs8)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Wallet {
    id: String,
    address: String,
    private_key: PrivateKey,
    public_key: Vec<u8>,
}

impl Wallet {
    /// Fresh key pair and the address derived from it. Nothing is persisted here.
    pub fn new() -> Result<Wallet> {
        let (private_key, public_key) = create_key_pair()?;
        let address = create_address(&public_key);
        Ok(Wallet {
            id: Uuid::new_v4().to_string(),
            address,
            private_key,
            public_key,
        })
    }

    pub fn get_id(&self) -> &str {
        self.id.as_str()
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn get_pub_key_hash(&self) -> Vec<u8> {
        hash_pub_key(self.public_key.as_slice())
    }
}

/// Generates a P-256 key pair. The public key is `X ∥ Y` big-endian without the SEC1 tag.
pub fn create_key_pair() -> Result<(PrivateKey, Vec<u8>)> {
    let pkcs8 = new_key_pair()?;
    let public_key = public_key_from_pkcs8(&pkcs8)?;
    Ok((PrivateKey::new(pkcs8), public_key))
}

/// RIPEMD160(SHA256(public_key))
pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    let pub_key_sha256 = sha256_digest(pub_key);
    ripemd160_digest(pub_key_sha256.as_slice())
}

/// First four bytes of SHA256(SHA256(pub_key_hash)). The version byte is not covered.
pub fn create_checksum(pub_key_hash: &[u8]) -> Vec<u8> {
    let first_sha = sha256_digest(pub_key_hash);
    let second_sha = sha256_digest(first_sha.as_slice());
    second_sha[0..ADDRESS_CHECK_SUM_LEN].to_vec()
}

pub fn create_address(public_key: &[u8]) -> String {
    convert_address(&hash_pub_key(public_key))
}

/// Address for an already hashed public key: base58(version ∥ pub_key_hash ∥ checksum)
pub fn convert_address(pub_key_hash: &[u8]) -> String {
    let mut payload: Vec<u8> = vec![];
    payload.push(VERSION);
    payload.extend(pub_key_hash);
    payload.extend(create_checksum(pub_key_hash));
    base58_encode(payload.as_slice())
}

/// Splits a decoded address into its public key hash and checksum
fn split_payload(payload: &[u8]) -> Option<(&[u8], &[u8])> {
    if payload.len() < 1 + PUB_KEY_HASH_LEN + ADDRESS_CHECK_SUM_LEN {
        return None;
    }
    let body = &payload[1..];
    Some(body.split_at(body.len() - ADDRESS_CHECK_SUM_LEN))
}

/// Checksum check on the address text alone, without consulting any store
pub fn checksum_matches(address: &str) -> bool {
    let Ok(payload) = base58_decode(address) else {
        return false;
    };
    match split_payload(&payload) {
        Some((pub_key_hash, actual_checksum)) => {
            create_checksum(pub_key_hash).as_slice() == actual_checksum
        }
        None => false,
    }
}

/// Recovers the public key hash an address was built from
pub fn pub_key_hash_from_address(address: &str) -> Result<Vec<u8>> {
    let payload = base58_decode(address)?;
    let (pub_key_hash, actual_checksum) = split_payload(&payload)
        .ok_or_else(|| LedgerError::InvalidAddress(format!("Address too short: {address}")))?;
    if create_checksum(pub_key_hash).as_slice() != actual_checksum {
        return Err(LedgerError::InvalidAddress(format!(
            "Checksum mismatch for address: {address}"
        )));
    }
    Ok(pub_key_hash.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_is_reproducible_from_public_key() {
        let wallet = Wallet::new().unwrap();
        assert_eq!(create_address(wallet.get_public_key()), wallet.get_address());
        assert_eq!(wallet.get_public_key().len(), 64);
    }

    #[test]
    fn test_address_round_trip() {
        let wallet = Wallet::new().unwrap();
        let pub_key_hash = pub_key_hash_from_address(wallet.get_address()).unwrap();
        assert_eq!(pub_key_hash, wallet.get_pub_key_hash());
        assert_eq!(pub_key_hash.len(), PUB_KEY_HASH_LEN);
        assert!(checksum_matches(wallet.get_address()));
    }

    #[test]
    fn test_checksum_covers_only_pub_key_hash() {
        let pub_key_hash = vec![0x42; PUB_KEY_HASH_LEN];
        let payload = base58_decode(&convert_address(&pub_key_hash)).unwrap();
        assert_eq!(payload[0], VERSION);
        assert_eq!(&payload[21..], create_checksum(&pub_key_hash).as_slice());
    }

    #[test]
    fn test_corrupted_address_is_rejected() {
        let wallet = Wallet::new().unwrap();
        let mut payload = base58_decode(wallet.get_address()).unwrap();
        payload[5] ^= 0x01;
        let corrupted = base58_encode(&payload);

        assert!(!checksum_matches(&corrupted));
        assert!(matches!(
            pub_key_hash_from_address(&corrupted),
            Err(LedgerError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_garbage_addresses_do_not_panic() {
        assert!(!checksum_matches(""));
        assert!(!checksum_matches("0OIl"));
        assert!(!checksum_matches(&base58_encode(&[0, 1, 2])));
        assert!(pub_key_hash_from_address(&base58_encode(&[0, 1, 2])).is_err());
    }

    #[test]
    fn test_private_key_debug_is_redacted() {
        let wallet = Wallet::new().unwrap();
        let printed = format!("{wallet:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains(&format!("{:?}", wallet.get_private_key().as_bytes())));
    }
}
