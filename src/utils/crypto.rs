use ring::digest::{Context, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED, ECDSA_P256_SHA256_FIXED_SIGNING,
};
use ripemd::{Digest as RipemdDigest, Ripemd160};

use crate::error::{LedgerError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Byte width of one P-256 field element (a coordinate, or `r`/`s` of a signature)
pub const COORDINATE_LEN: usize = 32;

/// SEC1 tag for an uncompressed point
const UNCOMPRESSED_POINT_TAG: u8 = 0x04;

pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LedgerError::Crypto(format!("System time error: {e}")))?
        .as_millis();

    if duration > i64::MAX as u128 {
        return Err(LedgerError::Crypto("Timestamp overflow".to_string()));
    }

    Ok(duration as i64)
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

pub fn ripemd160_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(data: &str) -> Result<Vec<u8>> {
    bs58::decode(data)
        .into_vec()
        .map_err(|e| LedgerError::InvalidAddress(format!("Invalid base58 encoding: {e}")))
}

/// Generates a fresh P-256 key pair and returns it as a PKCS#8 document.
pub fn new_key_pair() -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
        .map_err(|e| LedgerError::Crypto(format!("Failed to generate ECDSA key pair: {e}")))?
        .as_ref()
        .to_vec();
    Ok(pkcs8)
}

fn key_pair_from_pkcs8(pkcs8: &[u8]) -> Result<EcdsaKeyPair> {
    let rng = SystemRandom::new();
    EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| LedgerError::Crypto(format!("Failed to create key pair from PKCS8: {e}")))
}

/// Returns the public point of a PKCS#8 key pair as `X ∥ Y`, without the SEC1 tag byte.
pub fn public_key_from_pkcs8(pkcs8: &[u8]) -> Result<Vec<u8>> {
    let key_pair = key_pair_from_pkcs8(pkcs8)?;
    let point = key_pair.public_key().as_ref();
    match point.split_first() {
        Some((&UNCOMPRESSED_POINT_TAG, coordinates))
            if coordinates.len() == 2 * COORDINATE_LEN =>
        {
            Ok(coordinates.to_vec())
        }
        _ => Err(LedgerError::Crypto(
            "Unexpected public key encoding".to_string(),
        )),
    }
}

/// Signs `message` with ECDSA P-256/SHA-256. The signature is `r ∥ s`, each 32 bytes.
pub fn ecdsa_p256_sha256_sign_digest(pkcs8: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = key_pair_from_pkcs8(pkcs8)?;
    let signature = key_pair
        .sign(&rng, message)
        .map_err(|e| LedgerError::Crypto(format!("Failed to sign message: {e}")))?
        .as_ref()
        .to_vec();
    Ok(signature)
}

/// Verifies an `r ∥ s` signature against an `X ∥ Y` public key.
///
/// Both values are split at their midpoint and each half is left-padded to the
/// coordinate width, so unpadded encodings with equal-length halves verify too.
pub fn ecdsa_p256_sha256_sign_verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
    let (Some(point), Some(signature)) = (split_and_pad(public_key), split_and_pad(signature))
    else {
        return false;
    };

    let mut sec1 = Vec::with_capacity(1 + point.len());
    sec1.push(UNCOMPRESSED_POINT_TAG);
    sec1.extend(point);

    let peer_public_key = ring::signature::UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, sec1);
    peer_public_key.verify(message, signature.as_ref()).is_ok()
}

fn split_and_pad(bytes: &[u8]) -> Option<Vec<u8>> {
    if bytes.is_empty() || bytes.len() % 2 != 0 || bytes.len() / 2 > COORDINATE_LEN {
        return None;
    }
    let (first, second) = bytes.split_at(bytes.len() / 2);
    let mut out = Vec::with_capacity(2 * COORDINATE_LEN);
    for half in [first, second] {
        out.extend(std::iter::repeat(0u8).take(COORDINATE_LEN - half.len()));
        out.extend_from_slice(half);
    }
    Some(out)
}
