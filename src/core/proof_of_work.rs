// My proof-of-work: count the nonce up from zero until the block hash, read as a big
// unsigned integer, drops below 2^(256 - difficulty). Each extra difficulty bit roughly
// doubles the expected work.

use crate::core::Block;
use crate::error::{LedgerError, Result};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::{debug, info};
use num_bigint::{BigInt, Sign};
use std::borrow::Borrow;
use std::ops::ShlAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const DEFAULT_DIFFICULTY: u32 = 12;
pub const MAX_DIFFICULTY: u32 = 255;

const MAX_NONCE: i64 = i64::MAX;
const PROGRESS_INTERVAL: i64 = 1 << 20;

/// Sequential nonce search against the target `2^(256 - difficulty)`
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    target: BigInt,
    difficulty: u32,
    cancelled: Arc<AtomicBool>,
}

impl ProofOfWork {
    pub fn new(difficulty: u32) -> Result<ProofOfWork> {
        if difficulty == 0 || difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::Config(format!(
                "Difficulty must be between 1 and {MAX_DIFFICULTY}, got {difficulty}"
            )));
        }
        let mut target = BigInt::from(1);
        target.shl_assign(256 - difficulty);
        Ok(ProofOfWork {
            target,
            difficulty,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_target(&self) -> &BigInt {
        &self.target
    }

    /// Stops any running and future `solve` calls until `resume` is called
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Shared flag, for cancelling from another thread
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn prefix(block: &Block) -> Vec<u8> {
        let mut data = block.hash_transactions();
        data.extend(block.get_prev_hash());
        data
    }

    fn prepare_data(prefix: &[u8], timestamp: i64, nonce: i64) -> Vec<u8> {
        let mut data = prefix.to_vec();
        // Timestamp and nonce enter the hash as base-10 ASCII, not as fixed-width integers
        data.extend(timestamp.to_string().as_bytes());
        data.extend(nonce.to_string().as_bytes());
        data
    }

    /// SHA256(hash_transactions ∥ prev_hash ∥ ascii(timestamp) ∥ ascii(nonce))
    pub fn hash_data(block: &Block, nonce: i64) -> Vec<u8> {
        let data = Self::prepare_data(&Self::prefix(block), block.get_timestamp(), nonce);
        sha256_digest(data.as_slice())
    }

    fn meets_target(&self, hash: &[u8]) -> bool {
        let hash_int = BigInt::from_bytes_be(Sign::Plus, hash);
        hash_int.lt(self.target.borrow())
    }

    /// Searches nonces from zero upward and returns the first one whose hash is below
    /// the target, together with that hash.
    pub fn solve(&self, block: &Block) -> Result<(i64, Vec<u8>)> {
        info!(
            "Mining block {} at difficulty {}",
            block.get_id(),
            self.difficulty
        );
        let prefix = Self::prefix(block);
        let timestamp = block.get_timestamp();

        let mut nonce = 0;
        while nonce < MAX_NONCE {
            if self.cancelled.load(Ordering::Relaxed) {
                return Err(LedgerError::Mining(format!(
                    "Mining of block {} was cancelled at nonce {nonce}",
                    block.get_id()
                )));
            }

            let data = Self::prepare_data(&prefix, timestamp, nonce);
            let hash = sha256_digest(data.as_slice());
            if self.meets_target(&hash) {
                info!("Found nonce {nonce}: {}", HEXLOWER.encode(hash.as_slice()));
                return Ok((nonce, hash));
            }

            if nonce > 0 && nonce % PROGRESS_INTERVAL == 0 {
                debug!("Still mining block {} at nonce {nonce}", block.get_id());
            }
            nonce += 1;
        }

        Err(LedgerError::Mining(format!(
            "Nonce space exhausted for block {}",
            block.get_id()
        )))
    }

    /// Recomputes the hash with the stored nonce and checks it against the target
    pub fn validate_proof(&self, block: &Block) -> bool {
        let hash = Self::hash_data(block, block.get_nonce());
        self.meets_target(&hash)
    }

    /// True when the stored hash is the recomputed one
    pub fn verify_block_hash(block: &Block) -> bool {
        Self::hash_data(block, block.get_nonce()).as_slice() == block.get_hash()
    }
}
