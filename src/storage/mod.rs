//! Data storage and persistence
//!
//! `Store` is the persistence contract of the ledger. `SledStore` keeps the chain on
//! disk, `MemoryStore` keeps it in process memory. `UtxoSet` answers balance and
//! double-spend questions by walking whichever store it is given.

pub mod memory_store;
pub mod sled_store;
pub mod utxo_set;

pub use memory_store::MemoryStore;
pub use sled_store::SledStore;
pub use utxo_set::UtxoSet;

use crate::core::{Block, Transaction};
use crate::error::{LedgerError, Result};
use crate::wallet::Wallet;

/// Lookups that find nothing return `LedgerError::NotFound`.
pub trait Store: Send + Sync {
    /// Persists `block`, each of its transactions and the last-block pointer in one
    /// atomic write. A genesis block is refused once one exists, and any other block
    /// must extend the current last block.
    fn create_block(&self, block: &Block) -> Result<()>;

    /// Every block, newest first
    fn get_blockchain(&self) -> Result<Vec<Block>>;

    fn get_last_block(&self) -> Result<Block>;

    fn get_genesis_block(&self) -> Result<Block>;

    fn get_block_by_id(&self, id: &str) -> Result<Block>;

    fn get_block_by_hash(&self, hash: &[u8]) -> Result<Block>;

    fn create_wallet(&self, wallet: &Wallet) -> Result<()>;

    fn get_wallet(&self, address: &str) -> Result<Wallet>;

    fn get_wallets(&self) -> Result<Vec<Wallet>>;

    fn get_transaction(&self, id: &[u8]) -> Result<Transaction>;

    fn get_transactions(&self) -> Result<Vec<Transaction>>;
}

/// Walks the chain from the last block back to genesis through `prev_hash` links
pub struct BlockIterator<'a> {
    store: &'a dyn Store,
    next: Option<Block>,
    failed: bool,
}

impl<'a> BlockIterator<'a> {
    /// An empty store yields an empty iterator
    pub fn new(store: &'a dyn Store) -> Result<BlockIterator<'a>> {
        let next = match store.get_last_block() {
            Ok(block) => Some(block),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        Ok(BlockIterator {
            store,
            next,
            failed: false,
        })
    }
}

impl Iterator for BlockIterator<'_> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let block = self.next.take()?;
        if !block.is_genesis() {
            match self.store.get_block_by_hash(block.get_prev_hash()) {
                Ok(prev) => self.next = Some(prev),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        Some(Ok(block))
    }
}

/// Checks a block against the current chain pointers before it is written
pub(crate) fn check_extends(
    block: &Block,
    genesis_exists: bool,
    last_hash: Option<&[u8]>,
) -> Result<()> {
    if block.is_genesis() {
        if genesis_exists {
            return Err(LedgerError::InvalidBlock(
                "A genesis block already exists".to_string(),
            ));
        }
        return Ok(());
    }
    match last_hash {
        Some(last) if last == block.get_prev_hash() => Ok(()),
        Some(_) => Err(LedgerError::InvalidBlock(format!(
            "Block {} does not extend the last block",
            block.get_id()
        ))),
        None => Err(LedgerError::NoGenesis),
    }
}
