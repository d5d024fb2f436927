use crate::core::{Block, Transaction};
use crate::error::{LedgerError, Result};
use crate::storage::{check_extends, BlockIterator, Store};
use crate::wallet::Wallet;
use data_encoding::HEXLOWER;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Inner {
    blocks: HashMap<Vec<u8>, Block>,
    block_ids: HashMap<String, Vec<u8>>,
    // Ordered by key so listings match the sled store
    transactions: BTreeMap<Vec<u8>, Transaction>,
    wallets: BTreeMap<String, Wallet>,
    last_block_hash: Option<Vec<u8>>,
    genesis_block_hash: Option<Vec<u8>>,
}

/// Store kept entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| LedgerError::Database("Memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| LedgerError::Database("Memory store lock poisoned".to_string()))
    }

    fn block_at(inner: &Inner, hash: &[u8]) -> Result<Block> {
        inner.blocks.get(hash).cloned().ok_or_else(|| {
            LedgerError::NotFound(format!("block with hash {}", HEXLOWER.encode(hash)))
        })
    }
}

impl Store for MemoryStore {
    fn create_block(&self, block: &Block) -> Result<()> {
        let mut inner = self.write()?;
        check_extends(
            block,
            inner.genesis_block_hash.is_some(),
            inner.last_block_hash.as_deref(),
        )?;

        let hash = block.get_hash().to_vec();
        for txn in block.get_transactions() {
            inner
                .transactions
                .insert(txn.get_id().to_vec(), txn.clone());
        }
        inner
            .block_ids
            .insert(block.get_id().to_string(), hash.clone());
        inner.blocks.insert(hash.clone(), block.clone());
        if block.is_genesis() {
            inner.genesis_block_hash = Some(hash.clone());
        }
        inner.last_block_hash = Some(hash);
        Ok(())
    }

    fn get_blockchain(&self) -> Result<Vec<Block>> {
        BlockIterator::new(self)?.collect()
    }

    fn get_last_block(&self) -> Result<Block> {
        let inner = self.read()?;
        let hash = inner
            .last_block_hash
            .as_deref()
            .ok_or_else(|| LedgerError::NotFound("last block".to_string()))?;
        Self::block_at(&inner, hash)
    }

    fn get_genesis_block(&self) -> Result<Block> {
        let inner = self.read()?;
        let hash = inner
            .genesis_block_hash
            .as_deref()
            .ok_or_else(|| LedgerError::NotFound("genesis block".to_string()))?;
        Self::block_at(&inner, hash)
    }

    fn get_block_by_id(&self, id: &str) -> Result<Block> {
        let inner = self.read()?;
        let hash = inner
            .block_ids
            .get(id)
            .ok_or_else(|| LedgerError::NotFound(format!("block {id}")))?;
        Self::block_at(&inner, hash)
    }

    fn get_block_by_hash(&self, hash: &[u8]) -> Result<Block> {
        let inner = self.read()?;
        Self::block_at(&inner, hash)
    }

    fn create_wallet(&self, wallet: &Wallet) -> Result<()> {
        self.write()?
            .wallets
            .insert(wallet.get_address().to_string(), wallet.clone());
        Ok(())
    }

    fn get_wallet(&self, address: &str) -> Result<Wallet> {
        self.read()?
            .wallets
            .get(address)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("wallet {address}")))
    }

    fn get_wallets(&self) -> Result<Vec<Wallet>> {
        Ok(self.read()?.wallets.values().cloned().collect())
    }

    fn get_transaction(&self, id: &[u8]) -> Result<Transaction> {
        self.read()?.transactions.get(id).cloned().ok_or_else(|| {
            LedgerError::NotFound(format!("transaction {}", HEXLOWER.encode(id)))
        })
    }

    fn get_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.read()?.transactions.values().cloned().collect())
    }
}
