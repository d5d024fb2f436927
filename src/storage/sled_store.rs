// Sled-backed store. Blocks are keyed by hash like a classic block database, with an
// id index beside them; the chain pointers live in the metadata tree.

use crate::core::{Block, Transaction};
use crate::error::{LedgerError, Result};
use crate::storage::{check_extends, BlockIterator, Store};
use crate::utils::{deserialize, serialize};
use crate::wallet::Wallet;
use data_encoding::HEXLOWER;
use log::{debug, info};
use sled::transaction::{abort, TransactionError};
use sled::{Db, Transactional, Tree};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const BLOCKS_TREE: &str = "blocks";
const BLOCK_IDS_TREE: &str = "block_ids";
const TRANSACTIONS_TREE: &str = "transactions";
const WALLETS_TREE: &str = "wallets";
const METADATA_TREE: &str = "metadata";

const LAST_BLOCK_HASH_KEY: &str = "last_block_hash";
const GENESIS_BLOCK_HASH_KEY: &str = "genesis_block_hash";

const OPEN_ATTEMPTS: u32 = 100;
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(50);

fn is_lock_contention(err: &sled::Error) -> bool {
    match err {
        sled::Error::Io(io) => {
            io.kind() == io::ErrorKind::WouldBlock
                || io.to_string().contains("could not acquire lock")
        }
        _ => false,
    }
}

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    db_path: PathBuf,
    blocks: Tree,
    block_ids: Tree,
    transactions: Tree,
    wallets: Tree,
    metadata: Tree,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<SledStore> {
        let db_path = path.as_ref().to_path_buf();
        let db = Self::open_db(&db_path)?;
        let open = |name: &str| {
            db.open_tree(name)
                .map_err(|e| LedgerError::Database(format!("Failed to open {name} tree: {e}")))
        };

        let store = SledStore {
            blocks: open(BLOCKS_TREE)?,
            block_ids: open(BLOCK_IDS_TREE)?,
            transactions: open(TRANSACTIONS_TREE)?,
            wallets: open(WALLETS_TREE)?,
            metadata: open(METADATA_TREE)?,
            db,
            db_path,
        };
        info!("Opened ledger database at {}", store.db_path.display());
        Ok(store)
    }

    // sled releases its file lock from a background thread after the last handle is
    // dropped, so opening the same path right after closing it can hit a held lock.
    // I wait for that release for a bounded time instead of failing straight away.
    fn open_db(db_path: &Path) -> Result<Db> {
        let mut attempt = 1;
        loop {
            match sled::open(db_path) {
                Ok(db) => return Ok(db),
                Err(e) if is_lock_contention(&e) && attempt < OPEN_ATTEMPTS => {
                    debug!(
                        "Database {} is still locked (attempt {attempt}/{OPEN_ATTEMPTS})",
                        db_path.display()
                    );
                    thread::sleep(OPEN_RETRY_DELAY);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(LedgerError::Database(format!(
                        "Failed to open database: {e}"
                    )));
                }
            }
        }
    }

    pub fn get_db_path(&self) -> &Path {
        self.db_path.as_path()
    }

    fn block_at(&self, hash: &[u8]) -> Result<Block> {
        let bytes = self.blocks.get(hash)?.ok_or_else(|| {
            LedgerError::NotFound(format!("block with hash {}", HEXLOWER.encode(hash)))
        })?;
        Block::deserialize(bytes.as_ref())
    }

    fn block_at_pointer(&self, key: &str, what: &str) -> Result<Block> {
        let hash = self
            .metadata
            .get(key)?
            .ok_or_else(|| LedgerError::NotFound(what.to_string()))?;
        self.block_at(hash.as_ref())
    }
}

impl Store for SledStore {
    fn create_block(&self, block: &Block) -> Result<()> {
        let block_bytes = block.serialize()?;
        let mut txn_entries = Vec::with_capacity(block.get_transactions().len());
        for txn in block.get_transactions() {
            txn_entries.push((txn.get_id().to_vec(), txn.serialize()?));
        }
        let hash = block.get_hash();

        (&self.blocks, &self.block_ids, &self.transactions, &self.metadata)
            .transaction(|(blocks, block_ids, transactions, metadata)| {
                let genesis_exists = metadata.get(GENESIS_BLOCK_HASH_KEY)?.is_some();
                let last_hash = metadata.get(LAST_BLOCK_HASH_KEY)?;
                if let Err(e) = check_extends(block, genesis_exists, last_hash.as_deref()) {
                    return abort(e);
                }

                blocks.insert(hash, block_bytes.as_slice())?;
                block_ids.insert(block.get_id().as_bytes(), hash)?;
                for (id, bytes) in &txn_entries {
                    transactions.insert(id.as_slice(), bytes.as_slice())?;
                }
                if block.is_genesis() {
                    metadata.insert(GENESIS_BLOCK_HASH_KEY, hash)?;
                }
                metadata.insert(LAST_BLOCK_HASH_KEY, hash)?;
                Ok(())
            })
            .map_err(|e: TransactionError<LedgerError>| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => {
                    LedgerError::Database(format!("Failed to write block: {e}"))
                }
            })?;

        self.db.flush()?;
        debug!("Stored block {} ({})", block.get_id(), HEXLOWER.encode(hash));
        Ok(())
    }

    fn get_blockchain(&self) -> Result<Vec<Block>> {
        BlockIterator::new(self)?.collect()
    }

    fn get_last_block(&self) -> Result<Block> {
        self.block_at_pointer(LAST_BLOCK_HASH_KEY, "last block")
    }

    fn get_genesis_block(&self) -> Result<Block> {
        self.block_at_pointer(GENESIS_BLOCK_HASH_KEY, "genesis block")
    }

    fn get_block_by_id(&self, id: &str) -> Result<Block> {
        let hash = self
            .block_ids
            .get(id.as_bytes())?
            .ok_or_else(|| LedgerError::NotFound(format!("block {id}")))?;
        self.block_at(hash.as_ref())
    }

    fn get_block_by_hash(&self, hash: &[u8]) -> Result<Block> {
        self.block_at(hash)
    }

    fn create_wallet(&self, wallet: &Wallet) -> Result<()> {
        let bytes = serialize(wallet)?;
        self.wallets.insert(wallet.get_address().as_bytes(), bytes)?;
        self.db.flush()?;
        Ok(())
    }

    fn get_wallet(&self, address: &str) -> Result<Wallet> {
        let bytes = self
            .wallets
            .get(address.as_bytes())?
            .ok_or_else(|| LedgerError::NotFound(format!("wallet {address}")))?;
        deserialize(bytes.as_ref())
    }

    fn get_wallets(&self) -> Result<Vec<Wallet>> {
        let mut wallets = vec![];
        for item in self.wallets.iter() {
            let (_, value) = item?;
            wallets.push(deserialize(value.as_ref())?);
        }
        Ok(wallets)
    }

    fn get_transaction(&self, id: &[u8]) -> Result<Transaction> {
        let bytes = self.transactions.get(id)?.ok_or_else(|| {
            LedgerError::NotFound(format!("transaction {}", HEXLOWER.encode(id)))
        })?;
        Transaction::deserialize(bytes.as_ref())
    }

    fn get_transactions(&self) -> Result<Vec<Transaction>> {
        let mut transactions = vec![];
        for item in self.transactions.iter() {
            let (_, value) = item?;
            transactions.push(Transaction::deserialize(value.as_ref())?);
        }
        Ok(transactions)
    }
}
