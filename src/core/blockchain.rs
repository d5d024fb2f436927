// This is the main ledger engine. When I need to add value transfers, this is where
// it happens: I read the last block, mine a new one on top of it and hand it to the
// store. Everything read-only (chain, blocks, balances) is also answered from here.
// Appends are serialised by a lock so two callers never mine siblings of the same block.

use crate::config::Config;
use crate::core::readable::AddressBalance;
use crate::core::{Block, ProofOfWork, Transaction, TransactionService};
use crate::error::{LedgerError, Result};
use crate::storage::{BlockIterator, Store};
use crate::wallet::WalletService;
use data_encoding::HEXLOWER;
use log::{error, info};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct Blockchain {
    store: Arc<dyn Store>,
    wallets: WalletService,
    transactions: TransactionService,
    pow: ProofOfWork,
    append_lock: Mutex<()>,
}

impl Blockchain {
    pub fn new(store: Arc<dyn Store>, difficulty: u32, reward: u64) -> Result<Blockchain> {
        Ok(Blockchain {
            wallets: WalletService::new(Arc::clone(&store)),
            transactions: TransactionService::new(Arc::clone(&store), reward),
            pow: ProofOfWork::new(difficulty)?,
            store,
            append_lock: Mutex::new(()),
        })
    }

    pub fn from_config(store: Arc<dyn Store>, config: &Config) -> Result<Blockchain> {
        Self::new(store, config.difficulty, config.reward)
    }

    pub fn wallets(&self) -> &WalletService {
        &self.wallets
    }

    pub fn transactions(&self) -> &TransactionService {
        &self.transactions
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    fn lock_appends(&self) -> Result<MutexGuard<'_, ()>> {
        self.append_lock
            .lock()
            .map_err(|_| LedgerError::Mining("Append lock poisoned".to_string()))
    }

    fn mine_and_store(&self, transactions: Vec<Transaction>, prev_hash: Vec<u8>) -> Result<Block> {
        let mut block = Block::new(transactions, prev_hash)?;
        let (nonce, hash) = self.pow.solve(&block)?;
        block.set_proof(nonce, hash);
        self.store.create_block(&block)?;
        info!(
            "Added block {} with hash {}",
            block.get_id(),
            HEXLOWER.encode(block.get_hash())
        );
        Ok(block)
    }

    /// Mines a block over `transactions` on top of `prev_hash` and persists it. The store
    /// refuses the block unless `prev_hash` is the current last block (or empty for the
    /// first block of a new chain).
    pub fn create_block(&self, transactions: Vec<Transaction>, prev_hash: Vec<u8>) -> Result<Block> {
        let _guard = self.lock_appends()?;
        self.mine_and_store(transactions, prev_hash)
    }

    /// Creates the genesis block paying the reward to `address`. When a chain already
    /// exists its genesis is returned together with `true`.
    pub fn create_blockchain(&self, address: &str) -> Result<(Block, bool)> {
        if !self.wallets.validate_address(address)? {
            return Err(LedgerError::InvalidAddress(address.to_string()));
        }

        let _guard = self.lock_appends()?;
        match self.store.get_genesis_block() {
            Ok(genesis) => {
                info!("Blockchain already exists");
                return Ok((genesis, true));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let coinbase = self
            .transactions
            .create_coinbase_txn(address, "Start of Blockchain")?;
        let genesis = self.mine_and_store(vec![coinbase], vec![])?;
        info!("Created blockchain with genesis block {}", genesis.get_id());
        Ok((genesis, false))
    }

    fn require_genesis(&self) -> Result<()> {
        match self.store.get_genesis_block() {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Err(LedgerError::NoGenesis),
            Err(e) => Err(e),
        }
    }

    fn require_valid_address(&self, address: &str) -> Result<()> {
        if self.wallets.validate_address(address)? {
            Ok(())
        } else {
            Err(LedgerError::InvalidAddress(address.to_string()))
        }
    }

    /// Sends `amount` from `from` to `to` in a newly mined block
    pub fn add_to_blockchain(&self, from: &str, to: &str, amount: u64) -> Result<Block> {
        self.require_valid_address(from)?;
        self.require_valid_address(to)?;

        let _guard = self.lock_appends()?;
        self.require_genesis()?;

        let txn = self.transactions.create_transaction(from, to, amount)?;
        self.transactions.validate_spend(&txn)?;

        let last = self.store.get_last_block()?;
        self.mine_and_store(vec![txn], last.get_hash().to_vec())
    }

    /// Mines a block holding a transaction built and signed elsewhere. It must pass the
    /// same admission checks as a locally built one, against the chain as it is now.
    pub fn submit_transaction(&self, txn: Transaction) -> Result<Block> {
        let _guard = self.lock_appends()?;
        self.require_genesis()?;

        if let Err(e) = self.transactions.validate_spend(&txn) {
            error!(
                "Rejected transaction {}: {e}",
                HEXLOWER.encode(txn.get_id())
            );
            return Err(e);
        }

        let last = self.store.get_last_block()?;
        self.mine_and_store(vec![txn], last.get_hash().to_vec())
    }

    /// Every block, newest first
    pub fn get_blockchain(&self) -> Result<Vec<Block>> {
        self.store.get_blockchain()
    }

    pub fn get_genesis_block(&self) -> Result<Block> {
        self.store.get_genesis_block()
    }

    pub fn get_block(&self, id: &str) -> Result<Block> {
        self.store.get_block_by_id(id)
    }

    pub fn get_last_block(&self) -> Result<Block> {
        self.store.get_last_block()
    }

    pub fn get_balance(&self, address: &str) -> Result<u64> {
        self.transactions.get_balance(address)
    }

    pub fn get_balances(&self) -> Result<Vec<AddressBalance>> {
        self.transactions.get_balances()
    }

    pub fn get_transaction(&self, txn_id: &str) -> Result<Transaction> {
        self.transactions.get_transaction(txn_id)
    }

    pub fn get_transactions(&self) -> Result<Vec<Transaction>> {
        self.transactions.get_transactions()
    }

    /// Audits the whole chain from the last block back to genesis: hash linkage, stored
    /// hash against the recomputed one, proof of work, and every spend's signatures.
    /// Returns the number of blocks checked.
    pub fn validate_chain(&self) -> Result<usize> {
        let mut checked = 0;
        let mut expected_hash: Option<Vec<u8>> = None;

        for block in BlockIterator::new(self.store.as_ref())? {
            let block = block?;
            let block_id = block.get_id().to_string();

            if let Some(expected) = &expected_hash {
                if expected.as_slice() != block.get_hash() {
                    return Err(LedgerError::InvalidBlock(format!(
                        "Block {block_id} is not the parent its successor names"
                    )));
                }
            }
            if !ProofOfWork::verify_block_hash(&block) {
                return Err(LedgerError::InvalidBlock(format!(
                    "Block {block_id} does not match its stored hash"
                )));
            }
            if !self.pow.validate_proof(&block) {
                return Err(LedgerError::InvalidBlock(format!(
                    "Block {block_id} does not meet the proof-of-work target"
                )));
            }
            for txn in block.get_transactions() {
                if txn.get_block_id() != block_id {
                    return Err(LedgerError::InvalidBlock(format!(
                        "Transaction {} is not stamped with block {block_id}",
                        HEXLOWER.encode(txn.get_id())
                    )));
                }
                if !self.transactions.verify_transaction(txn)? {
                    return Err(LedgerError::InvalidSignature(format!(
                        "Transaction {} in block {block_id} failed verification",
                        HEXLOWER.encode(txn.get_id())
                    )));
                }
            }

            expected_hash = Some(block.get_prev_hash().to_vec());
            checked += 1;
        }

        if checked == 0 {
            return Err(LedgerError::NoGenesis);
        }
        info!("Validated {checked} blocks");
        Ok(checked)
    }
}
