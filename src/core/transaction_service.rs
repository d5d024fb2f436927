// The transaction engine: I build, sign and check transactions here against whatever
// chain the store holds. Nothing in this file mines or writes blocks; that's the job of
// blockchain.rs, which calls into me before it mines anything.

use crate::core::readable::AddressBalance;
use crate::core::transaction::PrevTxns;
use crate::core::{Transaction, TxnInput, TxnOutput};
use crate::error::{LedgerError, Result};
use crate::storage::{Store, UtxoSet};
use crate::wallet::{hash_pub_key, pub_key_hash_from_address, PrivateKey, WalletService};
use data_encoding::HEXLOWER;
use log::{error, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

pub const DEFAULT_REWARD: u64 = 500;

#[derive(Clone)]
pub struct TransactionService {
    store: Arc<dyn Store>,
    wallets: WalletService,
    utxo: UtxoSet,
    reward: u64,
}

impl TransactionService {
    pub fn new(store: Arc<dyn Store>, reward: u64) -> TransactionService {
        TransactionService {
            wallets: WalletService::new(Arc::clone(&store)),
            utxo: UtxoSet::new(Arc::clone(&store)),
            store,
            reward,
        }
    }

    pub fn get_reward(&self) -> u64 {
        self.reward
    }

    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo
    }

    pub fn new_txn_output(&self, value: u64, address: &str) -> Result<TxnOutput> {
        TxnOutput::new(value, address)
    }

    pub fn create_coinbase_txn(&self, to: &str, data: &str) -> Result<Transaction> {
        info!("Creating coinbase transaction of {} to {to}", self.reward);
        Transaction::new_coinbase(to, data, self.reward)
    }

    pub fn is_coinbase_transaction(&self, txn: &Transaction) -> bool {
        txn.is_coinbase()
    }

    /// Spends the sender's unspent outputs, paying `amount` to `to` and any change back to
    /// `from`, and signs every input with the sender's key.
    pub fn create_transaction(&self, from: &str, to: &str, amount: u64) -> Result<Transaction> {
        info!("Creating transaction of {amount} from {from} to {to}");
        if amount == 0 {
            return Err(LedgerError::Validation(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let wallet = self.wallets.get_wallet(from)?;
        let pub_key_hash = hash_pub_key(wallet.get_public_key());

        let (available, valid_outputs) = self.utxo.get_spendable_outputs(&pub_key_hash, amount)?;
        if amount > available {
            error!("{from} only has {available} coins to send to {to}, not {amount}");
            return Err(LedgerError::InsufficientFunds {
                from: from.to_string(),
                requested: amount,
                available,
            });
        }

        let mut inputs = vec![];
        for (txid_hex, out_indices) in &valid_outputs {
            let txid = HEXLOWER.decode(txid_hex.as_bytes()).map_err(|e| {
                LedgerError::Serialization(format!("Failed to decode transaction id: {e}"))
            })?;
            for out_idx in out_indices {
                inputs.push(TxnInput::new(
                    &txid,
                    *out_idx,
                    wallet.get_public_key().to_vec(),
                ));
            }
        }

        // Whatever I collected beyond the amount goes back to the sender as change
        let mut outputs = vec![self.new_txn_output(amount, to)?];
        if available > amount {
            outputs.push(self.new_txn_output(available - amount, from)?);
        }

        let txn = Transaction::assemble(inputs, outputs)?;
        self.sign_transaction(txn, wallet.get_private_key())
    }

    pub fn create_trimmed_txn_copy(&self, txn: &Transaction) -> Transaction {
        txn.trimmed_copy()
    }

    /// Transactions referenced by the inputs of `txn`, loaded from the store
    pub fn prev_transactions(&self, txn: &Transaction) -> Result<PrevTxns> {
        let mut prev_txns = PrevTxns::new();
        if txn.is_coinbase() {
            return Ok(prev_txns);
        }
        for input in txn.get_inputs() {
            let key = HEXLOWER.encode(input.get_prev_txn_id());
            if prev_txns.contains_key(&key) {
                continue;
            }
            let prev = self.store.get_transaction(input.get_prev_txn_id())?;
            prev_txns.insert(key, prev);
        }
        Ok(prev_txns)
    }

    pub fn sign_transaction(&self, txn: Transaction, private_key: &PrivateKey) -> Result<Transaction> {
        let mut txn = txn;
        let prev_txns = self.prev_transactions(&txn)?;
        txn.sign(private_key.as_bytes(), &prev_txns)?;
        Ok(txn)
    }

    pub fn verify_transaction(&self, txn: &Transaction) -> Result<bool> {
        let prev_txns = self.prev_transactions(txn)?;
        txn.verify(&prev_txns)
    }

    /// Admission check for a spend about to be mined: every input names an existing
    /// output not yet spent on the chain, no output is named twice, inputs and outputs
    /// carry the same value, and every signature verifies.
    pub fn validate_spend(&self, txn: &Transaction) -> Result<()> {
        let txn_id = HEXLOWER.encode(txn.get_id());
        if txn.is_coinbase() {
            return Err(LedgerError::Transaction(format!(
                "Coinbase transaction {txn_id} cannot be submitted"
            )));
        }
        if txn.get_inputs().is_empty() || txn.get_outputs().is_empty() {
            return Err(LedgerError::Transaction(format!(
                "Transaction {txn_id} needs at least one input and one output"
            )));
        }
        // A forged id could otherwise overwrite a stored transaction with the same key
        if txn.hash()? != txn.get_id() {
            return Err(LedgerError::Transaction(format!(
                "Transaction {txn_id} does not match its content hash"
            )));
        }
        if txn.get_outputs().iter().any(|output| output.get_value() == 0) {
            return Err(LedgerError::Validation(format!(
                "Transaction {txn_id} has a zero-value output"
            )));
        }

        // I check against every spend on the chain, not just the sender's, so a
        // transaction built before another one was mined can't reuse its outputs
        let prev_txns = self.prev_transactions(txn)?;
        let spent = self.utxo.spent_outputs()?;
        let mut referenced = HashSet::new();
        let mut input_total: u64 = 0;

        for input in txn.get_inputs() {
            let output = Transaction::referenced_output(input, &prev_txns)?;
            let prev_id = HEXLOWER.encode(input.get_prev_txn_id());
            // referenced_output only resolves real output indices
            let out_point = (
                input.get_prev_txn_id().to_vec(),
                input.output_index().unwrap_or_default(),
            );

            if !referenced.insert(out_point.clone()) {
                return Err(LedgerError::Transaction(format!(
                    "Transaction {txn_id} spends output {prev_id}:{} twice",
                    out_point.1
                )));
            }
            if spent.contains(&out_point) {
                warn!("Rejecting double spend in transaction {txn_id}");
                return Err(LedgerError::Transaction(format!(
                    "Output {prev_id}:{} is already spent",
                    out_point.1
                )));
            }
            input_total = input_total.checked_add(output.get_value()).ok_or_else(|| {
                LedgerError::Transaction("Input value overflow".to_string())
            })?;
        }

        // No mining reward after genesis, so value in must equal value out
        let output_total = txn.get_output_value()?;
        if input_total != output_total {
            return Err(LedgerError::Transaction(format!(
                "Transaction {txn_id} spends {input_total} but pays out {output_total}"
            )));
        }

        if !txn.verify(&prev_txns)? {
            return Err(LedgerError::InvalidSignature(format!(
                "Transaction {txn_id} failed signature verification"
            )));
        }
        Ok(())
    }

    pub fn get_unspent_transactions(&self, pub_key_hash: &[u8]) -> Result<Vec<Transaction>> {
        self.utxo.get_unspent_transactions(pub_key_hash)
    }

    pub fn get_unspent_txn_outputs(&self, pub_key_hash: &[u8]) -> Result<Vec<TxnOutput>> {
        self.utxo.get_unspent_txn_outputs(pub_key_hash)
    }

    pub fn get_spendable_outputs(
        &self,
        pub_key_hash: &[u8],
        amount: u64,
    ) -> Result<(u64, BTreeMap<String, Vec<usize>>)> {
        self.utxo.get_spendable_outputs(pub_key_hash, amount)
    }

    /// Balance of a stored wallet
    pub fn get_balance(&self, address: &str) -> Result<u64> {
        let wallet = self.wallets.get_wallet(address)?;
        let pub_key_hash = pub_key_hash_from_address(wallet.get_address())?;
        self.utxo.get_balance(&pub_key_hash)
    }

    pub fn get_balances(&self) -> Result<Vec<AddressBalance>> {
        let mut balances = vec![];
        for wallet in self.wallets.get_wallets()? {
            let pub_key_hash = pub_key_hash_from_address(wallet.get_address())?;
            balances.push(AddressBalance {
                address: wallet.get_address().to_string(),
                balance: self.utxo.get_balance(&pub_key_hash)?,
            });
        }
        Ok(balances)
    }

    /// Looks up a transaction by its hex-encoded id
    pub fn get_transaction(&self, txn_id: &str) -> Result<Transaction> {
        let id = HEXLOWER.decode(txn_id.as_bytes()).map_err(|e| {
            LedgerError::Validation(format!("Invalid transaction id {txn_id}: {e}"))
        })?;
        self.store.get_transaction(&id)
    }

    pub fn get_transactions(&self) -> Result<Vec<Transaction>> {
        self.store.get_transactions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::TestLedger;

    #[test]
    fn test_create_transaction_pays_amount_and_change() {
        let ledger = TestLedger::new();
        let alice = ledger.funded_wallet();
        let bob = ledger.wallet();
        let service = ledger.chain.transactions();

        let txn = service
            .create_transaction(alice.get_address(), bob.get_address(), 120)
            .unwrap();
        assert_eq!(txn.get_inputs().len(), 1);
        assert_eq!(txn.get_outputs().len(), 2);
        assert_eq!(txn.get_outputs()[0].get_value(), 120);
        assert!(txn.get_outputs()[0].is_locked_with_key(&bob.get_pub_key_hash()));
        assert_eq!(txn.get_outputs()[1].get_value(), 380);
        assert!(txn.get_outputs()[1].is_locked_with_key(&alice.get_pub_key_hash()));

        assert!(service.verify_transaction(&txn).unwrap());
        service.validate_spend(&txn).unwrap();
    }

    #[test]
    fn test_exact_amount_has_no_change() {
        let ledger = TestLedger::new();
        let alice = ledger.funded_wallet();
        let bob = ledger.wallet();
        let txn = ledger
            .chain
            .transactions()
            .create_transaction(alice.get_address(), bob.get_address(), 500)
            .unwrap();
        assert_eq!(txn.get_outputs().len(), 1);
    }

    #[test]
    fn test_insufficient_funds_names_sender_and_amounts() {
        let ledger = TestLedger::new();
        let alice = ledger.funded_wallet();
        let bob = ledger.wallet();
        let err = ledger
            .chain
            .transactions()
            .create_transaction(alice.get_address(), bob.get_address(), 501)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                from: alice.get_address().to_string(),
                requested: 501,
                available: 500,
            }
        );
    }

    #[test]
    fn test_zero_amount_is_rejected() {
        let ledger = TestLedger::new();
        let alice = ledger.funded_wallet();
        let err = ledger
            .chain
            .transactions()
            .create_transaction(alice.get_address(), alice.get_address(), 0)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_unknown_sender_is_not_found() {
        let ledger = TestLedger::new();
        let stranger = crate::wallet::Wallet::new().unwrap();
        let bob = ledger.wallet();
        let err = ledger
            .chain
            .transactions()
            .create_transaction(stranger.get_address(), bob.get_address(), 1)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_validate_spend_rejects_inflation() {
        let ledger = TestLedger::new();
        let alice = ledger.funded_wallet();
        let service = ledger.chain.transactions();
        let txn = service
            .create_transaction(alice.get_address(), alice.get_address(), 500)
            .unwrap();

        // Same inputs, but paying out more than they hold
        let inflated = Transaction::assemble(
            txn.get_inputs()
                .iter()
                .map(|input| {
                    TxnInput::new(
                        input.get_prev_txn_id(),
                        input.output_index().unwrap(),
                        input.get_pub_key().to_vec(),
                    )
                })
                .collect(),
            vec![TxnOutput::locked_to(900, alice.get_pub_key_hash())],
        )
        .unwrap();
        let inflated = service
            .sign_transaction(inflated, alice.get_private_key())
            .unwrap();
        assert!(service.verify_transaction(&inflated).unwrap());
        assert!(matches!(
            service.validate_spend(&inflated),
            Err(LedgerError::Transaction(_))
        ));
    }

    #[test]
    fn test_validate_spend_rejects_repeated_input() {
        let ledger = TestLedger::new();
        let alice = ledger.funded_wallet();
        let service = ledger.chain.transactions();
        let genesis = ledger.chain.get_genesis_block().unwrap();
        let coinbase_id = genesis.get_transactions()[0].get_id().to_vec();

        let doubled = Transaction::assemble(
            vec![
                TxnInput::new(&coinbase_id, 0, alice.get_public_key().to_vec()),
                TxnInput::new(&coinbase_id, 0, alice.get_public_key().to_vec()),
            ],
            vec![TxnOutput::locked_to(1000, alice.get_pub_key_hash())],
        )
        .unwrap();
        let doubled = service
            .sign_transaction(doubled, alice.get_private_key())
            .unwrap();
        let err = service.validate_spend(&doubled).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_validate_spend_rejects_tampered_signature() {
        let ledger = TestLedger::new();
        let alice = ledger.funded_wallet();
        let bob = ledger.wallet();
        let service = ledger.chain.transactions();
        let mut txn = service
            .create_transaction(alice.get_address(), bob.get_address(), 10)
            .unwrap();
        let mut signature = txn.get_inputs()[0].get_signature().unwrap().to_vec();
        signature[0] ^= 0x80;
        txn.inputs_mut()[0].set_signature(Some(signature));

        assert!(matches!(
            service.validate_spend(&txn),
            Err(LedgerError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_balances_cover_every_wallet() {
        let ledger = TestLedger::new();
        let alice = ledger.funded_wallet();
        let bob = ledger.wallet();
        let mut balances = ledger.chain.transactions().get_balances().unwrap();
        balances.sort_by(|a, b| a.address.cmp(&b.address));

        let mut expected = vec![
            AddressBalance {
                address: alice.get_address().to_string(),
                balance: 500,
            },
            AddressBalance {
                address: bob.get_address().to_string(),
                balance: 0,
            },
        ];
        expected.sort_by(|a, b| a.address.cmp(&b.address));
        assert_eq!(balances, expected);
    }

    #[test]
    fn test_get_transaction_by_hex_id() {
        let ledger = TestLedger::new();
        ledger.funded_wallet();
        let service = ledger.chain.transactions();
        let genesis = ledger.chain.get_genesis_block().unwrap();
        let id = HEXLOWER.encode(genesis.get_transactions()[0].get_id());

        let txn = service.get_transaction(&id).unwrap();
        assert_eq!(txn.get_block_id(), genesis.get_id());
        assert!(matches!(
            service.get_transaction("not-hex"),
            Err(LedgerError::Validation(_))
        ));
        assert!(service
            .get_transaction(&HEXLOWER.encode(&[0u8; 32]))
            .unwrap_err()
            .is_not_found());
    }
}
