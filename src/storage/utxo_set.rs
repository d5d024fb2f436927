// This is where I work out who owns what. I never keep an index of unspent outputs:
// every query rescans the chain from the last block back to genesis.
// Walking newest first means I have already seen every spend of an output by the time
// I reach the output itself, so a single pass is enough.

use crate::core::{Transaction, TxnOutput};
use crate::error::Result;
use crate::storage::{BlockIterator, Store};
use data_encoding::HEXLOWER;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// (transaction id, output index)
pub type OutPoint = (Vec<u8>, usize);

#[derive(Clone)]
pub struct UtxoSet {
    store: Arc<dyn Store>,
}

impl UtxoSet {
    pub fn new(store: Arc<dyn Store>) -> UtxoSet {
        UtxoSet { store }
    }

    /// Transactions in scan order, newest first. Within a block the last transaction
    /// comes first.
    fn scan_order(&self) -> Result<Vec<Transaction>> {
        let mut transactions = vec![];
        for block in BlockIterator::new(self.store.as_ref())? {
            let block = block?;
            transactions.extend(block.get_transactions().iter().rev().cloned());
        }
        Ok(transactions)
    }

    /// Unspent outputs locked to `pub_key_hash`, grouped by transaction: each entry is a
    /// transaction and the indices of its outputs that are still unspent.
    fn unspent_by_transaction(&self, pub_key_hash: &[u8]) -> Result<Vec<(Transaction, Vec<usize>)>> {
        let mut spent: HashSet<OutPoint> = HashSet::new();
        let mut unspent = vec![];

        for txn in self.scan_order()? {
            let indices: Vec<usize> = txn
                .get_outputs()
                .iter()
                .enumerate()
                .filter(|(idx, output)| {
                    output.is_locked_with_key(pub_key_hash)
                        && !spent.contains(&(txn.get_id().to_vec(), *idx))
                })
                .map(|(idx, _)| idx)
                .collect();

            if !txn.is_coinbase() {
                for input in txn.get_inputs() {
                    if !input.uses_key(pub_key_hash) {
                        continue;
                    }
                    if let Some(out_idx) = input.output_index() {
                        spent.insert((input.get_prev_txn_id().to_vec(), out_idx));
                    }
                }
            }

            if !indices.is_empty() {
                unspent.push((txn, indices));
            }
        }
        Ok(unspent)
    }

    /// Transactions holding at least one unspent output locked to `pub_key_hash`
    pub fn get_unspent_transactions(&self, pub_key_hash: &[u8]) -> Result<Vec<Transaction>> {
        Ok(self
            .unspent_by_transaction(pub_key_hash)?
            .into_iter()
            .map(|(txn, _)| txn)
            .collect())
    }

    pub fn get_unspent_txn_outputs(&self, pub_key_hash: &[u8]) -> Result<Vec<TxnOutput>> {
        let mut outputs = vec![];
        for (txn, indices) in self.unspent_by_transaction(pub_key_hash)? {
            for idx in indices {
                outputs.push(txn.get_outputs()[idx].clone());
            }
        }
        Ok(outputs)
    }

    /// Picks unspent outputs in scan order until they cover `amount`. Returns the value
    /// collected and the chosen output indices keyed by hex transaction id; when the
    /// funds fall short everything available is returned.
    pub fn get_spendable_outputs(
        &self,
        pub_key_hash: &[u8],
        amount: u64,
    ) -> Result<(u64, BTreeMap<String, Vec<usize>>)> {
        let mut unspent_outputs: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut accumulated: u64 = 0;

        'scan: for (txn, indices) in self.unspent_by_transaction(pub_key_hash)? {
            let txid_hex = HEXLOWER.encode(txn.get_id());
            for idx in indices {
                if accumulated >= amount {
                    break 'scan;
                }
                accumulated = accumulated.saturating_add(txn.get_outputs()[idx].get_value());
                unspent_outputs
                    .entry(txid_hex.clone())
                    .or_default()
                    .push(idx);
            }
        }
        Ok((accumulated, unspent_outputs))
    }

    pub fn get_balance(&self, pub_key_hash: &[u8]) -> Result<u64> {
        Ok(self
            .get_unspent_txn_outputs(pub_key_hash)?
            .iter()
            .fold(0u64, |total, output| total.saturating_add(output.get_value())))
    }

    /// Every output named by an input anywhere on the chain, whoever signed it
    pub fn spent_outputs(&self) -> Result<HashSet<OutPoint>> {
        let mut spent = HashSet::new();
        for txn in self.scan_order()? {
            if txn.is_coinbase() {
                continue;
            }
            for input in txn.get_inputs() {
                if let Some(out_idx) = input.output_index() {
                    spent.insert((input.get_prev_txn_id().to_vec(), out_idx));
                }
            }
        }
        Ok(spent)
    }

    pub fn is_output_spent(&self, txid: &[u8], out_idx: usize) -> Result<bool> {
        Ok(self.spent_outputs()?.contains(&(txid.to_vec(), out_idx)))
    }
}
