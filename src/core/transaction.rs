// This file is the heart of how value moves in my ledger: the UTXO model, where every
// transaction consumes earlier outputs and creates new ones.
// Signing and verification work on a "trimmed" copy of the transaction: the input I'm
// processing carries the pub_key_hash of the output it unlocks instead of the real key,
// and every other input is blank. The hash of that copy is the per-input payload.

use crate::core::merkle::hash_transaction;
use crate::error::{LedgerError, Result};
use crate::utils::{
    deserialize, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, serialize,
};
use crate::wallet::{hash_pub_key, pub_key_hash_from_address};
use data_encoding::HEXLOWER;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Output index carried by the single input of a coinbase transaction
pub const COINBASE_OUT_IDX: i64 = -1;

/// Referenced transactions keyed by their hex-encoded id
pub type PrevTxns = HashMap<String, Transaction>;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
#[serde(rename_all = "camelCase")]
pub struct TxnInput {
    input_id: String,
    curr_txn_id: Vec<u8>,
    prev_txn_id: Vec<u8>,
    out_idx: i64,
    signature: Option<Vec<u8>>,
    // Raw spender key (X ∥ Y); arbitrary data for coinbase inputs
    pub_key: Vec<u8>,
}

impl TxnInput {
    /// Unsigned input spending output `out_idx` of `prev_txn_id`
    pub fn new(prev_txn_id: &[u8], out_idx: usize, pub_key: Vec<u8>) -> TxnInput {
        TxnInput {
            input_id: new_id(),
            curr_txn_id: vec![],
            prev_txn_id: prev_txn_id.to_vec(),
            out_idx: out_idx as i64,
            signature: None,
            pub_key,
        }
    }

    pub(crate) fn coinbase(data: &[u8]) -> TxnInput {
        TxnInput {
            input_id: new_id(),
            curr_txn_id: vec![],
            prev_txn_id: vec![],
            out_idx: COINBASE_OUT_IDX,
            signature: None,
            pub_key: data.to_vec(),
        }
    }

    pub fn get_input_id(&self) -> &str {
        self.input_id.as_str()
    }

    pub fn get_curr_txn_id(&self) -> &[u8] {
        self.curr_txn_id.as_slice()
    }

    pub fn get_prev_txn_id(&self) -> &[u8] {
        self.prev_txn_id.as_slice()
    }

    pub fn get_out_idx(&self) -> i64 {
        self.out_idx
    }

    /// Index into the referenced transaction's outputs; `None` for the coinbase marker
    pub fn output_index(&self) -> Option<usize> {
        usize::try_from(self.out_idx).ok()
    }

    pub fn get_signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }

    /// True when this input's key hashes to `pub_key_hash`
    pub fn uses_key(&self, pub_key_hash: &[u8]) -> bool {
        hash_pub_key(self.pub_key.as_slice()).eq(pub_key_hash)
    }

    #[cfg(test)]
    pub(crate) fn set_signature(&mut self, signature: Option<Vec<u8>>) {
        self.signature = signature;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(rename_all = "camelCase")]
pub struct TxnOutput {
    output_id: String,
    curr_txn_id: Vec<u8>,
    value: u64,
    pub_key_hash: Vec<u8>,
}

impl TxnOutput {
    /// Creates an output of `value` locked to `address`
    pub fn new(value: u64, address: &str) -> Result<TxnOutput> {
        let mut output = TxnOutput::locked_to(value, vec![]);
        output.lock(address)?;
        Ok(output)
    }

    /// Creates an output locked directly to a public key hash
    pub fn locked_to(value: u64, pub_key_hash: Vec<u8>) -> TxnOutput {
        TxnOutput {
            output_id: new_id(),
            curr_txn_id: vec![],
            value,
            pub_key_hash,
        }
    }

    fn lock(&mut self, address: &str) -> Result<()> {
        self.pub_key_hash = pub_key_hash_from_address(address)?;
        debug!(
            "Locking output to {address} with pub key hash {}",
            HEXLOWER.encode(&self.pub_key_hash)
        );
        Ok(())
    }

    pub fn get_output_id(&self) -> &str {
        self.output_id.as_str()
    }

    pub fn get_curr_txn_id(&self) -> &[u8] {
        self.curr_txn_id.as_slice()
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_pub_key_hash(&self) -> &[u8] {
        self.pub_key_hash.as_slice()
    }

    pub fn is_locked_with_key(&self, pub_key_hash: &[u8]) -> bool {
        self.pub_key_hash.eq(pub_key_hash)
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    #[serde(rename = "txnId")]
    id: Vec<u8>,
    #[serde(rename = "blockId")]
    block_id: String,
    #[serde(rename = "txnInputs")]
    inputs: Vec<TxnInput>,
    #[serde(rename = "txnOutputs")]
    outputs: Vec<TxnOutput>,
}

impl Transaction {
    /// Reward transaction paying `reward` to `to`. Empty `data` becomes "Coins to: <to>".
    pub fn new_coinbase(to: &str, data: &str, reward: u64) -> Result<Transaction> {
        let data = if data.is_empty() {
            format!("Coins to: {to}")
        } else {
            data.to_string()
        };

        let output = TxnOutput::new(reward, to)?;
        let input = TxnInput::coinbase(data.as_bytes());
        Transaction::assemble(vec![input], vec![output])
    }

    /// Builds an unsigned transaction, derives its id from the content hash and stamps
    /// that id into every input and output.
    pub fn assemble(inputs: Vec<TxnInput>, outputs: Vec<TxnOutput>) -> Result<Transaction> {
        let mut txn = Transaction {
            id: vec![],
            block_id: String::new(),
            inputs,
            outputs,
        };
        txn.id = txn.hash()?;

        for input in txn.inputs.iter_mut() {
            input.curr_txn_id = txn.id.clone();
        }
        for output in txn.outputs.iter_mut() {
            output.curr_txn_id = txn.id.clone();
        }
        Ok(txn)
    }

    pub fn hash(&self) -> Result<Vec<u8>> {
        hash_transaction(self)
    }


    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && self.inputs[0].prev_txn_id.is_empty()
            && self.inputs[0].out_idx == COINBASE_OUT_IDX
    }

    /// Copy with every input's signature and public key cleared
    pub fn trimmed_copy(&self) -> Transaction {
        let inputs = self
            .inputs
            .iter()
            .map(|input| TxnInput {
                input_id: input.input_id.clone(),
                curr_txn_id: input.curr_txn_id.clone(),
                prev_txn_id: input.prev_txn_id.clone(),
                out_idx: input.out_idx,
                signature: None,
                pub_key: vec![],
            })
            .collect();

        Transaction {
            id: self.id.clone(),
            block_id: String::new(),
            inputs,
            outputs: self.outputs.clone(),
        }
    }

    /// Output referenced by `input`, looked up in `prev_txns`
    pub fn referenced_output<'a>(
        input: &TxnInput,
        prev_txns: &'a PrevTxns,
    ) -> Result<&'a TxnOutput> {
        let prev_id = HEXLOWER.encode(input.get_prev_txn_id());
        let prev_txn = prev_txns.get(&prev_id).ok_or_else(|| {
            LedgerError::NotFound(format!("previous transaction {prev_id}"))
        })?;
        input
            .output_index()
            .and_then(|idx| prev_txn.outputs.get(idx))
            .ok_or_else(|| {
                LedgerError::Transaction(format!(
                    "output index {} out of range for transaction {prev_id}",
                    input.get_out_idx()
                ))
            })
    }

    /// Hash of the trimmed copy with input `idx` carrying `pub_key_hash`; this is the
    /// payload that gets signed for that input.
    fn signing_payload(
        trimmed: &mut Transaction,
        idx: usize,
        pub_key_hash: &[u8],
    ) -> Result<Vec<u8>> {
        trimmed.inputs[idx].signature = None;
        trimmed.inputs[idx].pub_key = pub_key_hash.to_vec();
        trimmed.id = trimmed.hash()?;
        // Cleared so the next input's payload is not affected
        trimmed.inputs[idx].pub_key = vec![];
        Ok(trimmed.id.clone())
    }

    /// Signs every input with `pkcs8`. Coinbase transactions are left untouched.
    pub fn sign(&mut self, pkcs8: &[u8], prev_txns: &PrevTxns) -> Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }

        let mut trimmed = self.trimmed_copy();
        for idx in 0..self.inputs.len() {
            let pub_key_hash =
                Self::referenced_output(&self.inputs[idx], prev_txns)?.pub_key_hash.clone();
            let payload = Self::signing_payload(&mut trimmed, idx, &pub_key_hash)?;
            // ring's P-256/SHA-256 scheme hashes its input again, so what actually gets
            // signed is SHA256(payload), not the payload itself
            let signature = ecdsa_p256_sha256_sign_digest(pkcs8, &payload)?;
            self.inputs[idx].signature = Some(signature);
        }
        Ok(())
    }

    /// Checks every input signature. Lookup failures are errors; a missing signature, a key
    /// that does not own the referenced output, or a failed ECDSA check yields `Ok(false)`.
    pub fn verify(&self, prev_txns: &PrevTxns) -> Result<bool> {
        if self.is_coinbase() {
            return Ok(true);
        }

        let mut trimmed = self.trimmed_copy();
        for (idx, input) in self.inputs.iter().enumerate() {
            let Some(signature) = input.get_signature() else {
                warn!(
                    "Input {idx} of transaction {} has no signature",
                    HEXLOWER.encode(&self.id)
                );
                return Ok(false);
            };

            let output = Self::referenced_output(input, prev_txns)?;
            if !input.uses_key(output.get_pub_key_hash()) {
                warn!(
                    "Input {idx} of transaction {} presents a key that does not own the output",
                    HEXLOWER.encode(&self.id)
                );
                return Ok(false);
            }

            let payload = Self::signing_payload(&mut trimmed, idx, output.get_pub_key_hash())?;
            // Same double hash as in sign(): ring checks the signature over SHA256(payload)
            if !ecdsa_p256_sha256_sign_verify(input.get_pub_key(), signature, &payload) {
                warn!(
                    "Signature {} could not be verified",
                    HEXLOWER.encode(signature)
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_block_id(&self) -> &str {
        self.block_id.as_str()
    }

    pub(crate) fn set_block_id(&mut self, block_id: &str) {
        self.block_id = block_id.to_string();
    }

    // I hash the transaction exactly as assemble() saw it: no id, no owning block, no
    // signatures and none of the curr_txn_id stamps that get written after the id exists.
    // That way rehashing a stored or signed transaction gives its id back.
    pub(crate) fn clear_for_hashing(&mut self) {
        self.id.clear();
        self.block_id.clear();
        for input in self.inputs.iter_mut() {
            input.signature = None;
            input.curr_txn_id.clear();
        }
        for output in self.outputs.iter_mut() {
            output.curr_txn_id.clear();
        }
    }

    pub fn get_inputs(&self) -> &[TxnInput] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[TxnOutput] {
        self.outputs.as_slice()
    }

    #[cfg(test)]
    pub(crate) fn inputs_mut(&mut self) -> &mut Vec<TxnInput> {
        &mut self.inputs
    }

    pub fn get_output_value(&self) -> Result<u64> {
        self.outputs.iter().try_fold(0u64, |total, output| {
            total
                .checked_add(output.get_value())
                .ok_or_else(|| LedgerError::Transaction("Output value overflow".to_string()))
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}
