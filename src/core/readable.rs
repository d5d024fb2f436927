//! Display views of ledger data
//!
//! Every binary field is hex encoded and names are camelCase, so these are what the
//! command line prints. Wallet views never include the private key.

use crate::core::{Block, Transaction, TxnInput, TxnOutput};
use crate::wallet::Wallet;
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadableTxnInput {
    pub input_id: String,
    pub curr_txn_id: String,
    pub prev_txn_id: String,
    pub out_idx: i64,
    pub signature: String,
    pub pub_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadableTxnOutput {
    pub output_id: String,
    pub curr_txn_id: String,
    pub value: u64,
    pub pub_key_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadableTransaction {
    pub txn_id: String,
    pub block_id: String,
    pub txn_inputs: Vec<ReadableTxnInput>,
    pub txn_outputs: Vec<ReadableTxnOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadableBlock {
    pub id: String,
    pub timestamp: i64,
    pub transactions: Vec<ReadableTransaction>,
    pub prev_hash: String,
    pub hash: String,
    pub nonce: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadableWallet {
    pub id: String,
    pub address: String,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBalance {
    pub address: String,
    pub balance: u64,
}

impl From<&TxnInput> for ReadableTxnInput {
    fn from(input: &TxnInput) -> Self {
        ReadableTxnInput {
            input_id: input.get_input_id().to_string(),
            curr_txn_id: HEXLOWER.encode(input.get_curr_txn_id()),
            prev_txn_id: HEXLOWER.encode(input.get_prev_txn_id()),
            out_idx: input.get_out_idx(),
            signature: input
                .get_signature()
                .map(|signature| HEXLOWER.encode(signature))
                .unwrap_or_default(),
            pub_key: HEXLOWER.encode(input.get_pub_key()),
        }
    }
}

impl From<&TxnOutput> for ReadableTxnOutput {
    fn from(output: &TxnOutput) -> Self {
        ReadableTxnOutput {
            output_id: output.get_output_id().to_string(),
            curr_txn_id: HEXLOWER.encode(output.get_curr_txn_id()),
            value: output.get_value(),
            pub_key_hash: HEXLOWER.encode(output.get_pub_key_hash()),
        }
    }
}

impl From<&Transaction> for ReadableTransaction {
    fn from(txn: &Transaction) -> Self {
        ReadableTransaction {
            txn_id: HEXLOWER.encode(txn.get_id()),
            block_id: txn.get_block_id().to_string(),
            txn_inputs: txn.get_inputs().iter().map(ReadableTxnInput::from).collect(),
            txn_outputs: txn.get_outputs().iter().map(ReadableTxnOutput::from).collect(),
        }
    }
}

impl From<&Block> for ReadableBlock {
    fn from(block: &Block) -> Self {
        ReadableBlock {
            id: block.get_id().to_string(),
            timestamp: block.get_timestamp(),
            transactions: block
                .get_transactions()
                .iter()
                .map(ReadableTransaction::from)
                .collect(),
            prev_hash: HEXLOWER.encode(block.get_prev_hash()),
            hash: HEXLOWER.encode(block.get_hash()),
            nonce: block.get_nonce(),
        }
    }
}

impl From<&Wallet> for ReadableWallet {
    fn from(wallet: &Wallet) -> Self {
        ReadableWallet {
            id: wallet.get_id().to_string(),
            address: wallet.get_address().to_string(),
            public_key: HEXLOWER.encode(wallet.get_public_key()),
        }
    }
}
