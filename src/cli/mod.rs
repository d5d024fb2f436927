//! Command-line interface
//!
//! Argument parsing for the `utxo-ledger` binary.

pub mod commands;

pub use commands::{Command, Opt};
