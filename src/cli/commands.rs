use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "utxo-ledger", about = "Proof-of-work UTXO ledger")]
pub struct Opt {
    #[arg(
        long = "config",
        global = true,
        help = "TOML config file (defaults to $LEDGER_CONFIG when set)"
    )]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createwallet", about = "Create a new wallet")]
    Createwallet,
    #[command(name = "listaddresses", about = "Print stored wallet addresses")]
    ListAddresses,
    #[command(name = "createblockchain", about = "Create a new blockchain")]
    Createblockchain {
        #[arg(help = "The address to send genesis block reward to")]
        address: String,
    },
    #[command(
        name = "getbalance",
        about = "Get the wallet balance of the target address"
    )]
    GetBalance {
        #[arg(help = "The wallet address")]
        address: String,
    },
    #[command(name = "getbalances", about = "Get the balance of every stored wallet")]
    GetBalances,
    #[command(name = "send", about = "Send coins between addresses and mine the block")]
    Send {
        #[arg(help = "Source wallet address")]
        from: String,
        #[arg(help = "Destination wallet address")]
        to: String,
        #[arg(help = "Amount to send")]
        amount: u64,
    },
    #[command(name = "printchain", about = "Print all blocks, newest first")]
    Printchain,
    #[command(name = "printblock", about = "Print one block")]
    PrintBlock {
        #[arg(help = "Block id")]
        id: String,
    },
    #[command(name = "printtxn", about = "Print one transaction")]
    PrintTxn {
        #[arg(help = "Hex-encoded transaction id")]
        id: String,
    },
    #[command(
        name = "validatechain",
        about = "Check hashes, proof of work and signatures of the whole chain"
    )]
    ValidateChain,
}
