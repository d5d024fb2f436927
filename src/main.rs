// Command-line front end: opens the sled store named by the config and runs one command
use clap::Parser;
use log::{error, LevelFilter};
use serde::Serialize;
use std::process;
use std::sync::Arc;
use utxo_ledger::{
    Blockchain, Command, Config, Opt, ReadableBlock, ReadableTransaction, Result, SledStore,
};

fn main() {
    // Info by default; RUST_LOG still takes precedence
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();
    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(opt: Opt) -> Result<()> {
    let config = Config::load(opt.config.as_deref())?;
    let store = Arc::new(SledStore::open(&config.db_path)?);
    let chain = Blockchain::from_config(store, &config)?;

    match opt.command {
        Command::Createwallet => {
            let wallet = chain.wallets().create_wallet()?;
            println!("Your new address: {}", wallet.get_address());
        }
        Command::ListAddresses => {
            for address in chain.wallets().get_addresses()? {
                println!("{address}");
            }
        }
        Command::Createblockchain { address } => {
            let (genesis, existed) = chain.create_blockchain(&address)?;
            if existed {
                println!("Blockchain already exists, genesis block {}", genesis.get_id());
            } else {
                println!("Created blockchain, genesis block {}", genesis.get_id());
            }
        }
        Command::GetBalance { address } => {
            let balance = chain.get_balance(&address)?;
            println!("Balance of {address}: {balance}");
        }
        Command::GetBalances => {
            print_json(&chain.get_balances()?)?;
        }
        Command::Send { from, to, amount } => {
            let block = chain.add_to_blockchain(&from, &to, amount)?;
            println!("Success! Mined block {}", block.get_id());
        }
        Command::Printchain => {
            let blocks: Vec<ReadableBlock> = chain
                .get_blockchain()?
                .iter()
                .map(ReadableBlock::from)
                .collect();
            print_json(&blocks)?;
        }
        Command::PrintBlock { id } => {
            print_json(&ReadableBlock::from(&chain.get_block(&id)?))?;
        }
        Command::PrintTxn { id } => {
            print_json(&ReadableTransaction::from(&chain.get_transaction(&id)?))?;
        }
        Command::ValidateChain => {
            let checked = chain.validate_chain()?;
            println!("Chain is valid ({checked} blocks)");
        }
    }
    Ok(())
}
