//! Configuration management
//!
//! Mining difficulty, the genesis reward and the database location, read from an
//! optional TOML file and `LEDGER_*` environment variables.

pub mod settings;

pub use settings::{Config, CONFIG_PATH_KEY};
