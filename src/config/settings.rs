use crate::core::{DEFAULT_DIFFICULTY, DEFAULT_REWARD, MAX_DIFFICULTY};
use crate::error::{LedgerError, Result};
use log::{debug, info};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_KEY: &str = "LEDGER_CONFIG";
const DIFFICULTY_KEY: &str = "LEDGER_DIFFICULTY";
const REWARD_KEY: &str = "LEDGER_REWARD";
const DB_PATH_KEY: &str = "LEDGER_DB_PATH";

const DEFAULT_DB_PATH: &str = "./data";

/// Ledger settings. Built once at startup and passed to whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Leading zero bits required of a block hash
    pub difficulty: u32,
    /// Coins paid by the genesis coinbase
    pub reward: u64,
    pub db_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            difficulty: DEFAULT_DIFFICULTY,
            reward: DEFAULT_REWARD,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl Config {
    /// Defaults, then the TOML file (`path`, else `LEDGER_CONFIG` when set), then
    /// `LEDGER_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => env::var_os(CONFIG_PATH_KEY).map(PathBuf::from),
        };

        let mut config = match file {
            Some(file) => Self::from_file(&file)?,
            None => Config::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        info!(
            "Loaded config: difficulty {}, reward {}, db {}",
            config.difficulty,
            config.reward,
            config.db_path.display()
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        debug!("Reading config file {}", path.display());
        let contents = fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("Cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Config> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `LEDGER_DIFFICULTY`, `LEDGER_REWARD` and `LEDGER_DB_PATH` as found by `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(DIFFICULTY_KEY) {
            self.difficulty = value.trim().parse().map_err(|e| {
                LedgerError::Config(format!("{DIFFICULTY_KEY}={value} is not a number: {e}"))
            })?;
        }
        if let Some(value) = lookup(REWARD_KEY) {
            self.reward = value.trim().parse().map_err(|e| {
                LedgerError::Config(format!("{REWARD_KEY}={value} is not a number: {e}"))
            })?;
        }
        if let Some(value) = lookup(DB_PATH_KEY) {
            self.db_path = PathBuf::from(value);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.difficulty == 0 || self.difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::Config(format!(
                "difficulty must be between 1 and {MAX_DIFFICULTY}, got {}",
                self.difficulty
            )));
        }
        if self.reward == 0 {
            return Err(LedgerError::Config("reward must be positive".to_string()));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(LedgerError::Config("db_path must be set".to_string()));
        }
        Ok(())
    }
}
