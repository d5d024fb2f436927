//! Error handling for the ledger
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`LedgerError`]. Store errors are passed through as `Database` without interpretation.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error kinds surfaced by the ledger engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Address failed to decode or its checksum did not match
    InvalidAddress(String),
    /// Malformed caller input (zero amount, bad id encoding, ...)
    Validation(String),
    /// Sender cannot cover the requested amount
    InsufficientFunds {
        from: String,
        requested: u64,
        available: u64,
    },
    /// A wallet, block or transaction lookup came back empty
    NotFound(String),
    /// A block was requested on a chain that has no genesis yet
    NoGenesis,
    /// Missing or non-verifying input signature
    InvalidSignature(String),
    /// Structurally invalid transaction (double spend, bad reference, value mismatch)
    Transaction(String),
    /// Block failed linkage, hash or proof-of-work checks
    InvalidBlock(String),
    /// Proof-of-work search was cancelled or exhausted
    Mining(String),
    /// Key generation or signing failure
    Crypto(String),
    /// Persistence layer errors
    Database(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            LedgerError::Validation(msg) => write!(f, "Validation error: {msg}"),
            LedgerError::InsufficientFunds {
                from,
                requested,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: {from} only has {available} coins to send, not {requested}"
                )
            }
            LedgerError::NotFound(msg) => write!(f, "Not found: {msg}"),
            LedgerError::NoGenesis => write!(f, "Cannot create a block without genesis"),
            LedgerError::InvalidSignature(msg) => write!(f, "Invalid signature: {msg}"),
            LedgerError::Transaction(msg) => write!(f, "Transaction error: {msg}"),
            LedgerError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            LedgerError::Mining(msg) => write!(f, "Mining error: {msg}"),
            LedgerError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            LedgerError::Database(msg) => write!(f, "Database error: {msg}"),
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::Config(msg) => write!(f, "Configuration error: {msg}"),
            LedgerError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound(_))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for LedgerError {
    fn from(err: bincode::error::EncodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for LedgerError {
    fn from(err: bincode::error::DecodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_names_sender_and_amounts() {
        let err = LedgerError::InsufficientFunds {
            from: "1Alice".to_string(),
            requested: 700,
            available: 500,
        };
        let msg = err.to_string();
        assert!(msg.contains("1Alice"));
        assert!(msg.contains("700"));
        assert!(msg.contains("500"));
    }

    #[test]
    fn test_no_genesis_message() {
        assert_eq!(
            LedgerError::NoGenesis.to_string(),
            "Cannot create a block without genesis"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(LedgerError::NotFound("wallet".to_string()).is_not_found());
        assert!(!LedgerError::NoGenesis.is_not_found());
    }
}
