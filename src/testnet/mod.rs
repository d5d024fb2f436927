//! Shared fixtures for unit tests
//!
//! Throwaway keys, pre-mined chains and an in-memory ledger at difficulty 1.

pub mod test_utils;

pub use test_utils::*;
