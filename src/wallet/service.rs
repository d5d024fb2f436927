use crate::error::Result;
use crate::storage::Store;
use crate::wallet::{checksum_matches, Wallet};
use log::{info, warn};
use std::sync::Arc;

/// Creates and looks up wallets held in the store
#[derive(Clone)]
pub struct WalletService {
    store: Arc<dyn Store>,
}

impl WalletService {
    pub fn new(store: Arc<dyn Store>) -> WalletService {
        WalletService { store }
    }

    pub fn create_wallet(&self) -> Result<Wallet> {
        let wallet = Wallet::new()?;
        self.store.create_wallet(&wallet)?;
        info!("Created wallet {}", wallet.get_address());
        Ok(wallet)
    }

    pub fn get_wallet(&self, address: &str) -> Result<Wallet> {
        self.store.get_wallet(address)
    }

    pub fn get_wallets(&self) -> Result<Vec<Wallet>> {
        self.store.get_wallets()
    }

    pub fn get_addresses(&self) -> Result<Vec<String>> {
        Ok(self
            .get_wallets()?
            .iter()
            .map(|wallet| wallet.get_address().to_string())
            .collect())
    }

    /// Only addresses of wallets in the store are valid. An unknown address is a
    /// not-found error; a known one must still pass the checksum.
    pub fn validate_address(&self, address: &str) -> Result<bool> {
        self.store.get_wallet(address)?;
        let valid = checksum_matches(address);
        if !valid {
            warn!("Checksum mismatch for address {address}");
        }
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn service() -> WalletService {
        WalletService::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_create_wallet_persists() {
        let service = service();
        let wallet = service.create_wallet().unwrap();
        let loaded = service.get_wallet(wallet.get_address()).unwrap();
        assert_eq!(loaded, wallet);
        assert_eq!(service.get_addresses().unwrap(), vec![wallet.get_address()]);
    }

    #[test]
    fn test_validate_known_address() {
        let service = service();
        let wallet = service.create_wallet().unwrap();
        assert!(service.validate_address(wallet.get_address()).unwrap());
    }

    #[test]
    fn test_validate_unknown_address_is_not_found() {
        let service = service();
        let stranger = Wallet::new().unwrap();
        let err = service.validate_address(stranger.get_address()).unwrap_err();
        assert!(err.is_not_found());
    }
}
