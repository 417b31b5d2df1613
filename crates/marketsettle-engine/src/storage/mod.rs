//! Storage layer: typed stores over the host's key-value state.
//!
//! Three record stores ([`TransactionStore`], [`AuctionStore`],
//! [`DisputeStore`]) plus the singleton [`ConfigStore`] and [`TreasuryStore`].
//! Records are `serde_json` bytes. Lookups of unknown ids return `None`.
//!
//! Overwriting an existing record requires the [`LockToken`] for its id,
//! which only [`crate::security::ReentrancyGuard`] hands out. A record and
//! its indices are written in the same invocation, so the host commits or
//! discards them together.

mod auctions;
mod disputes;
mod singleton;
mod transactions;

pub use auctions::AuctionStore;
pub use disputes::DisputeStore;
pub use singleton::{ConfigStore, Treasury, TreasuryStore};
pub use transactions::TransactionStore;

use marketsettle_host::Host;
use marketsettle_types::{LockKey, Result, SecurityError, StorageError, StorageKey};
use serde::{Serialize, de::DeserializeOwned};

/// Proof that the caller holds the reentrancy flag for one id.
///
/// Not `Clone`: a token is created by acquiring the flag and consumed by
/// releasing it.
#[derive(Debug, PartialEq, Eq)]
pub struct LockToken {
    key: LockKey,
}

impl LockToken {
    pub(crate) fn new(key: LockKey) -> Self {
        Self { key }
    }

    #[must_use]
    pub fn key(&self) -> LockKey {
        self.key
    }

    /// Fail unless this token guards `expected`.
    pub fn check(&self, expected: LockKey) -> Result<()> {
        if self.key != expected {
            return Err(SecurityError::LockNotHeld(expected.to_string()).into());
        }
        Ok(())
    }
}

pub(crate) fn load<H: Host, T: DeserializeOwned>(host: &H, key: &StorageKey) -> Result<Option<T>> {
    let Some(bytes) = host.storage_get(key) else {
        return Ok(None);
    };
    let record = serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Some(record))
}

pub(crate) fn save<H: Host, T: Serialize>(host: &mut H, key: StorageKey, record: &T) -> Result<()> {
    let bytes = serde_json::to_vec(record).map_err(|e| StorageError::Encode(e.to_string()))?;
    host.storage_set(key, bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use marketsettle_host::MemoryHost;
    use marketsettle_types::{MarketError, TransactionId};

    use super::*;

    #[test]
    fn missing_key_is_none() {
        let host = MemoryHost::mock_all_auths();
        let value: Option<u64> = load(&host, &StorageKey::Config).unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn corrupt_record_reported() {
        let mut host = MemoryHost::mock_all_auths();
        host.storage_set(StorageKey::Config, b"not json".to_vec());
        let err = load::<_, u64>(&host, &StorageKey::Config).unwrap_err();
        assert!(matches!(err, MarketError::Storage(StorageError::Corrupt { .. })));
    }

    #[test]
    fn token_checks_its_key() {
        let token = LockToken::new(LockKey::Transaction(TransactionId(1)));
        assert!(token.check(LockKey::Transaction(TransactionId(1))).is_ok());
        assert!(token.check(LockKey::Transaction(TransactionId(2))).is_err());
    }
}
