use marketsettle_host::Host;
use marketsettle_types::{
    LockKey, NotFoundError, Result, StorageError, StorageKey, Transaction, TransactionId,
};

use super::{LockToken, load, save};

/// transaction-id → [`Transaction`].
pub struct TransactionStore;

impl TransactionStore {
    pub fn get<H: Host>(host: &H, id: TransactionId) -> Result<Option<Transaction>> {
        load(host, &StorageKey::Transaction(id))
    }

    /// Like [`TransactionStore::get`], but an unknown id is an error.
    pub fn require<H: Host>(host: &H, id: TransactionId) -> Result<Transaction> {
        Self::get(host, id)?.ok_or_else(|| NotFoundError::Transaction(id).into())
    }

    /// Store a new record. Fails if the id is taken.
    pub fn insert<H: Host>(host: &mut H, tx: &Transaction) -> Result<()> {
        let key = StorageKey::Transaction(tx.id);
        if host.storage_get(&key).is_some() {
            return Err(StorageError::Corrupt {
                key: key.to_string(),
                reason: "record already exists".into(),
            }
            .into());
        }
        save(host, key, tx)
    }

    /// Overwrite an existing record while holding its lock.
    pub fn put<H: Host>(host: &mut H, token: &LockToken, tx: &Transaction) -> Result<()> {
        token.check(LockKey::Transaction(tx.id))?;
        save(host, StorageKey::Transaction(tx.id), tx)
    }
}
