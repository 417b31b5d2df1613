use marketsettle_host::Host;
use marketsettle_types::{
    Dispute, DisputeId, LockKey, NotFoundError, Result, StateError, StorageKey, TransactionId,
};

use super::{LockToken, load, save};

/// dispute-id → [`Dispute`], plus the index transaction-id → dispute-id.
pub struct DisputeStore;

impl DisputeStore {
    pub fn get<H: Host>(host: &H, id: DisputeId) -> Result<Option<Dispute>> {
        load(host, &StorageKey::Dispute(id))
    }

    pub fn require<H: Host>(host: &H, id: DisputeId) -> Result<Dispute> {
        Self::get(host, id)?.ok_or_else(|| NotFoundError::Dispute(id).into())
    }

    pub fn for_transaction<H: Host>(host: &H, tx: TransactionId) -> Result<Option<DisputeId>> {
        load(host, &StorageKey::TransactionDispute(tx))
    }

    /// Store a new dispute and index it under its transaction. A
    /// transaction can be disputed at most once.
    pub fn insert<H: Host>(host: &mut H, dispute: &Dispute) -> Result<()> {
        if Self::for_transaction(host, dispute.transaction)?.is_some() {
            return Err(StateError::DisputeExists(dispute.transaction).into());
        }
        save(host, StorageKey::Dispute(dispute.id), dispute)?;
        save(host, StorageKey::TransactionDispute(dispute.transaction), &dispute.id)
    }

    pub fn put<H: Host>(host: &mut H, token: &LockToken, dispute: &Dispute) -> Result<()> {
        token.check(LockKey::Dispute(dispute.id))?;
        save(host, StorageKey::Dispute(dispute.id), dispute)
    }
}
