//! The execution-host boundary.
//!
//! The settlement core runs inside a single-invocation host: it has no
//! threads, locks or wall clock, only what this trait exposes. Everything
//! an invocation writes (storage, balances, sequence, events) becomes
//! visible only when the host commits it; a rollback discards all of it.

use marketsettle_types::{Address, Asset, AssetKind, EventKind, Result, StorageKey};

pub trait Host {
    /// Ledger clock in seconds. Never moves backwards.
    fn timestamp(&self) -> u64;

    /// Advance the monotonic sequence counter and return the new value.
    fn next_sequence(&mut self) -> u64;

    /// Current value of the sequence counter.
    fn sequence(&self) -> u64;

    /// The contract's own account, which holds every escrowed asset.
    fn contract_address(&self) -> Address;

    /// Fail unless `who` authorized the current invocation.
    fn require_auth(&self, who: &Address) -> Result<()>;

    fn storage_get(&self, key: &StorageKey) -> Option<Vec<u8>>;

    fn storage_set(&mut self, key: StorageKey, value: Vec<u8>);

    fn storage_remove(&mut self, key: &StorageKey);

    /// Move `asset` between ledger accounts.
    ///
    /// # Errors
    /// `PaymentError::InsufficientFunds` if `from` cannot cover it, or
    /// `ValidationError::ZeroAmount` for an empty transfer.
    fn transfer(&mut self, from: &Address, to: &Address, asset: &Asset) -> Result<()>;

    fn balance(&self, who: &Address, kind: &AssetKind) -> u64;

    /// Append an event, stamped with the current clock and sequence.
    fn emit(&mut self, event: EventKind);

    /// Start an invocation: checkpoint all state.
    fn begin(&mut self);

    /// Make the invocation's writes durable.
    fn commit(&mut self);

    /// Discard every write made since [`Host::begin`].
    fn rollback(&mut self);
}
