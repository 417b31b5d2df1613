//! In-memory host with all-or-nothing invocations.
//!
//! `begin` snapshots the whole ledger state (storage, balances, sequence
//! counter, event log, issuance totals); `rollback` restores the snapshot.
//! This is the harness behind every "an error changes no state" test.

use std::collections::BTreeMap;

use marketsettle_types::{
    Address, Asset, AssetKind, Event, EventKind, MarketError, PaymentError, Result, StorageKey,
    ValidationError, constants, math,
};
use sha2::{Digest, Sha256};

use crate::auth::{AuthMode, Authenticator};
use crate::host::Host;
use crate::supply::SupplyLedger;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LedgerState {
    storage: BTreeMap<StorageKey, Vec<u8>>,
    balances: BTreeMap<(Address, AssetKind), u64>,
    sequence: u64,
    events: Vec<Event>,
    supply: SupplyLedger,
}

/// A [`Host`] backed by ordered in-memory maps.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    state: LedgerState,
    checkpoint: Option<LedgerState>,
    timestamp: u64,
    contract: Address,
    auth: Authenticator,
}

impl MemoryHost {
    /// A host that verifies caller signatures.
    #[must_use]
    pub fn new() -> Self {
        Self::with_auth(AuthMode::Signatures)
    }

    /// A host that treats every caller as authorized.
    #[must_use]
    pub fn mock_all_auths() -> Self {
        Self::with_auth(AuthMode::MockAll)
    }

    #[must_use]
    pub fn with_auth(mode: AuthMode) -> Self {
        Self {
            state: LedgerState::default(),
            checkpoint: None,
            timestamp: 0,
            contract: Address::derive(constants::CONTRACT_ADDRESS_LABEL),
            auth: Authenticator::new(mode),
        }
    }

    // -- clock --------------------------------------------------------------

    pub fn set_timestamp(&mut self, timestamp: u64) {
        if timestamp < self.timestamp {
            tracing::warn!(from = self.timestamp, to = timestamp, "ignoring backwards clock move");
            return;
        }
        self.timestamp = timestamp;
    }

    pub fn advance_time(&mut self, seconds: u64) {
        self.timestamp = self.timestamp.saturating_add(seconds);
    }

    // -- auth ---------------------------------------------------------------

    #[must_use]
    pub fn auth_challenge(&self) -> Vec<u8> {
        self.auth.challenge()
    }

    /// Present a signature over [`MemoryHost::auth_challenge`] for `signer`.
    pub fn authorize(&mut self, signer: Address, signature: &[u8; 64]) -> Result<()> {
        self.auth.submit(signer, signature).map_err(MarketError::from)
    }

    // -- ledger -------------------------------------------------------------

    /// Issue new units of `asset` to `to` (genesis allocation or minting of
    /// an NFT by its collection).
    pub fn mint(&mut self, to: &Address, asset: &Asset) -> Result<()> {
        asset.validate()?;
        self.state.supply.record_mint(asset.kind, asset.amount)?;
        let balance = self.state.balances.entry((*to, asset.kind)).or_insert(0);
        *balance = math::checked_add(*balance, asset.amount)?;
        Ok(())
    }

    /// Every account's balance of `kind` sums to what was minted.
    pub fn verify_supply(&self) -> Result<()> {
        for kind in self.state.supply.tracked_kinds() {
            let circulating: u128 = self
                .state
                .balances
                .iter()
                .filter(|((_, k), _)| k == kind)
                .map(|(_, amount)| u128::from(*amount))
                .sum();
            self.state.supply.verify(kind, circulating)?;
        }
        Ok(())
    }

    /// The account currently holding one unit of an issued token, if any.
    #[must_use]
    pub fn owner_of(&self, kind: &AssetKind) -> Option<Address> {
        self.state
            .balances
            .iter()
            .find(|((_, k), amount)| k == kind && **amount > 0)
            .map(|((who, _), _)| *who)
    }

    // -- inspection ---------------------------------------------------------

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.state.events
    }

    #[must_use]
    pub fn storage_len(&self) -> usize {
        self.state.storage.len()
    }

    /// Opaque fingerprint of all durable state, for "nothing changed" checks.
    #[must_use]
    pub fn state_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (key, value) in &self.state.storage {
            hasher.update(key.to_string().as_bytes());
            hasher.update(value);
        }
        for ((who, kind), amount) in &self.state.balances {
            hasher.update(who.as_bytes());
            hasher.update(kind.to_string().as_bytes());
            hasher.update(amount.to_le_bytes());
        }
        hasher.update(self.state.sequence.to_le_bytes());
        let events = u64::try_from(self.state.events.len()).unwrap_or(u64::MAX);
        hasher.update(events.to_le_bytes());
        hex::encode(hasher.finalize())
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for MemoryHost {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn next_sequence(&mut self) -> u64 {
        self.state.sequence += 1;
        self.state.sequence
    }

    fn sequence(&self) -> u64 {
        self.state.sequence
    }

    fn contract_address(&self) -> Address {
        self.contract
    }

    fn require_auth(&self, who: &Address) -> Result<()> {
        self.auth.require(who).map_err(MarketError::from)
    }

    fn storage_get(&self, key: &StorageKey) -> Option<Vec<u8>> {
        self.state.storage.get(key).cloned()
    }

    fn storage_set(&mut self, key: StorageKey, value: Vec<u8>) {
        self.state.storage.insert(key, value);
    }

    fn storage_remove(&mut self, key: &StorageKey) {
        self.state.storage.remove(key);
    }

    fn transfer(&mut self, from: &Address, to: &Address, asset: &Asset) -> Result<()> {
        if asset.amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        let available = self.balance(from, &asset.kind);
        if available < asset.amount {
            return Err(PaymentError::InsufficientFunds {
                needed: asset.amount,
                available,
            }
            .into());
        }
        if from == to {
            return Ok(());
        }
        let debited = math::checked_sub(available, asset.amount)?;
        let credited = math::checked_add(self.balance(to, &asset.kind), asset.amount)?;
        self.state.balances.insert((*from, asset.kind), debited);
        self.state.balances.insert((*to, asset.kind), credited);
        tracing::debug!(from = %from, to = %to, asset = %asset, "transfer");
        Ok(())
    }

    fn balance(&self, who: &Address, kind: &AssetKind) -> u64 {
        self.state.balances.get(&(*who, *kind)).copied().unwrap_or(0)
    }

    fn emit(&mut self, event: EventKind) {
        let event = Event {
            kind: event,
            timestamp: self.timestamp,
            sequence: self.state.sequence,
        };
        self.state.events.push(event);
    }

    fn begin(&mut self) {
        self.checkpoint = Some(self.state.clone());
    }

    fn commit(&mut self) {
        self.checkpoint = None;
        self.auth.finish_invocation();
    }

    fn rollback(&mut self) {
        if let Some(snapshot) = self.checkpoint.take() {
            self.state = snapshot;
        }
        self.auth.finish_invocation();
    }
}

#[cfg(test)]
mod tests {
    use marketsettle_types::{StorageError, TokenId};

    use super::*;

    fn alice() -> Address {
        Address::from_seed(1)
    }

    fn bob() -> Address {
        Address::from_seed(2)
    }

    #[test]
    fn transfer_moves_balance() {
        let mut host = MemoryHost::mock_all_auths();
        host.mint(&alice(), &Asset::native(100)).unwrap();
        host.transfer(&alice(), &bob(), &Asset::native(40)).unwrap();
        assert_eq!(host.balance(&alice(), &AssetKind::Native), 60);
        assert_eq!(host.balance(&bob(), &AssetKind::Native), 40);
        host.verify_supply().unwrap();
    }

    #[test]
    fn supply_drift_reported_as_typed_error() {
        let mut host = MemoryHost::mock_all_auths();
        host.mint(&alice(), &Asset::native(100)).unwrap();
        host.state.balances.insert((bob(), AssetKind::Native), 1);
        let err = host.verify_supply().unwrap_err();
        assert_eq!(
            err,
            StorageError::SupplyInvariant {
                kind: AssetKind::Native,
                expected: 100,
                actual: 101,
            }
            .into()
        );
    }

    #[test]
    fn insufficient_funds() {
        let mut host = MemoryHost::mock_all_auths();
        host.mint(&alice(), &Asset::native(10)).unwrap();
        let err = host.transfer(&alice(), &bob(), &Asset::native(11)).unwrap_err();
        assert_eq!(
            err,
            MarketError::Payment(PaymentError::InsufficientFunds { needed: 11, available: 10 })
        );
    }

    #[test]
    fn zero_transfer_rejected() {
        let mut host = MemoryHost::mock_all_auths();
        assert!(host.transfer(&alice(), &bob(), &Asset::native(0)).is_err());
    }

    #[test]
    fn rollback_discards_everything() {
        let mut host = MemoryHost::mock_all_auths();
        host.mint(&alice(), &Asset::native(100)).unwrap();
        let before = host.state_fingerprint();

        host.begin();
        host.transfer(&alice(), &bob(), &Asset::native(40)).unwrap();
        host.storage_set(StorageKey::Config, b"x".to_vec());
        host.next_sequence();
        host.emit(EventKind::Initialized { admin: alice() });
        host.rollback();

        assert_eq!(host.state_fingerprint(), before);
        assert_eq!(host.sequence(), 0);
        assert!(host.events().is_empty());
        assert_eq!(host.storage_get(&StorageKey::Config), None);
    }

    #[test]
    fn commit_keeps_writes() {
        let mut host = MemoryHost::mock_all_auths();
        host.begin();
        host.storage_set(StorageKey::Treasury, b"t".to_vec());
        assert_eq!(host.next_sequence(), 1);
        host.commit();
        assert_eq!(host.storage_get(&StorageKey::Treasury), Some(b"t".to_vec()));
        assert_eq!(host.sequence(), 1);
    }

    #[test]
    fn clock_is_monotonic() {
        let mut host = MemoryHost::mock_all_auths();
        host.set_timestamp(100);
        host.set_timestamp(50);
        assert_eq!(host.timestamp(), 100);
        host.advance_time(10);
        assert_eq!(host.timestamp(), 110);
    }

    #[test]
    fn nft_owner_lookup() {
        let mut host = MemoryHost::mock_all_auths();
        let nft = Asset::nft(TokenId::new(Address::from_seed(9), 1));
        host.mint(&alice(), &nft).unwrap();
        assert_eq!(host.owner_of(&nft.kind), Some(alice()));
        host.transfer(&alice(), &bob(), &nft).unwrap();
        assert_eq!(host.owner_of(&nft.kind), Some(bob()));
    }

    #[test]
    fn signature_mode_requires_auth() {
        let host = MemoryHost::new();
        assert!(host.require_auth(&alice()).is_err());
    }
}
