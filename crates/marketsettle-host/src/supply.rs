//! Supply conservation check for the in-memory ledger.
//!
//! ```text
//! ∀ kind: Σ balances(kind) == Σ minted(kind)
//! ```
//!
//! Settlement only ever moves value between accounts (escrow is the
//! contract's own account), so any drift means a transfer was lost or
//! duplicated.

use std::collections::BTreeMap;

use marketsettle_types::{AssetKind, MathError, StorageError, math};

/// Per-kind issuance totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplyLedger {
    minted: BTreeMap<AssetKind, u64>,
}

impl SupplyLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_mint(&mut self, kind: AssetKind, amount: u64) -> Result<(), MathError> {
        let entry = self.minted.entry(kind).or_insert(0);
        *entry = math::checked_add(*entry, amount)?;
        Ok(())
    }

    #[must_use]
    pub fn expected_supply(&self, kind: &AssetKind) -> u64 {
        self.minted.get(kind).copied().unwrap_or(0)
    }

    /// Compare the actual circulating total against issuance.
    ///
    /// # Errors
    /// [`StorageError::SupplyInvariant`] if the totals differ.
    pub fn verify(&self, kind: &AssetKind, actual: u128) -> Result<(), StorageError> {
        let expected = u128::from(self.expected_supply(kind));
        if actual != expected {
            return Err(StorageError::SupplyInvariant {
                kind: *kind,
                expected,
                actual,
            });
        }
        Ok(())
    }

    pub fn tracked_kinds(&self) -> impl Iterator<Item = &AssetKind> {
        self.minted.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conservation_holds() {
        let mut ledger = SupplyLedger::new();
        ledger.record_mint(AssetKind::Native, 1000).unwrap();
        ledger.record_mint(AssetKind::Native, 500).unwrap();
        assert!(ledger.verify(&AssetKind::Native, 1500).is_ok());
    }

    #[test]
    fn drift_detected() {
        let mut ledger = SupplyLedger::new();
        ledger.record_mint(AssetKind::Native, 1000).unwrap();
        let err = ledger.verify(&AssetKind::Native, 999).unwrap_err();
        assert_eq!(
            err,
            StorageError::SupplyInvariant {
                kind: AssetKind::Native,
                expected: 1000,
                actual: 999,
            }
        );
        assert!(err.to_string().starts_with("MS_ERR_902"));
    }

    #[test]
    fn mint_overflow() {
        let mut ledger = SupplyLedger::new();
        ledger.record_mint(AssetKind::Native, u64::MAX).unwrap();
        assert_eq!(ledger.record_mint(AssetKind::Native, 1), Err(MathError::Overflow));
    }
}
