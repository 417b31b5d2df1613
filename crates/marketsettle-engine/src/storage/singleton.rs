//! Singleton records: the marketplace configuration and the treasury.

use std::collections::BTreeMap;

use marketsettle_host::Host;
use marketsettle_types::{
    Address, AssetKind, MarketConfig, PaymentError, Result, StateError, StorageKey, math,
};
use serde::{Deserialize, Serialize};

use super::{load, save};

pub struct ConfigStore;

impl ConfigStore {
    /// The configuration, or `NotInitialized`.
    pub fn load<H: Host>(host: &H) -> Result<MarketConfig> {
        load(host, &StorageKey::Config)?.ok_or_else(|| StateError::NotInitialized.into())
    }

    pub fn exists<H: Host>(host: &H) -> bool {
        host.storage_get(&StorageKey::Config).is_some()
    }

    pub fn save<H: Host>(host: &mut H, config: &MarketConfig) -> Result<()> {
        save(host, StorageKey::Config, config)
    }
}

/// Accumulated platform fees held in the contract account, and each
/// seller's cumulative settled volume.
///
/// Settlements only credit; fees are debited only by an explicit
/// administrator withdrawal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    /// Sorted by kind. A list rather than a map because asset kinds are
    /// not string keys.
    fee_balances: Vec<(AssetKind, u64)>,
    seller_volume: BTreeMap<Address, u64>,
}

impl Treasury {
    #[must_use]
    pub fn fee_balance(&self, kind: &AssetKind) -> u64 {
        self.fee_balances
            .iter()
            .find(|(k, _)| k == kind)
            .map_or(0, |(_, amount)| *amount)
    }

    pub fn credit_fee(&mut self, kind: AssetKind, amount: u64) -> Result<()> {
        match self.fee_balances.binary_search_by(|(k, _)| k.cmp(&kind)) {
            Ok(i) => self.fee_balances[i].1 = math::checked_add(self.fee_balances[i].1, amount)?,
            Err(i) => self.fee_balances.insert(i, (kind, amount)),
        }
        Ok(())
    }

    pub fn debit_fee(&mut self, kind: AssetKind, amount: u64) -> Result<()> {
        let available = self.fee_balance(&kind);
        if available < amount {
            return Err(PaymentError::InsufficientFeeBalance {
                requested: amount,
                available,
            }
            .into());
        }
        if let Ok(i) = self.fee_balances.binary_search_by(|(k, _)| k.cmp(&kind)) {
            self.fee_balances[i].1 = math::checked_sub(available, amount)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn volume(&self, seller: &Address) -> u64 {
        self.seller_volume.get(seller).copied().unwrap_or(0)
    }

    pub fn record_volume(&mut self, seller: Address, amount: u64) -> Result<()> {
        let entry = self.seller_volume.entry(seller).or_insert(0);
        *entry = math::checked_add(*entry, amount)?;
        Ok(())
    }
}

pub struct TreasuryStore;

impl TreasuryStore {
    pub fn load<H: Host>(host: &H) -> Result<Treasury> {
        Ok(load(host, &StorageKey::Treasury)?.unwrap_or_default())
    }

    pub fn save<H: Host>(host: &mut H, treasury: &Treasury) -> Result<()> {
        save(host, StorageKey::Treasury, treasury)
    }
}
