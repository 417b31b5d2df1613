//! Fee manager: quotes the platform fee rate from the configured schedule.
//!
//! The quote is a pure function of the stored [`FeeConfig`] and its input;
//! nothing is written.

use marketsettle_types::{FeeConfig, FeeSchedule, FeeTier};

/// Highest tier whose threshold is at most `input`, falling back to `base`.
#[must_use]
pub fn select_tier(tiers: &[FeeTier], base: u32, input: u64) -> u32 {
    tiers
        .iter()
        .filter(|tier| tier.threshold <= input)
        .max_by_key(|tier| tier.threshold)
        .map_or(base, |tier| tier.fee_bps)
}

/// Platform fee rate in basis points for one settlement.
///
/// `amount` is the payment being settled; `volume` is the seller's
/// cumulative settled volume before this settlement.
#[must_use]
pub fn compute_fee(config: &FeeConfig, amount: u64, volume: u64) -> u32 {
    let bps = match config.schedule {
        FeeSchedule::Flat => config.base_fee_bps,
        FeeSchedule::Tiered => select_tier(&config.tiers, config.base_fee_bps, amount),
        FeeSchedule::VolumeBased => select_tier(&config.tiers, config.base_fee_bps, volume),
    };
    tracing::debug!(schedule = ?config.schedule, amount, volume, fee_bps = bps, "fee quote");
    bps
}
