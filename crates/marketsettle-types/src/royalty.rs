//! Royalty policies and the split of a payment they produce.

use serde::{Deserialize, Serialize};

use crate::{Address, ValidationError, constants::BPS_DENOMINATOR};

/// A lister-declared royalty policy for one item.
///
/// Shares are basis points and must sum to exactly 10 000. The platform
/// share is what the lister declared; the effective fee always comes from
/// the fee schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltyDistribution {
    /// Recipient of the creator share.
    pub creator: Address,
    pub creator_share_bps: u32,
    pub seller_share_bps: u32,
    pub platform_share_bps: u32,
}

impl RoyaltyDistribution {
    #[must_use]
    pub fn new(creator: Address, creator_bps: u32, seller_bps: u32, platform_bps: u32) -> Self {
        Self {
            creator,
            creator_share_bps: creator_bps,
            seller_share_bps: seller_bps,
            platform_share_bps: platform_bps,
        }
    }

    /// No creator royalty: the seller is recorded as creator with a zero share.
    #[must_use]
    pub fn none(seller: Address) -> Self {
        Self::new(seller, 0, BPS_DENOMINATOR, 0)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let sum = u64::from(self.creator_share_bps)
            + u64::from(self.seller_share_bps)
            + u64::from(self.platform_share_bps);
        if sum != u64::from(BPS_DENOMINATOR) {
            return Err(ValidationError::SharesNotWhole(sum));
        }
        Ok(())
    }
}

/// The three-way split of one payment.
///
/// `creator_amount + seller_amount + platform_amount == payment` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Distribution {
    pub payment: u64,
    pub fee_bps: u32,
    pub creator_amount: u64,
    pub seller_amount: u64,
    pub platform_amount: u64,
}

impl Distribution {
    #[must_use]
    pub fn total(&self) -> u128 {
        u128::from(self.creator_amount)
            + u128::from(self.seller_amount)
            + u128::from(self.platform_amount)
    }

    /// Combine per-item distributions of one bundle payment.
    ///
    /// Returns `None` if any sum overflows.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Option<Self> {
        Some(Self {
            payment: self.payment.checked_add(other.payment)?,
            fee_bps: self.fee_bps,
            creator_amount: self.creator_amount.checked_add(other.creator_amount)?,
            seller_amount: self.seller_amount.checked_add(other.seller_amount)?,
            platform_amount: self.platform_amount.checked_add(other.platform_amount)?,
        })
    }
}
