//! Royalty distributor: splits one payment into creator, seller and
//! platform parts.
//!
//! ```text
//! platform = floor(payment × fee_bps / 10000)
//! creator  = floor(basis × creator_bps / 10000)
//!            basis = payment (Gross) or payment − platform (Net)
//! seller   = payment − platform − creator
//! ```
//!
//! The seller absorbs every rounding remainder, so the parts always sum to
//! the payment. Products are computed in `u128` before narrowing.

use marketsettle_types::{
    Distribution, MathError, RoyaltyBasis, RoyaltyDistribution, constants::BPS_DENOMINATOR, math,
};

pub fn distribute(
    payment: u64,
    policy: &RoyaltyDistribution,
    fee_bps: u32,
    basis: RoyaltyBasis,
) -> Result<Distribution, MathError> {
    if fee_bps > BPS_DENOMINATOR || policy.creator_share_bps > BPS_DENOMINATOR {
        return Err(MathError::Overflow);
    }
    let platform_amount = math::bps_of(payment, fee_bps)?;
    let remaining = math::checked_sub(payment, platform_amount)?;
    let creator_amount = match basis {
        RoyaltyBasis::Gross => math::bps_of(payment, policy.creator_share_bps)?,
        RoyaltyBasis::Net => math::bps_of(remaining, policy.creator_share_bps)?,
    };
    let seller_amount = math::checked_sub(remaining, creator_amount)?;
    Ok(Distribution {
        payment,
        fee_bps,
        creator_amount,
        seller_amount,
        platform_amount,
    })
}

/// Split `total` into `parts` equal allocations; the last absorbs the
/// remainder.
pub fn split_evenly(total: u64, parts: usize) -> Result<Vec<u64>, MathError> {
    let count = u64::try_from(parts).map_err(|_| MathError::Overflow)?;
    let each = math::checked_div(total, count)?;
    let head = math::checked_mul(each, count.saturating_sub(1))?;
    let last = math::checked_sub(total, head)?;
    let mut allocations = vec![each; parts.saturating_sub(1)];
    allocations.push(last);
    Ok(allocations)
}
