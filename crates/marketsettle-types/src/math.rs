//! Checked arithmetic over ledger amounts.
//!
//! Amounts are `u64`. Basis-point products are computed in `u128` and
//! narrowed back, so `amount * bps` can never wrap; only a result that does
//! not fit `u64` reports [`MathError::Overflow`].

use crate::{MathError, constants::BPS_DENOMINATOR};

pub fn checked_add(a: u64, b: u64) -> Result<u64, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn checked_sub(a: u64, b: u64) -> Result<u64, MathError> {
    a.checked_sub(b).ok_or(MathError::Underflow)
}

pub fn checked_mul(a: u64, b: u64) -> Result<u64, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

pub fn checked_div(a: u64, b: u64) -> Result<u64, MathError> {
    a.checked_div(b).ok_or(MathError::DivisionByZero)
}

/// `floor(amount * bps / 10_000)`, widened to `u128` for the product.
pub fn bps_of(amount: u64, bps: u32) -> Result<u64, MathError> {
    mul_div(amount, u64::from(bps), u64::from(BPS_DENOMINATOR))
}

/// `floor(a * b / denominator)` with a `u128` intermediate.
pub fn mul_div(a: u64, b: u64, denominator: u64) -> Result<u64, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let wide = u128::from(a) * u128::from(b) / u128::from(denominator);
    u64::try_from(wide).map_err(|_| MathError::Overflow)
}

/// Sum a sequence of amounts, failing on overflow.
pub fn checked_sum<I: IntoIterator<Item = u64>>(values: I) -> Result<u64, MathError> {
    values.into_iter().try_fold(0u64, checked_add)
}
