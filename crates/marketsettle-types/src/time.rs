//! Deadline arithmetic against the host's ledger clock.
//!
//! Timestamps are ledger seconds supplied by the host. Caller-supplied
//! times are never compared against deadlines.

use crate::{MathError, ValidationError};

/// Deadline `now + duration`, failing on overflow.
pub fn deadline(now: u64, duration: u64) -> Result<u64, MathError> {
    now.checked_add(duration).ok_or(MathError::Overflow)
}

/// A deadline has passed once the clock reaches it.
#[must_use]
pub fn has_passed(now: u64, deadline: u64) -> bool {
    now >= deadline
}

/// Seconds left until `deadline` (zero once passed).
#[must_use]
pub fn remaining(now: u64, deadline: u64) -> u64 {
    deadline.saturating_sub(now)
}

/// Seconds elapsed since `start` (zero before it).
#[must_use]
pub fn elapsed(now: u64, start: u64) -> u64 {
    now.saturating_sub(start)
}

/// Reject durations outside `[min, max]`.
pub fn validate_duration(duration: u64, min: u64, max: u64) -> Result<(), ValidationError> {
    if duration < min || duration > max || duration == 0 {
        return Err(ValidationError::DurationOutOfRange { duration, min, max });
    }
    Ok(())
}

/// True when `now` falls within `window` seconds before `end`.
#[must_use]
pub fn within_closing_window(now: u64, end: u64, window: u64) -> bool {
    now < end && end - now <= window
}
