//! Commit-reveal bidding.
//!
//! `commitment = SHA-256("marketsettle:bid:v1:" || amount || salt || bidder || auction)`.
//! Binding the bidder and auction into the preimage stops a commitment
//! from being replayed by another bidder or on another auction.

use marketsettle_types::{Address, AuctionId, Commitment, SecurityError};
use sha2::{Digest, Sha256};

#[must_use]
pub fn commitment(
    auction: AuctionId,
    bidder: &Address,
    amount: u64,
    salt: &[u8; 32],
) -> Commitment {
    let mut hasher = Sha256::new();
    hasher.update(b"marketsettle:bid:v1:");
    hasher.update(amount.to_le_bytes());
    hasher.update(salt);
    hasher.update(bidder.as_bytes());
    hasher.update(auction.0.to_le_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    Commitment(bytes)
}

/// Recompute the commitment from the revealed preimage and compare.
pub fn verify_reveal(
    stored: &Commitment,
    auction: AuctionId,
    bidder: &Address,
    amount: u64,
    salt: &[u8; 32],
) -> Result<(), SecurityError> {
    if commitment(auction, bidder, amount, salt) != *stored {
        return Err(SecurityError::InvalidReveal);
    }
    Ok(())
}
