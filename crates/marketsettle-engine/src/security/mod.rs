//! Security guards: the per-id reentrancy flag and commit-reveal bidding.

mod commit_reveal;
mod reentrancy;

pub use commit_reveal::{commitment, verify_reveal};
pub use reentrancy::ReentrancyGuard;
