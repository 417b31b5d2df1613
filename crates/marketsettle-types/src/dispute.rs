//! Dispute records and arbiter verdicts.
//!
//! ```text
//!   OPENED ──first vote──▶ VOTING ──quorum + plurality──▶ RESOLVED_<verdict>
//!      │                     │
//!      └──────deadline───────┴──────────────────────────▶ RESOLVED_<default>
//! ```
//!
//! `<default>` is the `default_verdict` snapshotted when the dispute opened.
//! The administrator may force any verdict while the dispute is open.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Address, DisputeId, StateError, TransactionId};

/// An arbiter's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Verdict {
    /// Complete the agreed settlement in the seller side's favour.
    Release,
    /// Return every holding to its depositor.
    Refund,
    /// Divide fungible escrow by the configured split.
    Split,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release => write!(f, "RELEASE"),
            Self::Refund => write!(f, "REFUND"),
            Self::Split => write!(f, "SPLIT"),
        }
    }
}

/// Why the initiator contested the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonCode {
    ItemNotAsDescribed,
    NonDelivery,
    Fraud,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisputeState {
    Opened,
    Voting,
    ResolvedRelease,
    ResolvedRefund,
    ResolvedSplit,
}

impl DisputeState {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Opened, Self::Voting)
                | (
                    Self::Opened | Self::Voting,
                    Self::ResolvedRelease | Self::ResolvedRefund | Self::ResolvedSplit
                )
        )
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Opened | Self::Voting)
    }

    #[must_use]
    pub fn resolved(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Release => Self::ResolvedRelease,
            Verdict::Refund => Self::ResolvedRefund,
            Verdict::Split => Self::ResolvedSplit,
        }
    }
}

impl fmt::Display for DisputeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened => write!(f, "OPENED"),
            Self::Voting => write!(f, "VOTING"),
            Self::ResolvedRelease => write!(f, "RESOLVED_RELEASE"),
            Self::ResolvedRefund => write!(f, "RESOLVED_REFUND"),
            Self::ResolvedSplit => write!(f, "RESOLVED_SPLIT"),
        }
    }
}

/// A piece of evidence attached to a dispute: an off-ledger document URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub submitter: Address,
    pub uri: String,
    pub submitted_at: u64,
}

/// A contested transaction under arbitration.
///
/// Arbiters, quorum, deadline and split are copied from the configuration
/// when the dispute opens; later configuration changes do not affect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub transaction: TransactionId,
    pub initiator: Address,
    pub reason: ReasonCode,
    pub arbiters: Vec<Address>,
    pub quorum: u32,
    /// One entry per arbiter; a second vote overwrites the first.
    pub votes: BTreeMap<Address, Verdict>,
    pub opened_at: u64,
    /// Evidence is accepted until this instant.
    pub evidence_deadline: u64,
    pub evidence: Vec<Evidence>,
    pub resolution_deadline: u64,
    pub default_verdict: Verdict,
    pub split_seller_bps: u32,
    /// Set when the administrator imposed the verdict.
    pub forced_by: Option<Address>,
    pub state: DisputeState,
}

impl Dispute {
    pub fn expect_open(&self) -> Result<(), StateError> {
        if !self.state.is_open() {
            return Err(StateError::DisputeClosed {
                dispute: self.id,
                actual: self.state.to_string(),
            });
        }
        Ok(())
    }

    pub fn transition(&mut self, target: DisputeState) -> Result<(), StateError> {
        if !self.state.can_transition_to(target) {
            return Err(StateError::DisputeClosed {
                dispute: self.id,
                actual: self.state.to_string(),
            });
        }
        self.state = target;
        Ok(())
    }

    /// Votes per verdict, in verdict order.
    #[must_use]
    pub fn tally(&self) -> BTreeMap<Verdict, u32> {
        let mut counts = BTreeMap::new();
        for verdict in self.votes.values() {
            *counts.entry(*verdict).or_insert(0) += 1;
        }
        counts
    }

    /// The verdict holding a strict plurality, if one exists.
    #[must_use]
    pub fn plurality(&self) -> Option<Verdict> {
        let tally = self.tally();
        let best = tally.values().copied().max()?;
        let mut leaders = tally.iter().filter(|(_, n)| **n == best);
        let (verdict, _) = leaders.next()?;
        if leaders.next().is_some() {
            return None;
        }
        Some(*verdict)
    }

    #[must_use]
    pub fn vote_count(&self) -> u32 {
        u32::try_from(self.votes.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn has_quorum(&self) -> bool {
        self.vote_count() >= self.quorum
    }

    /// The verdict to apply now, or `None` while neither quorum with a
    /// plurality nor the deadline has been reached.
    ///
    /// Once the deadline passes without a decisive quorum, the snapshotted
    /// `default_verdict` applies regardless of any minority votes.
    #[must_use]
    pub fn decide(&self, now: u64) -> Option<Verdict> {
        if let Some(verdict) = self.plurality().filter(|_| self.has_quorum()) {
            return Some(verdict);
        }
        if crate::time::has_passed(now, self.resolution_deadline) {
            return Some(self.default_verdict);
        }
        None
    }

    /// The initiator and the snapshotted arbiters may attach evidence.
    #[must_use]
    pub fn may_submit_evidence(&self, who: &Address) -> bool {
        self.initiator == *who || self.arbiters.contains(who)
    }
}
