//! Marketplace configuration: the singleton record written by `initialize`
//! and thereafter only by administrator operations.

use serde::{Deserialize, Serialize};

use crate::{Address, ValidationError, Verdict, constants};

/// How the platform fee rate is chosen for a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeSchedule {
    /// Always `base_fee_bps`.
    Flat,
    /// Highest tier whose threshold is at most the payment amount.
    Tiered,
    /// Highest tier whose threshold is at most the seller's cumulative
    /// settled volume before this settlement.
    VolumeBased,
}

/// Which amount the creator's royalty share is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoyaltyBasis {
    /// Share of the full payment.
    #[default]
    Gross,
    /// Share of the payment after the platform fee.
    Net,
}

/// One step of a tiered or volume-based schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTier {
    pub threshold: u64,
    pub fee_bps: u32,
}

/// Platform fee configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    pub schedule: FeeSchedule,
    pub base_fee_bps: u32,
    /// Strictly ascending by threshold.
    pub tiers: Vec<FeeTier>,
    pub royalty_basis: RoyaltyBasis,
    /// Last administrator to write this record (`None` before initialization).
    pub updated_by: Option<Address>,
    pub updated_at: u64,
}

impl FeeConfig {
    #[must_use]
    pub fn flat(base_fee_bps: u32) -> Self {
        Self {
            schedule: FeeSchedule::Flat,
            base_fee_bps,
            tiers: Vec::new(),
            royalty_basis: RoyaltyBasis::Gross,
            updated_by: None,
            updated_at: 0,
        }
    }

    #[must_use]
    pub fn tiered(schedule: FeeSchedule, base_fee_bps: u32, tiers: Vec<FeeTier>) -> Self {
        Self {
            schedule,
            tiers,
            ..Self::flat(base_fee_bps)
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_bps(self.base_fee_bps)?;
        for tier in &self.tiers {
            check_bps(tier.fee_bps)?;
        }
        if self.tiers.windows(2).any(|w| w[0].threshold >= w[1].threshold) {
            return Err(ValidationError::Config(
                "fee tiers must be strictly ascending by threshold".into(),
            ));
        }
        if self.schedule != FeeSchedule::Flat && self.tiers.is_empty() {
            return Err(ValidationError::Config(
                "tiered fee schedules need at least one tier".into(),
            ));
        }
        Ok(())
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self::flat(constants::DEFAULT_BASE_FEE_BPS)
    }
}

/// Auction timing rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionConfig {
    pub min_duration: u64,
    pub max_duration: u64,
    /// Seconds after `end_time` during which commitments may be revealed.
    pub reveal_period: u64,
    /// Bids landing this close to `end_time` push it out to `now + extension_window`.
    /// Zero disables the extension.
    pub extension_window: u64,
}

impl AuctionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.min_duration == 0 || self.min_duration > self.max_duration {
            return Err(ValidationError::Config(format!(
                "auction duration bounds [{}, {}] are invalid",
                self.min_duration, self.max_duration
            )));
        }
        if self.reveal_period == 0 {
            return Err(ValidationError::Config("reveal period must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            min_duration: constants::DEFAULT_MIN_AUCTION_DURATION,
            max_duration: constants::DEFAULT_MAX_AUCTION_DURATION,
            reveal_period: constants::DEFAULT_REVEAL_PERIOD,
            extension_window: constants::DEFAULT_EXTENSION_WINDOW,
        }
    }
}

/// Arbitration rules, snapshotted into each dispute when it opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeConfig {
    pub arbiters: Vec<Address>,
    pub quorum: u32,
    pub resolution_period: u64,
    /// Seconds after opening during which the initiator and arbiters may
    /// attach evidence. At most `resolution_period`.
    pub evidence_period: u64,
    /// Applied when the deadline passes without quorum and a plurality.
    pub default_verdict: Verdict,
    /// Seller side's share of fungible escrow on a split verdict.
    pub split_seller_bps: u32,
}

impl DisputeConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_bps(self.split_seller_bps)?;
        if self.quorum == 0 {
            return Err(ValidationError::Config("quorum must be at least 1".into()));
        }
        let arbiter_count = u32::try_from(self.arbiters.len()).unwrap_or(u32::MAX);
        if self.quorum > arbiter_count {
            return Err(ValidationError::Config(format!(
                "quorum {} exceeds arbiter count {arbiter_count}",
                self.quorum
            )));
        }
        if self.arbiters.iter().enumerate().any(|(i, a)| self.arbiters[..i].contains(a)) {
            return Err(ValidationError::Config("duplicate arbiter".into()));
        }
        if self.resolution_period == 0 {
            return Err(ValidationError::Config(
                "resolution period must be non-zero".into(),
            ));
        }
        if self.evidence_period == 0 || self.evidence_period > self.resolution_period {
            return Err(ValidationError::Config(format!(
                "evidence period {} must lie in [1, {}]",
                self.evidence_period, self.resolution_period
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_arbiter(&self, who: &Address) -> bool {
        self.arbiters.contains(who)
    }
}

/// The marketplace's singleton configuration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub admin: Address,
    pub fee: FeeConfig,
    pub auction: AuctionConfig,
    pub dispute: DisputeConfig,
    /// Upper bound on sale, trade and bundle lifetimes.
    pub max_transaction_duration: u64,
    pub emergency_withdrawal_enabled: bool,
}

impl MarketConfig {
    /// Defaults for everything but the administrator, fee and arbiter set.
    #[must_use]
    pub fn new(admin: Address, fee: FeeConfig, arbiters: Vec<Address>) -> Self {
        let quorum = u32::try_from(arbiters.len())
            .unwrap_or(u32::MAX)
            .clamp(1, constants::DEFAULT_ARBITRATION_QUORUM);
        Self {
            admin,
            fee,
            auction: AuctionConfig::default(),
            dispute: DisputeConfig {
                arbiters,
                quorum,
                resolution_period: constants::DEFAULT_RESOLUTION_PERIOD,
                evidence_period: constants::DEFAULT_EVIDENCE_PERIOD,
                default_verdict: Verdict::Refund,
                split_seller_bps: constants::DEFAULT_SPLIT_SELLER_BPS,
            },
            max_transaction_duration: constants::DEFAULT_MAX_TRANSACTION_DURATION,
            emergency_withdrawal_enabled: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.fee.validate()?;
        self.auction.validate()?;
        self.dispute.validate()?;
        if self.max_transaction_duration == 0 {
            return Err(ValidationError::Config(
                "max transaction duration must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

fn check_bps(bps: u32) -> Result<(), ValidationError> {
    if bps > constants::BPS_DENOMINATOR {
        return Err(ValidationError::BpsOutOfRange(bps));
    }
    Ok(())
}
