//! # Transaction: the settlement record shared by every variant
//!
//! Sales, trades, bundles and auctions are one tagged union
//! ([`TransactionKind`]) over shared fields, so every transition is matched
//! exhaustively rather than dispatched through a hierarchy.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐ accept_trade ┌──────────┐
//!   │ CREATED ├─────────────▶│ ACCEPTED │
//!   └─┬──┬──┬─┘              └─┬──┬──┬──┘
//!     │  │  │ execute / end    │  │  │
//!     │  │  └──────────────────┼──┼──┴──▶ EXECUTED
//!     │  │ cancel / expiry     │  │
//!     │  └─────────────────────┼──┴─────▶ CANCELLED | EXPIRED
//!     │ initiate_dispute       │
//!     └──────────┬─────────────┘
//!                ▼
//!          ┌──────────┐  resolution
//!          │ DISPUTED ├────────────▶ RELEASED | REFUNDED | SPLIT
//!          └──────────┘
//! ```
//!
//! `CREATED` and `ACCEPTED` can also go to `WITHDRAWN` through the
//! administrator's emergency withdrawal. No state is ever re-entered.

use serde::{Deserialize, Serialize};

use crate::{
    Address, Asset, AuctionId, BidId, RoyaltyDistribution, SettlementRecord, StateError,
    TransactionId,
};

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    /// Seller-side escrow held, waiting for a buyer, counterparty or auction end.
    Created,
    /// Both sides of a trade are in escrow.
    Accepted,
    /// Settlement paused by an open dispute.
    Disputed,
    Executed,
    Cancelled,
    Expired,
    /// Dispute resolved in the seller side's favour.
    Released,
    /// Dispute resolved by returning every holding.
    Refunded,
    /// Dispute resolved by dividing fungible escrow.
    Split,
    /// Escrow returned by the administrator's emergency withdrawal.
    Withdrawn,
}

impl TransactionState {
    /// Can a transaction in this state move to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        use TransactionState::{
            Accepted, Cancelled, Created, Disputed, Executed, Expired, Refunded, Released, Split,
            Withdrawn,
        };
        matches!(
            (self, target),
            (
                Created,
                Accepted | Disputed | Executed | Cancelled | Expired | Withdrawn
            ) | (Accepted, Disputed | Executed | Expired | Withdrawn)
                | (Disputed, Released | Refunded | Split)
        )
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Created | Self::Accepted | Self::Disputed)
    }

    /// Escrow is held (and a dispute may be opened).
    #[must_use]
    pub fn holds_escrow(&self) -> bool {
        matches!(self, Self::Created | Self::Accepted)
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Disputed => write!(f, "DISPUTED"),
            Self::Executed => write!(f, "EXECUTED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Released => write!(f, "RELEASED"),
            Self::Refunded => write!(f, "REFUNDED"),
            Self::Split => write!(f, "SPLIT"),
            Self::Withdrawn => write!(f, "WITHDRAWN"),
        }
    }
}

/// Who deposited an escrow holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HolderRole {
    Seller,
    /// The other party of a trade.
    Counterparty,
    /// A plaintext bid or a commitment deposit.
    Bidder,
}

impl std::fmt::Display for HolderRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seller => write!(f, "SELLER"),
            Self::Counterparty => write!(f, "COUNTERPARTY"),
            Self::Bidder => write!(f, "BIDDER"),
        }
    }
}

/// An asset in the contract's custody on behalf of a depositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowHolding {
    pub transaction: TransactionId,
    pub depositor: Address,
    pub role: HolderRole,
    pub asset: Asset,
    pub locked_at: u64,
    /// The bid this deposit backs, for bidder holdings.
    pub bid: Option<BidId>,
}

/// An item together with the royalty policy its lister declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedItem {
    pub asset: Asset,
    pub royalty: RoyaltyDistribution,
}

impl ListedItem {
    #[must_use]
    pub fn new(asset: Asset, royalty: RoyaltyDistribution) -> Self {
        Self { asset, royalty }
    }
}

/// Which side of a trade pays the payment differential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Initiator,
    Counterparty,
}

/// A fungible top-up paid alongside an unequal trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Differential {
    pub payer: TradeSide,
    pub amount: Asset,
}

/// Variant-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Sale { item: ListedItem },
    Auction { auction: AuctionId, item: ListedItem },
    Trade {
        offered: Vec<Asset>,
        requested: Vec<Asset>,
        differential: Option<Differential>,
    },
    Bundle { items: Vec<ListedItem> },
}

impl TransactionKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sale { .. } => "sale",
            Self::Auction { .. } => "auction",
            Self::Trade { .. } => "trade",
            Self::Bundle { .. } => "bundle",
        }
    }
}

/// A settlement record of any variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Seller, auctioneer, or trade initiator.
    pub seller: Address,
    /// Trade counterparty, designated buyer, or current leading bidder.
    pub counterparty: Option<Address>,
    pub kind: TransactionKind,
    /// Asking price (sales, bundles) or reserve (auctions). `None` for trades.
    pub price: Option<Asset>,
    pub state: TransactionState,
    /// Everything currently in custody for this transaction.
    pub escrow: Vec<EscrowHolding>,
    pub created_at: u64,
    pub expires_at: u64,
    /// Present exactly when the state is terminal.
    pub settlement: Option<SettlementRecord>,
}

impl Transaction {
    /// Move to `target`, enforcing the one-directional state machine.
    ///
    /// # Errors
    /// [`StateError::WrongTransactionState`] when the transition is not allowed.
    pub fn transition(&mut self, target: TransactionState) -> Result<(), StateError> {
        if !self.state.can_transition_to(target) {
            return Err(StateError::WrongTransactionState {
                transaction: self.id,
                expected: "a state that can move there",
                actual: self.state.to_string(),
            });
        }
        self.state = target;
        Ok(())
    }

    /// Require a specific current state.
    pub fn expect_state(
        &self,
        expected: TransactionState,
        label: &'static str,
    ) -> Result<(), StateError> {
        if self.state == TransactionState::Disputed && expected != TransactionState::Disputed {
            return Err(StateError::Disputed(self.id));
        }
        if self.state != expected {
            return Err(StateError::WrongTransactionState {
                transaction: self.id,
                expected: label,
                actual: self.state.to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn is_party(&self, who: &Address) -> bool {
        self.seller == *who || self.counterparty.as_ref() == Some(who)
    }

    #[must_use]
    pub fn is_expired_at(&self, now: u64) -> bool {
        crate::time::has_passed(now, self.expires_at)
    }

    /// Listed items of a sale, auction or bundle (empty for trades).
    #[must_use]
    pub fn listed_items(&self) -> Vec<ListedItem> {
        match &self.kind {
            TransactionKind::Sale { item } | TransactionKind::Auction { item, .. } => vec![*item],
            TransactionKind::Bundle { items } => items.clone(),
            TransactionKind::Trade { .. } => Vec::new(),
        }
    }

    /// Is `asset` one of the items this transaction exchanges (as opposed
    /// to a payment, differential or bid deposit)?
    #[must_use]
    pub fn is_item(&self, asset: &Asset) -> bool {
        match &self.kind {
            TransactionKind::Sale { item } | TransactionKind::Auction { item, .. } => {
                item.asset.same_kind(asset)
            }
            TransactionKind::Bundle { items } => items.iter().any(|i| i.asset.same_kind(asset)),
            TransactionKind::Trade {
                offered, requested, ..
            } => offered.iter().chain(requested).any(|i| i.same_kind(asset)),
        }
    }

    #[must_use]
    pub fn holdings_by(&self, depositor: &Address) -> Vec<EscrowHolding> {
        self.escrow.iter().filter(|h| h.depositor == *depositor).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssetKind, TokenId};

    fn sale(state: TransactionState) -> Transaction {
        let seller = Address::from_seed(1);
        let token = TokenId::new(Address::from_seed(9), 1);
        Transaction {
            id: TransactionId(1),
            seller,
            counterparty: None,
            kind: TransactionKind::Sale {
                item: ListedItem::new(Asset::nft(token), RoyaltyDistribution::none(seller)),
            },
            price: Some(Asset::new(AssetKind::Native, 1000)),
            state,
            escrow: Vec::new(),
            created_at: 0,
            expires_at: 100,
            settlement: None,
        }
    }

    #[test]
    fn forward_transitions() {
        use TransactionState::*;
        assert!(Created.can_transition_to(Executed));
        assert!(Created.can_transition_to(Accepted));
        assert!(Accepted.can_transition_to(Disputed));
        assert!(Disputed.can_transition_to(Refunded));
    }

    #[test]
    fn no_state_is_reentered() {
        use TransactionState::*;
        let all = [
            Created, Accepted, Disputed, Executed, Cancelled, Expired, Released, Refunded, Split,
            Withdrawn,
        ];
        for state in all {
            assert!(!state.can_transition_to(state), "{state} re-entered");
            assert!(!state.can_transition_to(Created));
        }
        assert!(!Accepted.can_transition_to(Accepted));
        assert!(!Disputed.can_transition_to(Executed));
        assert!(!Disputed.can_transition_to(Withdrawn));
    }

    #[test]
    fn terminal_states_are_final() {
        use TransactionState::*;
        for terminal in [Executed, Cancelled, Expired, Released, Refunded, Split, Withdrawn] {
            assert!(terminal.is_terminal());
            for target in [Accepted, Disputed, Executed, Cancelled, Refunded] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn transition_rejects_backwards() {
        let mut tx = sale(TransactionState::Executed);
        let err = tx.transition(TransactionState::Cancelled).unwrap_err();
        assert!(matches!(err, StateError::WrongTransactionState { .. }));
        assert_eq!(tx.state, TransactionState::Executed);
    }

    #[test]
    fn expect_state_reports_dispute() {
        let tx = sale(TransactionState::Disputed);
        assert_eq!(
            tx.expect_state(TransactionState::Created, "CREATED"),
            Err(StateError::Disputed(TransactionId(1)))
        );
    }

    #[test]
    fn expiry_at_deadline() {
        let tx = sale(TransactionState::Created);
        assert!(!tx.is_expired_at(99));
        assert!(tx.is_expired_at(100));
    }

    #[test]
    fn party_check() {
        let mut tx = sale(TransactionState::Created);
        assert!(tx.is_party(&Address::from_seed(1)));
        assert!(!tx.is_party(&Address::from_seed(2)));
        tx.counterparty = Some(Address::from_seed(2));
        assert!(tx.is_party(&Address::from_seed(2)));
    }
}
