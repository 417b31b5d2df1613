//! Atomic swap engine: sales, bundles and trades.
//!
//! Every operation either completes all of its transfers or fails; the host
//! rolls back a failed invocation as a unit, so no partial transfer is ever
//! observable. Settlement-mutating operations run under the transaction's
//! reentrancy flag.

use marketsettle_host::Host;
use marketsettle_types::{
    Address, Asset, AuthorizationError, Differential, Distribution, EventKind, HolderRole,
    ListedItem, LockKey, MarketConfig, PaymentError, Result, RoyaltyDistribution,
    SettlementRecord, StateError, TradeSide, Transaction, TransactionId, TransactionKind,
    TransactionState, Transfer, TransferPurpose, ValidationError, asset, time,
};

use crate::escrow::EscrowManager;
use crate::security::ReentrancyGuard;
use crate::settlement;
use crate::storage::{TransactionStore, TreasuryStore};

/// A fixed-price listing of one item (sale) or several (bundle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub items: Vec<ListedItem>,
    pub price: Asset,
    pub duration: u64,
    /// Restrict the sale to one buyer.
    pub buyer: Option<Address>,
}

/// The initiator's side of a proposed trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeTerms {
    pub counterparty: Address,
    pub offered: Vec<Asset>,
    pub requested: Vec<Asset>,
    pub differential: Option<Differential>,
    pub duration: u64,
}

pub fn create_listing<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    seller: Address,
    listing: Listing,
    bundle: bool,
) -> Result<TransactionId> {
    host.require_auth(&seller)?;
    let assets: Vec<Asset> = listing.items.iter().map(|i| i.asset).collect();
    asset::validate_items(&assets)?;
    if !bundle && assets.len() != 1 {
        return Err(ValidationError::Config("a sale lists exactly one item".into()).into());
    }
    for item in &listing.items {
        item.royalty.validate()?;
    }
    listing.price.validate()?;
    if assets.iter().any(|a| a.same_kind(&listing.price)) {
        return Err(PaymentError::AssetMismatch.into());
    }
    if listing.buyer == Some(seller) {
        return Err(AuthorizationError::SelfDealing.into());
    }
    time::validate_duration(listing.duration, 1, config.max_transaction_duration)?;

    let now = host.timestamp();
    let id = TransactionId(host.next_sequence());
    let kind = if bundle {
        TransactionKind::Bundle {
            items: listing.items.clone(),
        }
    } else {
        TransactionKind::Sale {
            item: listing.items[0],
        }
    };
    let mut tx = Transaction {
        id,
        seller,
        counterparty: listing.buyer,
        kind,
        price: Some(listing.price),
        state: TransactionState::Created,
        escrow: Vec::new(),
        created_at: now,
        expires_at: time::deadline(now, listing.duration)?,
        settlement: None,
    };
    let mut escrow = EscrowManager::new(host);
    for item in &assets {
        escrow.lock(&mut tx, seller, HolderRole::Seller, *item, None)?;
    }
    TransactionStore::insert(host, &tx)?;
    host.emit(EventKind::SaleCreated {
        transaction: id,
        seller,
        items: u32::try_from(assets.len()).unwrap_or(u32::MAX),
        price: listing.price,
        expires_at: tx.expires_at,
    });
    tracing::info!(
        tx = %id,
        seller = %seller,
        kind = tx.kind.name(),
        price = %listing.price,
        "listing created"
    );
    Ok(id)
}

pub fn execute_sale<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    id: TransactionId,
    buyer: Address,
    payment: Asset,
) -> Result<SettlementRecord> {
    host.require_auth(&buyer)?;
    ReentrancyGuard::with_lock(host, LockKey::Transaction(id), |host, token| {
        let mut tx = TransactionStore::require(host, id)?;
        let policies: Vec<RoyaltyDistribution> = match &tx.kind {
            TransactionKind::Sale { .. } | TransactionKind::Bundle { .. } => {
                tx.listed_items().iter().map(|i| i.royalty).collect()
            }
            _ => return Err(StateError::WrongVariant(id, "sale or bundle").into()),
        };
        tx.expect_state(TransactionState::Created, "CREATED")?;
        if tx.is_expired_at(host.timestamp()) {
            return Err(StateError::Expired(id).into());
        }
        if buyer == tx.seller {
            return Err(AuthorizationError::SelfDealing.into());
        }
        if tx.counterparty.is_some_and(|designated| designated != buyer) {
            return Err(AuthorizationError::NotParty { caller: buyer, transaction: id }.into());
        }
        let price = tx.price.ok_or(PaymentError::AssetMismatch)?;
        if !payment.same_kind(&price) {
            return Err(PaymentError::AssetMismatch.into());
        }
        if payment.amount != price.amount {
            return Err(PaymentError::AmountMismatch {
                expected: price.amount,
                offered: payment.amount,
            }
            .into());
        }

        let mut treasury = TreasuryStore::load(host)?;
        let mut escrow = EscrowManager::new(host);
        let distribution = settlement::distribute_payment(
            &mut escrow,
            &mut treasury,
            &config.fee,
            buyer,
            tx.seller,
            &policies,
            payment,
        )?;
        for holding in EscrowManager::<H>::take(&mut tx, |h| h.role == HolderRole::Seller) {
            escrow.pay_out(buyer, holding.asset, TransferPurpose::Delivery)?;
        }
        let transfers = escrow.into_transfers();

        tx.counterparty = Some(buyer);
        let record = settlement::finalize(
            host,
            &mut tx,
            TransactionState::Executed,
            transfers,
            Some(distribution),
        )?;
        TreasuryStore::save(host, &treasury)?;
        TransactionStore::put(host, token, &tx)?;
        host.emit(EventKind::SaleExecuted {
            transaction: id,
            seller: tx.seller,
            buyer,
            distribution,
        });
        tracing::info!(
            tx = %id,
            buyer = %buyer,
            seller = %tx.seller,
            price = payment.amount,
            fee_bps = distribution.fee_bps,
            "sale executed"
        );
        Ok(record)
    })
}

pub fn create_trade<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    initiator: Address,
    terms: TradeTerms,
) -> Result<TransactionId> {
    host.require_auth(&initiator)?;
    if terms.counterparty == initiator {
        return Err(AuthorizationError::SelfDealing.into());
    }
    asset::validate_items(&terms.offered)?;
    asset::validate_items(&terms.requested)?;
    if terms
        .offered
        .iter()
        .any(|o| terms.requested.iter().any(|r| r.same_kind(o)))
    {
        return Err(ValidationError::DuplicateItem.into());
    }
    if let Some(diff) = &terms.differential {
        diff.amount.validate()?;
        if terms
            .offered
            .iter()
            .chain(&terms.requested)
            .any(|item| item.same_kind(&diff.amount))
        {
            return Err(PaymentError::AssetMismatch.into());
        }
    }
    time::validate_duration(terms.duration, 1, config.max_transaction_duration)?;

    let now = host.timestamp();
    let id = TransactionId(host.next_sequence());
    let mut tx = Transaction {
        id,
        seller: initiator,
        counterparty: Some(terms.counterparty),
        kind: TransactionKind::Trade {
            offered: terms.offered.clone(),
            requested: terms.requested,
            differential: terms.differential,
        },
        price: None,
        state: TransactionState::Created,
        escrow: Vec::new(),
        created_at: now,
        expires_at: time::deadline(now, terms.duration)?,
        settlement: None,
    };
    let mut escrow = EscrowManager::new(host);
    for item in &terms.offered {
        escrow.lock(&mut tx, initiator, HolderRole::Seller, *item, None)?;
    }
    if let Some(diff) = terms.differential.filter(|d| d.payer == TradeSide::Initiator) {
        escrow.lock(&mut tx, initiator, HolderRole::Seller, diff.amount, None)?;
    }
    TransactionStore::insert(host, &tx)?;
    host.emit(EventKind::TradeCreated {
        transaction: id,
        initiator,
        counterparty: terms.counterparty,
    });
    tracing::info!(
        tx = %id,
        initiator = %initiator,
        counterparty = %terms.counterparty,
        "trade proposed"
    );
    Ok(id)
}

pub fn accept_trade<H: Host>(host: &mut H, id: TransactionId, counterparty: Address) -> Result<()> {
    host.require_auth(&counterparty)?;
    ReentrancyGuard::with_lock(host, LockKey::Transaction(id), |host, token| {
        let mut tx = TransactionStore::require(host, id)?;
        let TransactionKind::Trade {
            requested,
            differential,
            ..
        } = tx.kind.clone()
        else {
            return Err(StateError::WrongVariant(id, "trade").into());
        };
        tx.expect_state(TransactionState::Created, "CREATED")?;
        if tx.is_expired_at(host.timestamp()) {
            return Err(StateError::Expired(id).into());
        }
        if tx.counterparty != Some(counterparty) {
            return Err(AuthorizationError::NotParty {
                caller: counterparty,
                transaction: id,
            }
            .into());
        }
        let mut escrow = EscrowManager::new(host);
        for item in &requested {
            escrow.lock(&mut tx, counterparty, HolderRole::Counterparty, *item, None)?;
        }
        if let Some(diff) = differential.filter(|d| d.payer == TradeSide::Counterparty) {
            escrow.lock(&mut tx, counterparty, HolderRole::Counterparty, diff.amount, None)?;
        }
        tx.transition(TransactionState::Accepted)?;
        TransactionStore::put(host, token, &tx)?;
        host.emit(EventKind::TradeAccepted {
            transaction: id,
            counterparty,
        });
        tracing::info!(tx = %id, counterparty = %counterparty, "trade accepted");
        Ok(())
    })
}

pub fn execute_trade<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    id: TransactionId,
    caller: Address,
) -> Result<SettlementRecord> {
    host.require_auth(&caller)?;
    ReentrancyGuard::with_lock(host, LockKey::Transaction(id), |host, token| {
        let mut tx = TransactionStore::require(host, id)?;
        if !matches!(tx.kind, TransactionKind::Trade { .. }) {
            return Err(StateError::WrongVariant(id, "trade").into());
        }
        tx.expect_state(TransactionState::Accepted, "ACCEPTED")?;
        if tx.is_expired_at(host.timestamp()) {
            return Err(StateError::Expired(id).into());
        }
        if !tx.is_party(&caller) {
            return Err(AuthorizationError::NotParty { caller, transaction: id }.into());
        }
        let (transfers, distribution) = swap_trade(host, config, &mut tx)?;
        let record = settlement::finalize(
            host,
            &mut tx,
            TransactionState::Executed,
            transfers,
            distribution,
        )?;
        TransactionStore::put(host, token, &tx)?;
        host.emit(EventKind::TradeExecuted {
            transaction: id,
            initiator: tx.seller,
            counterparty: tx.counterparty.unwrap_or(tx.seller),
        });
        tracing::info!(tx = %id, caller = %caller, "trade executed");
        Ok(record)
    })
}

/// Swap both escrowed sides of an accepted trade. The differential is
/// charged the platform fee and carries no royalty.
pub(crate) fn swap_trade<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    tx: &mut Transaction,
) -> Result<(Vec<Transfer>, Option<Distribution>)> {
    let TransactionKind::Trade { differential, .. } = tx.kind.clone() else {
        return Err(StateError::WrongVariant(tx.id, "trade").into());
    };
    let initiator = tx.seller;
    let counterparty = tx.counterparty.ok_or(StateError::WrongVariant(tx.id, "trade"))?;

    let mut treasury = TreasuryStore::load(host)?;
    let mut escrow = EscrowManager::new(host);
    let mut distribution = None;
    if let Some(diff) = differential {
        let (payer, receiver) = match diff.payer {
            TradeSide::Initiator => (initiator, counterparty),
            TradeSide::Counterparty => (counterparty, initiator),
        };
        let held = EscrowManager::<H>::take(tx, |h| h.depositor == payer && h.asset == diff.amount);
        if held.is_empty() {
            return Err(PaymentError::InsufficientFunds {
                needed: diff.amount.amount,
                available: 0,
            }
            .into());
        }
        let contract = escrow.contract();
        distribution = Some(settlement::distribute_payment(
            &mut escrow,
            &mut treasury,
            &config.fee,
            contract,
            receiver,
            &[RoyaltyDistribution::none(receiver)],
            diff.amount,
        )?);
    }
    for holding in EscrowManager::<H>::take(tx, |_| true) {
        let to = if holding.depositor == initiator { counterparty } else { initiator };
        escrow.pay_out(to, holding.asset, TransferPurpose::Delivery)?;
    }
    let transfers = escrow.into_transfers();
    TreasuryStore::save(host, &treasury)?;
    Ok((transfers, distribution))
}

/// Cancel a sale, bundle or trade.
///
/// Before `expires_at` only the seller may cancel, and only a `Created`
/// transaction (yielding `Cancelled`). From `expires_at` on anyone may
/// close it (yielding `Expired`). Escrow returns to its depositors.
pub fn cancel_transaction<H: Host>(host: &mut H, id: TransactionId, caller: Address) -> Result<()> {
    host.require_auth(&caller)?;
    ReentrancyGuard::with_lock(host, LockKey::Transaction(id), |host, token| {
        let mut tx = TransactionStore::require(host, id)?;
        if matches!(tx.kind, TransactionKind::Auction { .. }) {
            return Err(StateError::WrongVariant(id, "sale, bundle or trade").into());
        }
        if tx.state == TransactionState::Disputed {
            return Err(StateError::Disputed(id).into());
        }
        if !tx.state.holds_escrow() {
            return Err(StateError::WrongTransactionState {
                transaction: id,
                expected: "CREATED or ACCEPTED",
                actual: tx.state.to_string(),
            }
            .into());
        }
        let expired = tx.is_expired_at(host.timestamp());
        let outcome = if expired {
            TransactionState::Expired
        } else if tx.state == TransactionState::Accepted {
            return Err(StateError::NotExpired(id).into());
        } else if caller != tx.seller {
            return Err(AuthorizationError::NotSeller { caller }.into());
        } else {
            TransactionState::Cancelled
        };

        let mut escrow = EscrowManager::new(host);
        escrow.refund_all(&mut tx)?;
        let transfers = escrow.into_transfers();
        settlement::finalize(host, &mut tx, outcome, transfers, None)?;
        TransactionStore::put(host, token, &tx)?;
        host.emit(EventKind::TransactionClosed {
            transaction: id,
            caller,
            state: outcome,
        });
        tracing::info!(tx = %id, caller = %caller, state = %outcome, "transaction closed");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use marketsettle_host::MemoryHost;
    use marketsettle_types::{AssetKind, FeeConfig, MarketError, TokenId};

    use super::*;

    fn seller() -> Address {
        Address::from_seed(1)
    }

    fn buyer() -> Address {
        Address::from_seed(2)
    }

    fn config() -> MarketConfig {
        let arbiters = vec![Address::from_seed(200)];
        MarketConfig::new(Address::from_seed(100), FeeConfig::flat(500), arbiters)
    }

    fn nft(serial: u64) -> Asset {
        Asset::nft(TokenId::new(Address::from_seed(250), serial))
    }

    fn listing(items: Vec<Asset>, price: Asset) -> Listing {
        Listing {
            items: items
                .into_iter()
                .map(|a| ListedItem::new(a, RoyaltyDistribution::none(seller())))
                .collect(),
            price,
            duration: 3600,
            buyer: None,
        }
    }

    #[test]
    fn sale_rejects_two_items() {
        let mut host = MemoryHost::mock_all_auths();
        let l = listing(vec![nft(1), nft(2)], Asset::native(10));
        let err = create_listing(&mut host, &config(), seller(), l, false).unwrap_err();
        assert!(matches!(err, MarketError::Validation(ValidationError::Config(_))), "Got: {err}");
    }

    #[test]
    fn price_in_item_kind_rejected() {
        let mut host = MemoryHost::mock_all_auths();
        let l = listing(vec![nft(1)], nft(1));
        let err = create_listing(&mut host, &config(), seller(), l, false).unwrap_err();
        assert_eq!(err, PaymentError::AssetMismatch.into());
    }

    #[test]
    fn private_sale_to_self_rejected() {
        let mut host = MemoryHost::mock_all_auths();
        let mut l = listing(vec![nft(1)], Asset::native(10));
        l.buyer = Some(seller());
        let err = create_listing(&mut host, &config(), seller(), l, false).unwrap_err();
        assert_eq!(err, AuthorizationError::SelfDealing.into());
    }

    #[test]
    fn listing_escrows_the_item() {
        let mut host = MemoryHost::mock_all_auths();
        host.mint(&seller(), &nft(1)).unwrap();
        let l = listing(vec![nft(1)], Asset::native(10));
        let id = create_listing(&mut host, &config(), seller(), l, false).unwrap();
        let tx = TransactionStore::require(&host, id).unwrap();
        assert_eq!(tx.state, TransactionState::Created);
        assert_eq!(tx.escrow.len(), 1);
        assert_eq!(host.owner_of(&nft(1).kind), Some(host.contract_address()));
    }

    #[test]
    fn overlapping_trade_sides_rejected() {
        let mut host = MemoryHost::mock_all_auths();
        let terms = TradeTerms {
            counterparty: buyer(),
            offered: vec![nft(1)],
            requested: vec![nft(1)],
            differential: None,
            duration: 60,
        };
        let err = create_trade(&mut host, &config(), seller(), terms).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateItem.into());
    }

    #[test]
    fn trade_swaps_items_and_charges_fee_on_differential() {
        let mut host = MemoryHost::mock_all_auths();
        host.mint(&seller(), &nft(1)).unwrap();
        host.mint(&seller(), &Asset::native(100)).unwrap();
        host.mint(&buyer(), &nft(2)).unwrap();
        let config = config();
        let terms = TradeTerms {
            counterparty: buyer(),
            offered: vec![nft(1)],
            requested: vec![nft(2)],
            differential: Some(Differential {
                payer: TradeSide::Initiator,
                amount: Asset::native(100),
            }),
            duration: 60,
        };
        let id = create_trade(&mut host, &config, seller(), terms).unwrap();
        accept_trade(&mut host, id, buyer()).unwrap();
        let record = execute_trade(&mut host, &config, id, buyer()).unwrap();

        assert_eq!(host.owner_of(&nft(1).kind), Some(buyer()));
        assert_eq!(host.owner_of(&nft(2).kind), Some(seller()));
        assert_eq!(host.balance(&buyer(), &AssetKind::Native), 95);
        assert_eq!(TreasuryStore::load(&host).unwrap().fee_balance(&AssetKind::Native), 5);
        assert_eq!(record.outcome, TransactionState::Executed);
        assert!(TransactionStore::require(&host, id).unwrap().escrow.is_empty());
        host.verify_supply().unwrap();
    }

    #[test]
    fn stranger_cannot_cancel_before_expiry() {
        let mut host = MemoryHost::mock_all_auths();
        host.mint(&seller(), &nft(1)).unwrap();
        let l = listing(vec![nft(1)], Asset::native(10));
        let id = create_listing(&mut host, &config(), seller(), l, false).unwrap();
        let err = cancel_transaction(&mut host, id, buyer()).unwrap_err();
        assert_eq!(err, AuthorizationError::NotSeller { caller: buyer() }.into());

        host.advance_time(3600);
        cancel_transaction(&mut host, id, buyer()).unwrap();
        assert_eq!(TransactionStore::require(&host, id).unwrap().state, TransactionState::Expired);
        assert_eq!(host.owner_of(&nft(1).kind), Some(seller()));
    }
}
