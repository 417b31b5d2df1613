//! Auction engine: bid intake, commit-reveal, and settlement for English
//! and Dutch auctions.
//!
//! An auction's item and every bid deposit are held on its linked
//! transaction, so mutating operations take the auction's reentrancy flag
//! and then the transaction's.

use marketsettle_host::Host;
use marketsettle_types::{
    Address, Asset, AssetKind, Auction, AuctionId, AuctionKind, AuctionState, AuthorizationError,
    Bid, BidId, BidStatus, Commitment, Distribution, EventKind, HolderRole, ListedItem, LockKey,
    MarketConfig, NotFoundError, PaymentError, Result, SecurityError, StateError, Transaction,
    TransactionId, TransactionKind, TransactionState, TransferPurpose, ValidationError, math, time,
};

use crate::escrow::EscrowManager;
use crate::security::{ReentrancyGuard, verify_reveal};
use crate::settlement;
use crate::storage::{AuctionStore, LockToken, TransactionStore, Treasury, TreasuryStore};

/// Terms of a new auction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionParams {
    pub item: ListedItem,
    pub kind: AuctionKind,
    pub payment_kind: AssetKind,
    pub reserve: u64,
    pub duration: u64,
}

/// Current Dutch price: `max(reserve, start − drop × ⌊elapsed / period⌋)`.
///
/// Non-increasing in `now`. English auctions quote their reserve.
#[must_use]
pub fn dutch_price(auction: &Auction, now: u64) -> u64 {
    match auction.kind {
        AuctionKind::Dutch {
            start_price,
            drop_per_period,
            period,
        } => {
            let steps = time::elapsed(now, auction.start_time) / period.max(1);
            start_price
                .saturating_sub(drop_per_period.saturating_mul(steps))
                .max(auction.reserve)
        }
        AuctionKind::English { .. } => auction.reserve,
    }
}

pub fn create_auction<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    seller: Address,
    params: AuctionParams,
) -> Result<AuctionId> {
    host.require_auth(&seller)?;
    params.item.asset.validate_item()?;
    params.item.royalty.validate()?;
    if params.item.asset.kind == params.payment_kind {
        return Err(PaymentError::AssetMismatch.into());
    }
    if params.reserve == 0 {
        return Err(ValidationError::ZeroAmount.into());
    }
    time::validate_duration(
        params.duration,
        config.auction.min_duration,
        config.auction.max_duration,
    )?;
    match params.kind {
        AuctionKind::English { min_increment: 0 } => {
            return Err(
                ValidationError::AuctionParams("minimum increment must be non-zero".into()).into(),
            );
        }
        AuctionKind::Dutch {
            start_price,
            drop_per_period,
            period,
        } => {
            if start_price < params.reserve {
                return Err(
                    ValidationError::AuctionParams("start price below reserve".into()).into(),
                );
            }
            if drop_per_period == 0 || period == 0 {
                return Err(ValidationError::AuctionParams(
                    "price must decay over a non-zero period".into(),
                )
                .into());
            }
        }
        AuctionKind::English { .. } => {}
    }

    let now = host.timestamp();
    let transaction = TransactionId(host.next_sequence());
    let id = AuctionId(host.next_sequence());
    let end_time = time::deadline(now, params.duration)?;
    let mut tx = Transaction {
        id: transaction,
        seller,
        counterparty: None,
        kind: TransactionKind::Auction {
            auction: id,
            item: params.item,
        },
        price: Some(Asset::new(params.payment_kind, params.reserve)),
        state: TransactionState::Created,
        escrow: Vec::new(),
        created_at: now,
        expires_at: end_time,
        settlement: None,
    };
    EscrowManager::new(host).lock(&mut tx, seller, HolderRole::Seller, params.item.asset, None)?;
    let auction = Auction {
        id,
        transaction,
        seller,
        item: params.item,
        kind: params.kind,
        payment_kind: params.payment_kind,
        reserve: params.reserve,
        start_time: now,
        end_time,
        reveal_period: config.auction.reveal_period,
        extension_window: config.auction.extension_window,
        state: AuctionState::Open,
        leader: None,
        unrevealed: 0,
        bid_count: 0,
    };
    TransactionStore::insert(host, &tx)?;
    AuctionStore::insert(host, &auction)?;
    host.emit(EventKind::AuctionCreated {
        auction: id,
        transaction,
        seller,
        reserve: params.reserve,
        end_time,
    });
    tracing::info!(
        auction = %id,
        tx = %transaction,
        seller = %seller,
        kind = params.kind.name(),
        reserve = params.reserve,
        end_time,
        "auction created"
    );
    Ok(id)
}

/// Run `f` on an auction and its transaction under both reentrancy flags,
/// then persist both records.
fn with_auction<H: Host, T>(
    host: &mut H,
    id: AuctionId,
    f: impl FnOnce(&mut H, &mut Auction, &mut Transaction, &LockToken) -> Result<T>,
) -> Result<T> {
    ReentrancyGuard::with_lock(host, LockKey::Auction(id), |host, auction_token| {
        let mut auction = AuctionStore::require(host, id)?;
        let tx_key = LockKey::Transaction(auction.transaction);
        ReentrancyGuard::with_lock(host, tx_key, |host, tx_token| {
            let mut tx = TransactionStore::require(host, auction.transaction)?;
            let out = f(host, &mut auction, &mut tx, auction_token)?;
            AuctionStore::put(host, auction_token, &auction)?;
            TransactionStore::put(host, tx_token, &tx)?;
            Ok(out)
        })
    })
}

fn expect_biddable(auction: &Auction, tx: &Transaction) -> Result<()> {
    if tx.state == TransactionState::Disputed {
        return Err(StateError::Disputed(tx.id).into());
    }
    auction.expect_open()?;
    Ok(())
}

/// Place a bid. With `commitment = None`, `amount` is a plaintext bid and is
/// escrowed in full. With a commitment, `amount` is the escrowed deposit
/// that will back the revealed bid.
pub fn place_bid<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    id: AuctionId,
    bidder: Address,
    amount: u64,
    commitment: Option<Commitment>,
) -> Result<BidId> {
    host.require_auth(&bidder)?;
    if amount == 0 {
        return Err(ValidationError::ZeroAmount.into());
    }
    with_auction(host, id, |host, auction, tx, token| {
        expect_biddable(auction, tx)?;
        if bidder == auction.seller {
            return Err(AuthorizationError::SelfDealing.into());
        }
        if time::has_passed(host.timestamp(), auction.end_time) {
            return Err(StateError::BiddingClosed(id).into());
        }
        match (auction.kind, commitment) {
            (AuctionKind::Dutch { .. }, Some(_)) => {
                Err(StateError::CommitmentsNotAccepted(id).into())
            }
            (AuctionKind::Dutch { .. }, None) => {
                dutch_fill(host, config, auction, tx, token, bidder, amount)
            }
            (AuctionKind::English { min_increment }, None) => {
                open_bid(host, auction, tx, token, bidder, amount, min_increment)
            }
            (AuctionKind::English { .. }, Some(c)) => {
                commit_bid(host, auction, tx, token, bidder, amount, c)
            }
        }
    })
}

fn new_bid<H: Host>(host: &mut H, auction: &Auction, bidder: Address) -> Bid {
    Bid {
        id: BidId(host.next_sequence()),
        auction: auction.id,
        bidder,
        amount: None,
        commitment: None,
        deposit: 0,
        revealed: false,
        placed_at: host.timestamp(),
        status: BidStatus::Active,
    }
}

fn open_bid<H: Host>(
    host: &mut H,
    auction: &mut Auction,
    tx: &mut Transaction,
    token: &LockToken,
    bidder: Address,
    amount: u64,
    min_increment: u64,
) -> Result<BidId> {
    let mut previous = auction.leader.map(|b| AuctionStore::bid(host, b)).transpose()?;
    let minimum = match &previous {
        Some(leader) => {
            math::checked_add(leader.amount.unwrap_or(0), min_increment)?.max(auction.reserve)
        }
        None => auction.reserve,
    };
    if amount < minimum {
        return Err(PaymentError::BidTooLow {
            minimum,
            offered: amount,
        }
        .into());
    }

    let mut bid = new_bid(host, auction, bidder);
    bid.amount = Some(amount);
    bid.deposit = amount;
    let mut escrow = EscrowManager::new(host);
    let deposit = Asset::new(auction.payment_kind, amount);
    escrow.lock(tx, bidder, HolderRole::Bidder, deposit, Some(bid.id))?;
    if let Some(prev) = previous.as_mut() {
        refund_bid(&mut escrow, tx, prev)?;
    }
    if let Some(prev) = &previous {
        AuctionStore::put_bid(host, token, prev)?;
        host.emit(EventKind::BidRefunded {
            auction: auction.id,
            bid: prev.id,
            bidder: prev.bidder,
            amount: prev.deposit,
        });
    }
    AuctionStore::insert_bid(host, token, &bid)?;
    auction.leader = Some(bid.id);
    auction.bid_count = auction.bid_count.saturating_add(1);
    tx.counterparty = Some(bidder);
    host.emit(EventKind::BidPlaced {
        auction: auction.id,
        bid: bid.id,
        bidder,
        amount,
    });
    extend_if_closing(host, auction, tx);
    tracing::info!(auction = %auction.id, bid = %bid.id, bidder = %bidder, amount, "bid placed");
    Ok(bid.id)
}

fn commit_bid<H: Host>(
    host: &mut H,
    auction: &mut Auction,
    tx: &mut Transaction,
    token: &LockToken,
    bidder: Address,
    deposit: u64,
    commitment: Commitment,
) -> Result<BidId> {
    let pending = AuctionStore::bids(host, auction.id)?
        .iter()
        .any(|b| b.bidder == bidder && b.is_pending_reveal());
    if pending {
        return Err(SecurityError::CommitmentExists {
            auction: auction.id,
            bidder,
        }
        .into());
    }
    let mut bid = new_bid(host, auction, bidder);
    bid.commitment = Some(commitment);
    bid.deposit = deposit;
    EscrowManager::new(host).lock(
        tx,
        bidder,
        HolderRole::Bidder,
        Asset::new(auction.payment_kind, deposit),
        Some(bid.id),
    )?;
    AuctionStore::insert_bid(host, token, &bid)?;
    auction.unrevealed = auction.unrevealed.saturating_add(1);
    auction.bid_count = auction.bid_count.saturating_add(1);
    host.emit(EventKind::BidCommitted {
        auction: auction.id,
        bid: bid.id,
        bidder,
        commitment,
        deposit,
    });
    tracing::info!(
        auction = %auction.id,
        bid = %bid.id,
        bidder = %bidder,
        %commitment,
        "bid committed"
    );
    Ok(bid.id)
}

fn dutch_fill<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    auction: &mut Auction,
    tx: &mut Transaction,
    token: &LockToken,
    bidder: Address,
    amount: u64,
) -> Result<BidId> {
    let price = dutch_price(auction, host.timestamp());
    if amount < price {
        return Err(PaymentError::BidTooLow {
            minimum: price,
            offered: amount,
        }
        .into());
    }
    let mut bid = new_bid(host, auction, bidder);
    bid.amount = Some(price);
    bid.deposit = price;

    let mut treasury = TreasuryStore::load(host)?;
    let mut escrow = EscrowManager::new(host);
    let payment = Asset::new(auction.payment_kind, price);
    escrow.lock(tx, bidder, HolderRole::Bidder, payment, Some(bid.id))?;
    let distribution = pay_winner(&mut escrow, &mut treasury, config, auction, tx, &bid)?;
    let transfers = escrow.into_transfers();
    bid.status = BidStatus::Won;

    auction.leader = Some(bid.id);
    auction.bid_count = auction.bid_count.saturating_add(1);
    auction.transition(AuctionState::EndedSold)?;
    settlement::finalize(host, tx, TransactionState::Executed, transfers, Some(distribution))?;
    TreasuryStore::save(host, &treasury)?;
    AuctionStore::insert_bid(host, token, &bid)?;
    host.emit(EventKind::BidPlaced {
        auction: auction.id,
        bid: bid.id,
        bidder,
        amount: price,
    });
    host.emit(EventKind::AuctionEnded {
        auction: auction.id,
        winner: Some(bidder),
        price: Some(price),
    });
    tracing::info!(auction = %auction.id, bidder = %bidder, price, "dutch auction filled");
    Ok(bid.id)
}

/// Reveal a committed bid. Returns whether it became the leading bid.
pub fn reveal_bid<H: Host>(
    host: &mut H,
    id: AuctionId,
    bidder: Address,
    amount: u64,
    salt: &[u8; 32],
) -> Result<bool> {
    host.require_auth(&bidder)?;
    with_auction(host, id, |host, auction, tx, token| {
        expect_biddable(auction, tx)?;
        if auction.is_dutch() {
            return Err(StateError::CommitmentsNotAccepted(id).into());
        }
        if time::has_passed(host.timestamp(), auction.reveal_deadline()) {
            return Err(StateError::RevealClosed(id).into());
        }
        let mut bid = AuctionStore::bids(host, id)?
            .into_iter()
            .find(|b| b.bidder == bidder && b.is_pending_reveal())
            .ok_or(StateError::NoCommitment { auction: id, bidder })?;
        let stored = bid.commitment.ok_or(StateError::NoCommitment { auction: id, bidder })?;
        verify_reveal(&stored, id, &bidder, amount, salt).inspect_err(|_| {
            tracing::warn!(auction = %id, bidder = %bidder, "reveal does not match commitment");
        })?;
        if amount > bid.deposit {
            return Err(PaymentError::DepositTooSmall {
                amount,
                deposit: bid.deposit,
            }
            .into());
        }
        if amount < auction.reserve {
            return Err(PaymentError::BidTooLow {
                minimum: auction.reserve,
                offered: amount,
            }
            .into());
        }

        bid.amount = Some(amount);
        bid.revealed = true;
        auction.unrevealed = auction.unrevealed.saturating_sub(1);
        let mut leader = auction.leader.map(|b| AuctionStore::bid(host, b)).transpose()?;
        let leading = leader.as_ref().is_none_or(|l| bid.outranks(l));

        let mut escrow = EscrowManager::new(host);
        if leading {
            let surplus = math::checked_sub(bid.deposit, amount)?;
            if surplus > 0 {
                let mut holding = EscrowManager::<H>::take_bid(tx, bid.id)
                    .ok_or(NotFoundError::Bid(bid.id))?;
                let excess = holding.asset.with_amount(surplus);
                escrow.pay_out(bidder, excess, TransferPurpose::Refund)?;
                holding.asset = holding.asset.with_amount(amount);
                tx.escrow.push(holding);
                bid.deposit = amount;
            }
            if let Some(prev) = leader.as_mut() {
                refund_bid(&mut escrow, tx, prev)?;
            }
        } else {
            refund_bid(&mut escrow, tx, &mut bid)?;
        }

        if let Some(prev) = leader.filter(|_| leading) {
            AuctionStore::put_bid(host, token, &prev)?;
            host.emit(EventKind::BidRefunded {
                auction: id,
                bid: prev.id,
                bidder: prev.bidder,
                amount: prev.deposit,
            });
        }
        if leading {
            auction.leader = Some(bid.id);
            tx.counterparty = Some(bidder);
        }
        AuctionStore::put_bid(host, token, &bid)?;
        host.emit(EventKind::BidRevealed {
            auction: id,
            bid: bid.id,
            bidder,
            amount,
            leading,
        });
        if leading {
            extend_if_closing(host, auction, tx);
        }
        tracing::info!(
            auction = %id,
            bid = %bid.id,
            bidder = %bidder,
            amount,
            leading,
            "bid revealed"
        );
        Ok(leading)
    })
}

/// Close an auction after `end_time` (and, while commitments are
/// unrevealed, after the reveal deadline). Unrevealed deposits are
/// forfeited to the platform; the leading bid wins if it meets the reserve.
pub fn end_auction<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    id: AuctionId,
) -> Result<AuctionState> {
    with_auction(host, id, |host, auction, tx, token| {
        expect_biddable(auction, tx)?;
        let now = host.timestamp();
        if !time::has_passed(now, auction.end_time)
            || (auction.unrevealed > 0 && !time::has_passed(now, auction.reveal_deadline()))
        {
            return Err(StateError::AuctionStillRunning(id).into());
        }

        let mut bids = AuctionStore::bids(host, id)?;
        let mut treasury = TreasuryStore::load(host)?;
        let mut escrow = EscrowManager::new(host);
        let mut forfeited = Vec::new();
        for bid in bids.iter_mut().filter(|b| b.is_pending_reveal()) {
            if let Some(holding) = EscrowManager::<H>::take_bid(tx, bid.id) {
                escrow.retain(&holding, TransferPurpose::Forfeit);
                treasury.credit_fee(holding.asset.kind, holding.asset.amount)?;
            }
            bid.status = BidStatus::Forfeited;
            forfeited.push(bid.clone());
        }
        auction.unrevealed = 0;

        let winner = bids.iter_mut().find(|b| {
            Some(b.id) == auction.leader && b.amount.is_some_and(|a| a >= auction.reserve)
        });
        let (state, outcome, distribution, winner_bid) = if let Some(bid) = winner {
            let distribution = pay_winner(&mut escrow, &mut treasury, config, auction, tx, bid)?;
            bid.status = BidStatus::Won;
            (
                AuctionState::EndedSold,
                TransactionState::Executed,
                Some(distribution),
                Some(bid.clone()),
            )
        } else {
            (AuctionState::EndedUnsold, TransactionState::Expired, None, None)
        };
        // The unsold item and any outbid deposits go back to their depositors.
        escrow.refund_all(tx)?;
        let transfers = escrow.into_transfers();

        auction.transition(state)?;
        settlement::finalize(host, tx, outcome, transfers, distribution)?;
        TreasuryStore::save(host, &treasury)?;
        for bid in &forfeited {
            AuctionStore::put_bid(host, token, bid)?;
            host.emit(EventKind::BidForfeited {
                auction: id,
                bid: bid.id,
                bidder: bid.bidder,
                deposit: bid.deposit,
            });
        }
        if let Some(bid) = &winner_bid {
            AuctionStore::put_bid(host, token, bid)?;
        }
        let winner = winner_bid.as_ref().map(|b| b.bidder);
        let price = winner_bid.as_ref().and_then(|b| b.amount);
        host.emit(EventKind::AuctionEnded {
            auction: id,
            winner,
            price,
        });
        tracing::info!(auction = %id, state = %state, forfeited = forfeited.len(), "auction ended");
        Ok(state)
    })
}

/// Withdraw an auction that has received no bids or commitments.
pub fn cancel_auction<H: Host>(host: &mut H, id: AuctionId, caller: Address) -> Result<()> {
    host.require_auth(&caller)?;
    with_auction(host, id, |host, auction, tx, _| {
        if caller != auction.seller {
            return Err(AuthorizationError::NotSeller { caller }.into());
        }
        expect_biddable(auction, tx)?;
        if auction.bid_count > 0 {
            return Err(StateError::AuctionHasBids(id).into());
        }
        let mut escrow = EscrowManager::new(host);
        escrow.refund_all(tx)?;
        let transfers = escrow.into_transfers();
        auction.transition(AuctionState::Cancelled)?;
        settlement::finalize(host, tx, TransactionState::Cancelled, transfers, None)?;
        host.emit(EventKind::AuctionCancelled {
            auction: id,
            seller: caller,
        });
        tracing::info!(auction = %id, seller = %caller, "auction cancelled");
        Ok(())
    })
}

/// Return a bid's escrow to its bidder and mark it refunded.
fn refund_bid<H: Host>(
    escrow: &mut EscrowManager<'_, H>,
    tx: &mut Transaction,
    bid: &mut Bid,
) -> Result<()> {
    if let Some(holding) = EscrowManager::<H>::take_bid(tx, bid.id) {
        escrow.refund(&holding)?;
    }
    bid.status = BidStatus::Refunded;
    Ok(())
}

/// Settle the item to `bid`'s bidder, paying its amount out of escrow to
/// the seller, creator and platform. Any deposit above the amount is
/// returned to the bidder.
pub(crate) fn pay_winner<H: Host>(
    escrow: &mut EscrowManager<'_, H>,
    treasury: &mut Treasury,
    config: &MarketConfig,
    auction: &Auction,
    tx: &mut Transaction,
    bid: &Bid,
) -> Result<Distribution> {
    let holding = EscrowManager::<H>::take_bid(tx, bid.id).ok_or(NotFoundError::Bid(bid.id))?;
    let price = bid.amount.ok_or(StateError::NoCommitment {
        auction: auction.id,
        bidder: bid.bidder,
    })?;
    let surplus = math::checked_sub(holding.asset.amount, price)?;
    escrow.pay_out(bid.bidder, holding.asset.with_amount(surplus), TransferPurpose::Refund)?;
    let contract = escrow.contract();
    let distribution = settlement::distribute_payment(
        escrow,
        treasury,
        &config.fee,
        contract,
        auction.seller,
        &[auction.item.royalty],
        Asset::new(auction.payment_kind, price),
    )?;
    for item in EscrowManager::<H>::take(tx, |h| h.role == HolderRole::Seller) {
        escrow.pay_out(bid.bidder, item.asset, TransferPurpose::Delivery)?;
    }
    tx.counterparty = Some(bid.bidder);
    Ok(distribution)
}

/// Anti-sniping: a leading bid inside the extension window pushes
/// `end_time` out to `now + extension_window`.
fn extend_if_closing<H: Host>(host: &mut H, auction: &mut Auction, tx: &mut Transaction) {
    let now = host.timestamp();
    if auction.extension_window == 0
        || !time::within_closing_window(now, auction.end_time, auction.extension_window)
    {
        return;
    }
    let extended = now.saturating_add(auction.extension_window);
    if extended <= auction.end_time {
        return;
    }
    auction.end_time = extended;
    tx.expires_at = extended;
    host.emit(EventKind::AuctionExtended {
        auction: auction.id,
        end_time: extended,
    });
    tracing::info!(auction = %auction.id, end_time = extended, "auction extended");
}
