//! Dispute resolution: arbitration over a transaction that still holds
//! escrow.
//!
//! Opening a dispute moves the transaction to `Disputed`, which pauses
//! every execute, cancel, bid and end operation on it until
//! `execute_dispute_resolution` or an administrator's
//! `force_resolve_dispute` drives it to `Released`, `Refunded` or `Split`.

use marketsettle_host::Host;
use marketsettle_types::{
    Address, AuctionId, AuctionState, AuthorizationError, BidStatus, Dispute, DisputeId,
    DisputeState, EscrowHolding, EventKind, Evidence, HolderRole, LockKey, MarketConfig,
    MathError, ReasonCode, Result, SettlementRecord, StateError, Transaction, TransactionId,
    TransactionKind, TransactionState, TransferPurpose, ValidationError, Verdict, constants, math,
    time,
};

use crate::admin;
use crate::auction;
use crate::escrow::EscrowManager;
use crate::security::ReentrancyGuard;
use crate::settlement;
use crate::storage::{AuctionStore, DisputeStore, LockToken, TransactionStore, TreasuryStore};
use crate::swap;

pub fn initiate_dispute<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    transaction: TransactionId,
    initiator: Address,
    reason: ReasonCode,
) -> Result<DisputeId> {
    host.require_auth(&initiator)?;
    ReentrancyGuard::with_lock(host, LockKey::Transaction(transaction), |host, token| {
        let mut tx = TransactionStore::require(host, transaction)?;
        if tx.state == TransactionState::Disputed {
            return Err(StateError::DisputeExists(transaction).into());
        }
        if !tx.state.holds_escrow() {
            return Err(StateError::WrongTransactionState {
                transaction,
                expected: "CREATED or ACCEPTED",
                actual: tx.state.to_string(),
            }
            .into());
        }
        if !tx.is_party(&initiator) {
            return Err(AuthorizationError::NotParty {
                caller: initiator,
                transaction,
            }
            .into());
        }

        let now = host.timestamp();
        let id = DisputeId(host.next_sequence());
        let dispute = Dispute {
            id,
            transaction,
            initiator,
            reason,
            arbiters: config.dispute.arbiters.clone(),
            quorum: config.dispute.quorum,
            votes: std::collections::BTreeMap::new(),
            opened_at: now,
            evidence_deadline: time::deadline(now, config.dispute.evidence_period)?,
            evidence: Vec::new(),
            resolution_deadline: time::deadline(now, config.dispute.resolution_period)?,
            default_verdict: config.dispute.default_verdict,
            split_seller_bps: config.dispute.split_seller_bps,
            forced_by: None,
            state: DisputeState::Opened,
        };
        tx.transition(TransactionState::Disputed)?;
        DisputeStore::insert(host, &dispute)?;
        TransactionStore::put(host, token, &tx)?;
        host.emit(EventKind::DisputeOpened {
            dispute: id,
            transaction,
            initiator,
            reason,
        });
        tracing::info!(
            dispute = %id,
            tx = %transaction,
            initiator = %initiator,
            ?reason,
            "dispute opened"
        );
        Ok(id)
    })
}

/// Attach an evidence URI. Only the initiator and the dispute's arbiters
/// may submit, and only before the evidence deadline.
pub fn submit_evidence<H: Host>(
    host: &mut H,
    id: DisputeId,
    submitter: Address,
    uri: String,
) -> Result<()> {
    host.require_auth(&submitter)?;
    ReentrancyGuard::with_lock(host, LockKey::Dispute(id), |host, token| {
        let mut dispute = DisputeStore::require(host, id)?;
        dispute.expect_open()?;
        if !dispute.may_submit_evidence(&submitter) {
            tracing::warn!(dispute = %id, caller = %submitter, "evidence from outsider rejected");
            return Err(AuthorizationError::NotEvidenceSubmitter {
                caller: submitter,
                dispute: id,
            }
            .into());
        }
        let now = host.timestamp();
        if time::has_passed(now, dispute.evidence_deadline) {
            return Err(StateError::EvidenceClosed(id).into());
        }
        if uri.trim().is_empty() || uri.len() > constants::MAX_EVIDENCE_URI_LEN {
            return Err(ValidationError::Evidence(format!(
                "uri must be 1..={} bytes",
                constants::MAX_EVIDENCE_URI_LEN
            ))
            .into());
        }
        if dispute.evidence.len() >= constants::MAX_EVIDENCE_PER_DISPUTE {
            return Err(ValidationError::Evidence(format!(
                "at most {} entries per dispute",
                constants::MAX_EVIDENCE_PER_DISPUTE
            ))
            .into());
        }

        let index = u32::try_from(dispute.evidence.len()).map_err(|_| MathError::Overflow)?;
        dispute.evidence.push(Evidence {
            submitter,
            uri,
            submitted_at: now,
        });
        DisputeStore::put(host, token, &dispute)?;
        host.emit(EventKind::EvidenceSubmitted {
            dispute: id,
            submitter,
            index,
        });
        tracing::info!(dispute = %id, submitter = %submitter, index, "evidence submitted");
        Ok(())
    })
}

/// Record an arbiter's verdict. A later vote by the same arbiter replaces
/// the earlier one.
pub fn vote_on_dispute<H: Host>(
    host: &mut H,
    id: DisputeId,
    arbiter: Address,
    verdict: Verdict,
) -> Result<()> {
    host.require_auth(&arbiter)?;
    ReentrancyGuard::with_lock(host, LockKey::Dispute(id), |host, token| {
        let mut dispute = DisputeStore::require(host, id)?;
        dispute.expect_open()?;
        if !dispute.arbiters.contains(&arbiter) {
            tracing::warn!(dispute = %id, caller = %arbiter, "vote from non-arbiter rejected");
            return Err(AuthorizationError::NotArbiter {
                caller: arbiter,
                dispute: id,
            }
            .into());
        }
        dispute.votes.insert(arbiter, verdict);
        if dispute.state == DisputeState::Opened {
            dispute.transition(DisputeState::Voting)?;
        }
        DisputeStore::put(host, token, &dispute)?;
        host.emit(EventKind::DisputeVoted {
            dispute: id,
            arbiter,
            verdict,
        });
        tracing::info!(
            dispute = %id,
            arbiter = %arbiter,
            %verdict,
            votes = dispute.vote_count(),
            "dispute vote recorded"
        );
        Ok(())
    })
}

/// Apply the dispute's verdict once quorum with a clear plurality is
/// reached or the resolution deadline has passed.
pub fn execute_dispute_resolution<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    id: DisputeId,
) -> Result<SettlementRecord> {
    ReentrancyGuard::with_lock(host, LockKey::Dispute(id), |host, token| {
        let mut dispute = DisputeStore::require(host, id)?;
        dispute.expect_open()?;
        let verdict = dispute
            .decide(host.timestamp())
            .ok_or(StateError::DisputeNotReady(id))?;
        apply_verdict(host, config, token, &mut dispute, verdict)
    })
}

/// Impose `verdict` on an open dispute regardless of votes or deadline.
pub fn force_resolve_dispute<H: Host>(
    host: &mut H,
    id: DisputeId,
    admin: Address,
    verdict: Verdict,
) -> Result<SettlementRecord> {
    let config = admin::admin_config(host, admin)?;
    ReentrancyGuard::with_lock(host, LockKey::Dispute(id), |host, token| {
        let mut dispute = DisputeStore::require(host, id)?;
        dispute.expect_open()?;
        dispute.forced_by = Some(admin);
        host.emit(EventKind::DisputeForceResolved {
            dispute: id,
            admin,
            verdict,
        });
        tracing::warn!(
            dispute = %id,
            admin = %admin,
            %verdict,
            votes = dispute.vote_count(),
            "dispute force-resolved"
        );
        apply_verdict(host, &config, token, &mut dispute, verdict)
    })
}

/// Settle the disputed transaction per `verdict` and close the dispute.
/// Runs under the dispute lock.
fn apply_verdict<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    dispute_token: &LockToken,
    dispute: &mut Dispute,
    verdict: Verdict,
) -> Result<SettlementRecord> {
    let id = dispute.id;
    let transaction = dispute.transaction;
    let terms: &Dispute = dispute;
    let tx_key = LockKey::Transaction(transaction);
    let record = ReentrancyGuard::with_lock(host, tx_key, |host, tx_lock| {
        let mut tx = TransactionStore::require(host, transaction)?;
        tx.expect_state(TransactionState::Disputed, "DISPUTED")?;
        let record = match tx.kind {
            TransactionKind::Auction { auction, .. } => {
                ReentrancyGuard::with_lock(host, LockKey::Auction(auction), |host, lock| {
                    resolve_auction(host, config, &mut tx, auction, lock, verdict, terms)
                })?
            }
            _ => resolve_escrow(host, config, &mut tx, verdict, terms)?,
        };
        TransactionStore::put(host, tx_lock, &tx)?;
        Ok(record)
    })?;

    dispute.transition(DisputeState::resolved(verdict))?;
    DisputeStore::put(host, dispute_token, dispute)?;
    host.emit(EventKind::DisputeResolved {
        dispute: id,
        transaction,
        verdict,
    });
    tracing::info!(
        dispute = %id,
        tx = %transaction,
        %verdict,
        votes = dispute.vote_count(),
        receipt = %record.receipt_id,
        "dispute resolved"
    );
    Ok(record)
}

fn outcome(verdict: Verdict) -> TransactionState {
    match verdict {
        Verdict::Release => TransactionState::Released,
        Verdict::Refund => TransactionState::Refunded,
        Verdict::Split => TransactionState::Split,
    }
}

/// Sales, bundles and trades.
fn resolve_escrow<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    tx: &mut Transaction,
    verdict: Verdict,
    dispute: &Dispute,
) -> Result<SettlementRecord> {
    let accepted_trade = matches!(tx.kind, TransactionKind::Trade { .. })
        && tx
            .counterparty
            .is_some_and(|c| tx.escrow.iter().any(|h| h.depositor == c));
    let (transfers, distribution) = if verdict == Verdict::Release && accepted_trade {
        swap::swap_trade(host, config, tx)?
    } else {
        let mut escrow = EscrowManager::new(host);
        if verdict == Verdict::Split {
            split_holdings(&mut escrow, tx, dispute.split_seller_bps, |_| true)?;
        }
        escrow.refund_all(tx)?;
        (escrow.into_transfers(), None)
    };
    settlement::finalize(host, tx, outcome(verdict), transfers, distribution)
}

fn resolve_auction<H: Host>(
    host: &mut H,
    config: &MarketConfig,
    tx: &mut Transaction,
    id: AuctionId,
    token: &LockToken,
    verdict: Verdict,
    dispute: &Dispute,
) -> Result<SettlementRecord> {
    let mut record = AuctionStore::require(host, id)?;
    let mut bids = AuctionStore::bids(host, id)?;
    let winner = bids
        .iter()
        .find(|b| {
            verdict == Verdict::Release
                && Some(b.id) == record.leader
                && b.amount.is_some_and(|a| a >= record.reserve)
        })
        .cloned();

    let mut treasury = TreasuryStore::load(host)?;
    let mut escrow = EscrowManager::new(host);
    let distribution = match &winner {
        Some(bid) => Some(auction::pay_winner(
            &mut escrow,
            &mut treasury,
            config,
            &record,
            tx,
            bid,
        )?),
        None => None,
    };
    if verdict == Verdict::Split {
        // Only the leading bid is a party's money; other deposits go home.
        let leader = record.leader;
        split_holdings(&mut escrow, tx, dispute.split_seller_bps, |h| {
            h.role != HolderRole::Bidder || h.bid == leader
        })?;
    }
    escrow.refund_all(tx)?;
    let transfers = escrow.into_transfers();

    for bid in bids.iter_mut().filter(|b| b.status == BidStatus::Active) {
        bid.status = if winner.as_ref().is_some_and(|w| w.id == bid.id) {
            BidStatus::Won
        } else {
            BidStatus::Refunded
        };
        AuctionStore::put_bid(host, token, bid)?;
    }
    let state = match (&winner, verdict) {
        (Some(_), _) => AuctionState::EndedSold,
        (None, Verdict::Release) => AuctionState::EndedUnsold,
        (None, _) => AuctionState::Cancelled,
    };
    record.transition(state)?;
    record.unrevealed = 0;
    AuctionStore::put(host, token, &record)?;
    TreasuryStore::save(host, &treasury)?;
    settlement::finalize(host, tx, outcome(verdict), transfers, distribution)
}

/// Divide every shared fungible holding: `seller_bps` of it to the seller,
/// the rest to the other side. Items and holdings outside `shared` return
/// to their depositor.
fn split_holdings<H: Host>(
    escrow: &mut EscrowManager<'_, H>,
    tx: &mut Transaction,
    seller_bps: u32,
    shared: impl Fn(&EscrowHolding) -> bool,
) -> Result<()> {
    let seller = tx.seller;
    for holding in EscrowManager::<H>::take(tx, |_| true) {
        if tx.is_item(&holding.asset) || !shared(&holding) {
            escrow.refund(&holding)?;
            continue;
        }
        let other = if holding.depositor == seller {
            tx.counterparty.unwrap_or(seller)
        } else {
            holding.depositor
        };
        let to_seller = math::bps_of(holding.asset.amount, seller_bps)?;
        let to_other = math::checked_sub(holding.asset.amount, to_seller)?;
        escrow.pay_out(seller, holding.asset.with_amount(to_seller), TransferPurpose::SplitShare)?;
        escrow.pay_out(other, holding.asset.with_amount(to_other), TransferPurpose::SplitShare)?;
    }
    Ok(())
}
