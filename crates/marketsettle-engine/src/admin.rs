//! Administrator operations: configuration writes, platform fee
//! withdrawal and emergency withdrawal.
//!
//! Every entry point checks the caller against `MarketConfig::admin` before
//! touching state.

use marketsettle_host::Host;
use marketsettle_types::{
    Address, Asset, AuctionConfig, AuctionState, AuthorizationError, BidStatus, DisputeConfig,
    EventKind, FeeConfig, LockKey, MarketConfig, Result, SettlementRecord, StateError,
    TransactionId, TransactionKind, TransactionState,
};

use crate::escrow::EscrowManager;
use crate::security::ReentrancyGuard;
use crate::settlement;
use crate::storage::{AuctionStore, ConfigStore, TransactionStore, TreasuryStore};

/// Load the configuration and check that `caller` administers it.
pub(crate) fn admin_config<H: Host>(host: &mut H, caller: Address) -> Result<MarketConfig> {
    host.require_auth(&caller)?;
    let config = ConfigStore::load(host)?;
    if config.admin != caller {
        tracing::warn!(caller = %caller, "admin operation rejected");
        return Err(AuthorizationError::NotAdmin { caller }.into());
    }
    Ok(config)
}

pub fn update_fee_config<H: Host>(host: &mut H, admin: Address, fee: FeeConfig) -> Result<()> {
    let mut config = admin_config(host, admin)?;
    fee.validate()?;
    config.fee = FeeConfig {
        updated_by: Some(admin),
        updated_at: host.timestamp(),
        ..fee
    };
    ConfigStore::save(host, &config)?;
    host.emit(EventKind::FeeConfigUpdated {
        admin,
        base_fee_bps: config.fee.base_fee_bps,
    });
    tracing::info!(
        admin = %admin,
        schedule = ?config.fee.schedule,
        base_fee_bps = config.fee.base_fee_bps,
        tiers = config.fee.tiers.len(),
        "fee config updated"
    );
    Ok(())
}

pub fn update_auction_config<H: Host>(
    host: &mut H,
    admin: Address,
    auction: AuctionConfig,
) -> Result<()> {
    let mut config = admin_config(host, admin)?;
    auction.validate()?;
    config.auction = auction;
    ConfigStore::save(host, &config)?;
    host.emit(EventKind::AuctionConfigUpdated { admin });
    tracing::info!(admin = %admin, "auction config updated");
    Ok(())
}

/// Replace the arbiter set and voting rules. Disputes already open keep
/// the rules they were opened with.
pub fn update_dispute_config<H: Host>(
    host: &mut H,
    admin: Address,
    dispute: DisputeConfig,
) -> Result<()> {
    let mut config = admin_config(host, admin)?;
    dispute.validate()?;
    let quorum = dispute.quorum;
    config.dispute = dispute;
    ConfigStore::save(host, &config)?;
    host.emit(EventKind::DisputeConfigUpdated { admin, quorum });
    tracing::info!(
        admin = %admin,
        quorum,
        arbiters = config.dispute.arbiters.len(),
        "dispute config updated"
    );
    Ok(())
}

pub fn set_emergency_withdrawal<H: Host>(
    host: &mut H,
    admin: Address,
    enabled: bool,
) -> Result<()> {
    let mut config = admin_config(host, admin)?;
    config.emergency_withdrawal_enabled = enabled;
    ConfigStore::save(host, &config)?;
    host.emit(EventKind::EmergencyWithdrawalToggled { admin, enabled });
    tracing::warn!(admin = %admin, enabled, "emergency withdrawal toggled");
    Ok(())
}

/// Pay accumulated platform fees of one asset kind out to the admin.
pub fn withdraw_platform_fees<H: Host>(host: &mut H, admin: Address, amount: Asset) -> Result<()> {
    admin_config(host, admin)?;
    amount.validate()?;
    let mut treasury = TreasuryStore::load(host)?;
    treasury.debit_fee(amount.kind, amount.amount)?;
    let contract = host.contract_address();
    host.transfer(&contract, &admin, &amount)?;
    TreasuryStore::save(host, &treasury)?;
    host.emit(EventKind::PlatformFeesWithdrawn { admin, amount });
    tracing::info!(
        admin = %admin,
        %amount,
        remaining = treasury.fee_balance(&amount.kind),
        "platform fees withdrawn"
    );
    Ok(())
}

/// Return every escrow holding of `transaction` to its depositor and close
/// it as `Withdrawn`. Refused while a dispute is open on it.
pub fn emergency_withdraw<H: Host>(
    host: &mut H,
    admin: Address,
    transaction: TransactionId,
) -> Result<SettlementRecord> {
    let config = admin_config(host, admin)?;
    if !config.emergency_withdrawal_enabled {
        return Err(StateError::EmergencyWithdrawalDisabled.into());
    }
    ReentrancyGuard::with_lock(host, LockKey::Transaction(transaction), |host, tx_token| {
        let mut tx = TransactionStore::require(host, transaction)?;
        if tx.state == TransactionState::Disputed {
            return Err(StateError::Disputed(transaction).into());
        }
        if !tx.state.holds_escrow() {
            return Err(StateError::WrongTransactionState {
                transaction,
                expected: "CREATED or ACCEPTED",
                actual: tx.state.to_string(),
            }
            .into());
        }

        let mut escrow = EscrowManager::new(host);
        let holdings = escrow.refund_all(&mut tx)?;
        let transfers = escrow.into_transfers();
        if let TransactionKind::Auction { auction, .. } = tx.kind {
            ReentrancyGuard::with_lock(host, LockKey::Auction(auction), |host, token| {
                let mut record = AuctionStore::require(host, auction)?;
                for mut bid in AuctionStore::bids(host, auction)? {
                    if bid.status == BidStatus::Active {
                        bid.status = BidStatus::Refunded;
                        AuctionStore::put_bid(host, token, &bid)?;
                    }
                }
                record.unrevealed = 0;
                record.transition(AuctionState::Cancelled)?;
                AuctionStore::put(host, token, &record)
            })?;
        }
        let record =
            settlement::finalize(host, &mut tx, TransactionState::Withdrawn, transfers, None)?;
        TransactionStore::put(host, tx_token, &tx)?;
        host.emit(EventKind::EmergencyWithdrawal {
            admin,
            transaction,
            holdings: u32::try_from(holdings).unwrap_or(u32::MAX),
        });
        tracing::warn!(
            admin = %admin,
            tx = %transaction,
            holdings,
            "emergency withdrawal executed"
        );
        Ok(record)
    })
}
