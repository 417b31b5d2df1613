//! Shared settlement steps: paying out a distributed payment and closing a
//! transaction with its receipt.

use marketsettle_host::Host;
use marketsettle_types::{
    Address, Asset, Distribution, FeeConfig, MathError, Result, RoyaltyDistribution,
    SettlementRecord, Transaction, TransactionState, Transfer, TransferPurpose,
};

use crate::escrow::EscrowManager;
use crate::fees;
use crate::royalty;
use crate::storage::Treasury;

/// Distribute `payment` from `source` to the seller, the creators and the
/// platform.
///
/// `source` is the buyer for direct sales or the contract for escrowed
/// bids. The payment is allocated evenly across `policies` (one per item,
/// the last absorbing the remainder) and each allocation is split with its
/// own policy. The fee rate is quoted once for the whole payment against
/// the seller's volume before this settlement. The platform part stays in
/// custody and is credited to the treasury.
pub fn distribute_payment<H: Host>(
    escrow: &mut EscrowManager<'_, H>,
    treasury: &mut Treasury,
    fee: &FeeConfig,
    source: Address,
    seller: Address,
    policies: &[RoyaltyDistribution],
    payment: Asset,
) -> Result<Distribution> {
    let fee_bps = fees::compute_fee(fee, payment.amount, treasury.volume(&seller));
    let allocations = royalty::split_evenly(payment.amount, policies.len())?;
    let contract = escrow.contract();

    let mut total = Distribution {
        fee_bps,
        ..Distribution::default()
    };
    for (policy, allocation) in policies.iter().zip(allocations) {
        let part = royalty::distribute(allocation, policy, fee_bps, fee.royalty_basis)?;
        let parts = [
            (policy.creator, part.creator_amount, TransferPurpose::Royalty),
            (seller, part.seller_amount, TransferPurpose::Proceeds),
            (contract, part.platform_amount, TransferPurpose::PlatformFee),
        ];
        for (to, amount, purpose) in parts {
            escrow.pay(source, to, payment.with_amount(amount), purpose)?;
        }
        total = total.merged(&part).ok_or(MathError::Overflow)?;
    }

    treasury.credit_fee(payment.kind, total.platform_amount)?;
    treasury.record_volume(seller, payment.amount)?;
    tracing::debug!(
        seller = %seller,
        payment = payment.amount,
        creator = total.creator_amount,
        seller_amount = total.seller_amount,
        platform = total.platform_amount,
        "payment distributed"
    );
    Ok(total)
}

/// Move `tx` to its terminal `outcome` and attach the settlement receipt.
///
/// Returns a copy of the receipt.
pub fn finalize<H: Host>(
    host: &mut H,
    tx: &mut Transaction,
    outcome: TransactionState,
    transfers: Vec<Transfer>,
    distribution: Option<Distribution>,
) -> Result<SettlementRecord> {
    tx.transition(outcome)?;
    let sequence = host.next_sequence();
    let record = SettlementRecord::new(
        tx.id,
        outcome,
        transfers,
        distribution,
        host.timestamp(),
        sequence,
    );
    tx.settlement = Some(record.clone());
    Ok(record)
}
