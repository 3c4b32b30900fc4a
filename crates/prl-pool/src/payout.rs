//! Entitlement computation and the withdraw scan.

use prl_ledger::{Deposit, Ledger, LedgerError};
use prl_types::{AccountId, Amount, Currency, DepositId, TicketId};
use serde::{Deserialize, Serialize};

use crate::collab::{TransferError, ValueTransfer};

/// One transfer made (or owed) to a ticket for one deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub deposit: DepositId,
    pub currency: Currency,
    pub amount: Amount,
}

/// A ticket's position in one deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProratedEntry {
    pub deposit: DepositId,
    pub redeemed: bool,
    pub currency: Currency,
    /// The ticket's share, zero when the ticket is not eligible.
    pub amount: Amount,
    pub claim_count_at_deposit: u64,
}

/// Result of settling reserved payouts.
///
/// Every entry in `paid` was transferred. If a transfer failed, settling
/// stopped there: `failure` says where and `unpaid` holds the failed payout
/// and every one after it, still reserved.
#[derive(Debug, Default)]
pub struct WithdrawOutcome {
    pub paid: Vec<Payout>,
    pub unpaid: Vec<Payout>,
    pub failure: Option<(DepositId, TransferError)>,
}

/// Stateless payout rules over a [`Ledger`].
pub struct PayoutEngine;

impl PayoutEngine {
    /// Floor-divided share of `deposit` still owed to `ticket`.
    ///
    /// Zero if the ticket's id is not below the deposit's snapshot, or if the
    /// pair is already redeemed.
    pub fn entitlement(ledger: &Ledger, ticket: TicketId, deposit: &Deposit) -> Amount {
        if !ticket.is_eligible_under(deposit.max_tickets_at_deposit) {
            return 0;
        }
        if ledger.redemption_index().is_redeemed(ticket, deposit.id) {
            return 0;
        }
        deposit.share()
    }

    /// Nonzero entitlements of `ticket`, in deposit order.
    pub fn pending(ledger: &Ledger, ticket: TicketId) -> Vec<Payout> {
        ledger
            .deposit_log()
            .all()
            .iter()
            .filter_map(|deposit| {
                let amount = Self::entitlement(ledger, ticket, deposit);
                (amount > 0).then(|| Payout {
                    deposit: deposit.id,
                    currency: deposit.currency.clone(),
                    amount,
                })
            })
            .collect()
    }

    pub fn prorated_view(ledger: &Ledger, ticket: TicketId) -> Vec<ProratedEntry> {
        ledger
            .deposit_log()
            .all()
            .iter()
            .map(|deposit| {
                let eligible = ticket.is_eligible_under(deposit.max_tickets_at_deposit);
                ProratedEntry {
                    deposit: deposit.id,
                    redeemed: ledger.redemption_index().is_redeemed(ticket, deposit.id),
                    currency: deposit.currency.clone(),
                    amount: if eligible { deposit.share() } else { 0 },
                    claim_count_at_deposit: deposit.max_tickets_at_deposit,
                }
            })
            .collect()
    }

    /// Flag every pending entitlement of `ticket` as redeemed and return
    /// them, in deposit order.
    ///
    /// A reserved pair reads as redeemed, so no other scan can pay it while
    /// its transfer is in flight. Reservations that are not paid must be
    /// handed back through [`PayoutEngine::release`].
    pub fn reserve(ledger: &mut Ledger, ticket: TicketId) -> Result<Vec<Payout>, LedgerError> {
        let pending = Self::pending(ledger, ticket);
        for payout in &pending {
            ledger.mark_redeemed(ticket, payout.deposit)?;
        }
        Ok(pending)
    }

    /// Transfer reserved payouts to `to` in order, stopping at the first
    /// failure. Needs no access to the ledger.
    pub fn settle(
        ticket: TicketId,
        payouts: Vec<Payout>,
        to: &AccountId,
        transfer: &dyn ValueTransfer,
    ) -> WithdrawOutcome {
        let mut outcome = WithdrawOutcome::default();
        let mut payouts = payouts.into_iter();

        for payout in payouts.by_ref() {
            if let Err(err) = transfer.transfer(&payout.currency, to, payout.amount) {
                tracing::warn!(
                    %ticket,
                    deposit = %payout.deposit,
                    error = %err,
                    "payout transfer failed; scan aborted"
                );
                outcome.failure = Some((payout.deposit, err));
                outcome.unpaid.push(payout);
                break;
            }
            tracing::debug!(
                %ticket,
                deposit = %payout.deposit,
                currency = %payout.currency,
                amount = %payout.amount,
                "deposit share paid"
            );
            outcome.paid.push(payout);
        }

        outcome.unpaid.extend(payouts);
        outcome
    }

    /// Clear the reservations of payouts that were never transferred.
    pub fn release(ledger: &mut Ledger, ticket: TicketId, unpaid: &[Payout]) {
        for payout in unpaid {
            ledger.clear_redemption(ticket, payout.deposit);
        }
    }
}
