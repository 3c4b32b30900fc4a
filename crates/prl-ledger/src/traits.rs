use prl_types::{Amount, Currency, DepositId, TicketId};

use crate::deposit::Deposit;

/// Read boundary for ledger queries and validation.
///
/// Every method observes one consistent state; implementations backed by a
/// lock take it once per call.
pub trait LedgerReader {
    fn claim_count(&self) -> u64;

    /// All deposits in id order.
    fn deposits(&self) -> Vec<Deposit>;

    /// Registered currencies in first-seen order.
    fn currencies(&self) -> Vec<Currency>;

    fn total_deposited(&self, currency: &Currency) -> Amount;

    /// Every redeemed pair, sorted by ticket then deposit.
    fn redemptions(&self) -> Vec<(TicketId, DepositId)>;
}
