//! Interfaces to the collaborators the pool depends on but does not own.

use prl_types::{AccountId, Amount, Currency, TicketId};

/// Failure of an external value transfer. Nothing moved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transfer of {amount} {currency} to {to} failed: {reason}")]
pub struct TransferError {
    pub currency: Currency,
    pub to: AccountId,
    pub amount: Amount,
    pub reason: String,
}

/// Answers "who currently owns ticket T".
pub trait OwnershipOracle: Send + Sync {
    /// `None` if the ticket was never issued.
    fn owner_of(&self, ticket: TicketId) -> Option<AccountId>;
}

/// Assigns ticket ids.
///
/// Ids are gapless and sequential from zero, so the number of tickets
/// issued is also the next id to be assigned.
pub trait TicketIssuer: Send + Sync {
    fn issued_count(&self) -> u64;

    /// Assign the next id to `owner`.
    fn next_ticket_id(&self, owner: &AccountId) -> TicketId;
}

/// Moves value out of the pool.
///
/// A transfer either fully succeeds or fully fails. The pool calls this with
/// no lock held, so an implementation may call back into the same pool.
pub trait ValueTransfer: Send + Sync {
    fn transfer(
        &self,
        currency: &Currency,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError>;
}
