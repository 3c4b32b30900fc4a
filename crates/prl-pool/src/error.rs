use prl_types::{AccountId, DepositId, TicketId};
use thiserror::Error;

use crate::collab::TransferError;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("ledger error: {0}")]
    Ledger(#[from] prl_ledger::LedgerError),

    #[error("gate error: {0}")]
    Gate(#[from] prl_gate::GateError),

    #[error("{caller} does not own {ticket}")]
    NotOwner { ticket: TicketId, caller: AccountId },

    #[error("{0} was never issued")]
    NotIssued(TicketId),

    #[error("no deposits have been recorded")]
    NoDeposits,

    #[error("deposit amount must be positive")]
    ZeroAmount,

    #[error("ticket capacity exhausted: all {max_tickets} claims are issued")]
    CapacityExceeded { max_tickets: u64 },

    #[error("payout for {deposit:?} aborted: {source}")]
    TransferFailed {
        deposit: Option<DepositId>,
        #[source]
        source: TransferError,
    },

    #[error("dust sweeping is disabled for this pool")]
    DustSweepDisabled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pool state lock poisoned")]
    Poisoned,
}

pub type PoolResult<T> = Result<T, PoolError>;
