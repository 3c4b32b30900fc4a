use prl_types::{Currency, DepositId};

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid claim-count growth: {requested} must exceed current {current}")]
    InvalidGrowth { current: u64, requested: u64 },

    #[error("claim count must start above zero")]
    InvalidSeed,

    #[error("no tickets have been issued; a deposit has no shares to credit")]
    ZeroShares,

    #[error("deposit not found: {0}")]
    NotFound(DepositId),

    #[error("arithmetic overflow in {currency} totals")]
    Overflow { currency: Currency },

    #[error("snapshot rejected: {0}")]
    InvalidSnapshot(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
