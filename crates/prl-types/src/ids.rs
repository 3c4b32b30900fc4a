use std::fmt;

use serde::{Deserialize, Serialize};

/// Unsigned accounting unit. All arithmetic on amounts is checked.
pub type Amount = u128;

/// Sequential, gapless claim-token number assigned at issuance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub u64);

impl TicketId {
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Position of this ticket in an id-indexed table; `None` if the id does
    /// not fit in `usize` on this target.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    /// Whether this ticket shares in a deposit that snapshotted `claim_count`.
    pub const fn is_eligible_under(self, claim_count: u64) -> bool {
        self.0 < claim_count
    }
}

impl fmt::Debug for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TicketId({})", self.0)
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ticket#{}", self.0)
    }
}

impl From<u64> for TicketId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Sequential, gapless deposit number; also the deposit's index in the log.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepositId(pub u64);

impl DepositId {
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Position of this deposit in an append-only log; `None` if the id does
    /// not fit in `usize` on this target.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Debug for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DepositId({})", self.0)
    }
}

impl fmt::Display for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deposit#{}", self.0)
    }
}

impl From<u64> for DepositId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
