//! The claim-count denominator (`maxTickets`).

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Current claim count with strictly increasing growth.
///
/// Deposits copy [`current`](Self::current) at record time, so growth only
/// ever affects deposits recorded afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRegistry {
    max_tickets: u64,
}

impl ClaimRegistry {
    /// Seed the registry. The seed must be positive.
    pub fn new(seed: u64) -> Result<Self, LedgerError> {
        if seed == 0 {
            return Err(LedgerError::InvalidSeed);
        }
        Ok(Self { max_tickets: seed })
    }

    pub fn current(&self) -> u64 {
        self.max_tickets
    }

    /// Replace the claim count with `new_value`, which must exceed the current one.
    ///
    /// On failure the current value is left unchanged.
    pub fn grow(&mut self, new_value: u64) -> Result<(), LedgerError> {
        if new_value <= self.max_tickets {
            return Err(LedgerError::InvalidGrowth {
                current: self.max_tickets,
                requested: new_value,
            });
        }
        tracing::debug!(from = self.max_tickets, to = new_value, "claim count grown");
        self.max_tickets = new_value;
        Ok(())
    }
}
