//! Persistent representation of a whole pool.
//!
//! The ledger snapshot plus the state the pool keeps beside it: the
//! fundraising phase and the per-currency paid and swept totals. Events are
//! not persisted; a restored pool starts with an empty journal.

use std::collections::BTreeMap;

use prl_gate::FundraisingState;
use prl_ledger::{LedgerError, LedgerSnapshot};
use prl_types::{Amount, Currency};
use serde::{Deserialize, Serialize};

use crate::error::PoolResult;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub ledger: LedgerSnapshot,
    pub fundraising: FundraisingState,
    pub paid: BTreeMap<Currency, Amount>,
    pub swept: BTreeMap<Currency, Amount>,
}

impl PoolSnapshot {
    /// Encode with bincode.
    pub fn to_bytes(&self) -> PoolResult<Vec<u8>> {
        Ok(bincode::serialize(self).map_err(LedgerError::from)?)
    }

    /// Decode from bincode. The result is not validated; use
    /// [`Pool::restore`](crate::Pool::restore) for that.
    pub fn from_bytes(bytes: &[u8]) -> PoolResult<Self> {
        Ok(bincode::deserialize(bytes).map_err(LedgerError::from)?)
    }
}
