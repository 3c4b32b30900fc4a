//! Persistent representation of a ledger.
//!
//! A snapshot carries exactly the state that cannot be derived: the claim
//! count, the deposit records in id order, and the redeemed pairs. The
//! currency registry and running totals are rebuilt on restore.

use prl_types::{DepositId, TicketId};
use serde::{Deserialize, Serialize};

use crate::deposit::Deposit;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub max_tickets: u64,
    pub deposits: Vec<Deposit>,
    pub redemptions: Vec<(TicketId, DepositId)>,
}
