//! Per-(ticket, deposit) redeemed flags.

use std::collections::{BTreeSet, HashMap};

use prl_types::{DepositId, TicketId};

/// Records which deposits each ticket has already been paid.
///
/// A pair absent from the index is unredeemed. A flag is cleared only to
/// roll back a payout whose transfer failed.
#[derive(Clone, Debug, Default)]
pub struct RedemptionIndex {
    redeemed: HashMap<TicketId, BTreeSet<DepositId>>,
    count: usize,
}

impl RedemptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_redeemed(&self, ticket: TicketId, deposit: DepositId) -> bool {
        self.redeemed
            .get(&ticket)
            .is_some_and(|set| set.contains(&deposit))
    }

    /// Set the flag. Returns `false` if the pair was already redeemed.
    pub fn mark_redeemed(&mut self, ticket: TicketId, deposit: DepositId) -> bool {
        let inserted = self.redeemed.entry(ticket).or_default().insert(deposit);
        if inserted {
            self.count += 1;
        }
        inserted
    }

    /// Clear the flag. Returns `false` if the pair was not redeemed.
    pub fn clear(&mut self, ticket: TicketId, deposit: DepositId) -> bool {
        let Some(set) = self.redeemed.get_mut(&ticket) else {
            return false;
        };
        let removed = set.remove(&deposit);
        if set.is_empty() {
            self.redeemed.remove(&ticket);
        }
        if removed {
            self.count -= 1;
        }
        removed
    }

    /// Every redeemed pair, sorted by ticket then deposit.
    pub fn pairs(&self) -> Vec<(TicketId, DepositId)> {
        let mut pairs: Vec<_> = self
            .redeemed
            .iter()
            .flat_map(|(ticket, deposits)| deposits.iter().map(move |d| (*ticket, *d)))
            .collect();
        pairs.sort();
        pairs
    }

    /// Number of redeemed pairs.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
