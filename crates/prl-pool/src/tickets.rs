//! In-memory ticket book: issuer and ownership oracle in one.

use std::sync::RwLock;

use prl_types::{AccountId, TicketId};

use crate::collab::{OwnershipOracle, TicketIssuer};

/// Owners indexed by ticket id.
#[derive(Debug, Default)]
pub struct TicketBook {
    owners: RwLock<Vec<AccountId>>,
}

impl TicketBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand `ticket` to a new owner. Returns `false` for unknown tickets.
    pub fn reassign(&self, ticket: TicketId, to: AccountId) -> bool {
        let mut owners = self.owners.write().unwrap_or_else(|e| e.into_inner());
        match ticket.index().and_then(|i| owners.get_mut(i)) {
            Some(slot) => {
                tracing::debug!(%ticket, from = %slot, %to, "ticket reassigned");
                *slot = to;
                true
            }
            None => false,
        }
    }
}

impl TicketIssuer for TicketBook {
    fn issued_count(&self) -> u64 {
        self.owners.read().unwrap_or_else(|e| e.into_inner()).len() as u64
    }

    fn next_ticket_id(&self, owner: &AccountId) -> TicketId {
        let mut owners = self.owners.write().unwrap_or_else(|e| e.into_inner());
        let id = TicketId(owners.len() as u64);
        owners.push(owner.clone());
        id
    }
}

impl OwnershipOracle for TicketBook {
    fn owner_of(&self, ticket: TicketId) -> Option<AccountId> {
        let owners = self.owners.read().unwrap_or_else(|e| e.into_inner());
        ticket.index().and_then(|i| owners.get(i)).cloned()
    }
}
