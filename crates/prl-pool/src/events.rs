use std::fmt;

use prl_types::{AccountId, Amount, Currency, DepositId, TicketId, Timestamp};
use serde::{Deserialize, Serialize};

/// What happened, with the data needed to audit it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolEventKind {
    TicketIssued {
        ticket: TicketId,
        owner: AccountId,
    },
    DepositRecorded {
        deposit: DepositId,
        currency: Currency,
        amount: Amount,
        max_tickets_at_deposit: u64,
        depositor: AccountId,
    },
    Withdrawn {
        ticket: TicketId,
        deposit: DepositId,
        currency: Currency,
        amount: Amount,
        to: AccountId,
    },
    ClaimCountGrown {
        from: u64,
        to: u64,
    },
    FundraisingClosed,
    DustSwept {
        currency: Currency,
        amount: Amount,
        to: AccountId,
    },
}

impl PoolEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TicketIssued { .. } => "TicketIssued",
            Self::DepositRecorded { .. } => "DepositRecorded",
            Self::Withdrawn { .. } => "Withdrawn",
            Self::ClaimCountGrown { .. } => "ClaimCountGrown",
            Self::FundraisingClosed => "FundraisingClosed",
            Self::DustSwept { .. } => "DustSwept",
        }
    }
}

/// One entry of the pool's audit journal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEvent {
    /// Position in the journal, from zero, gapless.
    pub seq: u64,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub kind: PoolEventKind,
}

impl fmt::Display for PoolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.seq, self.kind.name())?;
        match &self.kind {
            PoolEventKind::TicketIssued { ticket, owner } => write!(f, " {ticket} -> {owner}"),
            PoolEventKind::DepositRecorded {
                deposit,
                currency,
                amount,
                max_tickets_at_deposit,
                ..
            } => write!(
                f,
                " {deposit} {amount} {currency} over {max_tickets_at_deposit} claims"
            ),
            PoolEventKind::Withdrawn {
                ticket,
                deposit,
                currency,
                amount,
                ..
            } => write!(f, " {ticket} {amount} {currency} from {deposit}"),
            PoolEventKind::ClaimCountGrown { from, to } => write!(f, " {from} -> {to}"),
            PoolEventKind::FundraisingClosed => Ok(()),
            PoolEventKind::DustSwept {
                currency,
                amount,
                to,
            } => write!(f, " {amount} {currency} -> {to}"),
        }
    }
}

/// Append-only, sequenced event list.
#[derive(Clone, Debug, Default)]
pub(crate) struct Journal {
    events: Vec<PoolEvent>,
}

impl Journal {
    pub(crate) fn push(&mut self, kind: PoolEventKind) {
        let seq = self.events.len() as u64;
        let timestamp = Timestamp::now_after(self.events.last().map(|e| e.timestamp));
        self.events.push(PoolEvent {
            seq,
            timestamp,
            kind,
        });
    }

    pub(crate) fn all(&self) -> &[PoolEvent] {
        &self.events
    }
}
