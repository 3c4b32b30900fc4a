use prl_types::{Amount, Currency, DepositId, TicketId};

use crate::claims::ClaimRegistry;
use crate::currency::CurrencyRegistry;
use crate::deposit::{Deposit, DepositLedger, DepositRequest};
use crate::error::LedgerError;
use crate::redemption::RedemptionIndex;
use crate::snapshot::{LedgerSnapshot, SNAPSHOT_VERSION};
use crate::traits::LedgerReader;
use crate::validation::LedgerValidator;

/// The four ledger components of one pool, mutated together.
///
/// `Ledger` does no locking of its own. The owner serializes every `&mut`
/// call so that claim growth, deposit appends, and redemption flags are
/// linearized.
#[derive(Clone, Debug)]
pub struct Ledger {
    claims: ClaimRegistry,
    currencies: CurrencyRegistry,
    deposits: DepositLedger,
    redemptions: RedemptionIndex,
}

impl Ledger {
    /// Create an empty ledger seeded with `initial_max_tickets`.
    pub fn new(initial_max_tickets: u64) -> Result<Self, LedgerError> {
        Ok(Self {
            claims: ClaimRegistry::new(initial_max_tickets)?,
            currencies: CurrencyRegistry::new(),
            deposits: DepositLedger::new(),
            redemptions: RedemptionIndex::new(),
        })
    }

    pub fn record_deposit(
        &mut self,
        request: DepositRequest,
        tickets_issued: u64,
    ) -> Result<DepositId, LedgerError> {
        self.deposits
            .record(request, &self.claims, &mut self.currencies, tickets_issued)
    }

    pub fn grow_claim_count(&mut self, new_value: u64) -> Result<(), LedgerError> {
        self.claims.grow(new_value)
    }

    /// Flag `(ticket, deposit)` as paid. Returns `false` if it already was.
    pub fn mark_redeemed(
        &mut self,
        ticket: TicketId,
        deposit: DepositId,
    ) -> Result<bool, LedgerError> {
        self.deposits.get(deposit)?;
        Ok(self.redemptions.mark_redeemed(ticket, deposit))
    }

    /// Clear a flag set by [`Ledger::mark_redeemed`] whose payout never
    /// happened. Returns `false` if the pair was not flagged.
    pub fn clear_redemption(&mut self, ticket: TicketId, deposit: DepositId) -> bool {
        self.redemptions.clear(ticket, deposit)
    }

    pub fn claims(&self) -> &ClaimRegistry {
        &self.claims
    }

    pub fn currency_registry(&self) -> &CurrencyRegistry {
        &self.currencies
    }

    pub fn deposit_log(&self) -> &DepositLedger {
        &self.deposits
    }

    pub fn redemption_index(&self) -> &RedemptionIndex {
        &self.redemptions
    }

    /// Capture the persistent state of the ledger.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            max_tickets: self.claims.current(),
            deposits: self.deposits.all().to_vec(),
            redemptions: self.redemptions.pairs(),
        }
    }

    /// Rebuild a ledger from a snapshot.
    ///
    /// The currency registry and running totals are derived from the
    /// deposits. The result must pass [`LedgerValidator`], otherwise the
    /// snapshot is rejected.
    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(LedgerError::InvalidSnapshot(format!(
                "unsupported version {}",
                snapshot.version
            )));
        }

        let claims = ClaimRegistry::new(snapshot.max_tickets)?;
        let mut currencies = CurrencyRegistry::new();
        let deposits = DepositLedger::from_records(snapshot.deposits, &mut currencies)?;
        let mut redemptions = RedemptionIndex::new();
        for (ticket, deposit) in snapshot.redemptions {
            if !redemptions.mark_redeemed(ticket, deposit) {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "duplicate redemption for {ticket} on {deposit}"
                )));
            }
        }

        let ledger = Self {
            claims,
            currencies,
            deposits,
            redemptions,
        };

        let report = LedgerValidator::validate(&ledger);
        if let Some(first) = report.violations.first() {
            return Err(LedgerError::InvalidSnapshot(format!(
                "{} violation(s), first: {}",
                report.violations.len(),
                first.description
            )));
        }

        tracing::info!(
            deposits = ledger.deposits.len(),
            redemptions = ledger.redemptions.len(),
            max_tickets = ledger.claims.current(),
            "ledger restored from snapshot"
        );
        Ok(ledger)
    }
}

impl LedgerReader for Ledger {
    fn claim_count(&self) -> u64 {
        self.claims.current()
    }

    fn deposits(&self) -> Vec<Deposit> {
        self.deposits.all().to_vec()
    }

    fn currencies(&self) -> Vec<Currency> {
        self.currencies.list().to_vec()
    }

    fn total_deposited(&self, currency: &Currency) -> Amount {
        self.deposits.total_deposited(currency)
    }

    fn redemptions(&self) -> Vec<(TicketId, DepositId)> {
        self.redemptions.pairs()
    }
}
