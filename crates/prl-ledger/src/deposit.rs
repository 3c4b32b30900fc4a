//! Append-only deposit log with per-deposit claim-count snapshots.

use std::collections::BTreeMap;

use prl_types::{AccountId, Amount, Currency, DepositId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::claims::ClaimRegistry;
use crate::currency::CurrencyRegistry;
use crate::error::LedgerError;

/// A request to record one deposit in exactly one currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub amount: Amount,
    pub currency: Currency,
    pub depositor: AccountId,
}

impl DepositRequest {
    pub fn new(amount: Amount, currency: Currency, depositor: AccountId) -> Self {
        Self {
            amount,
            currency,
            depositor,
        }
    }
}

/// An immutable ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: DepositId,
    pub amount: Amount,
    pub currency: Currency,
    /// Claim count in effect when the deposit was recorded.
    pub max_tickets_at_deposit: u64,
    pub depositor: AccountId,
    pub timestamp: Timestamp,
}

impl Deposit {
    /// The floor-divided share owed to each eligible ticket.
    pub fn share(&self) -> Amount {
        self.amount
            .checked_div(Amount::from(self.max_tickets_at_deposit))
            .unwrap_or(0)
    }

    /// The remainder that floor division leaves undistributed.
    pub fn dust(&self) -> Amount {
        self.amount
            .checked_rem(Amount::from(self.max_tickets_at_deposit))
            .unwrap_or(self.amount)
    }
}

/// Arena-style append log: `deposits[i].id == DepositId(i)` always holds.
#[derive(Clone, Debug, Default)]
pub struct DepositLedger {
    deposits: Vec<Deposit>,
    totals: BTreeMap<Currency, Amount>,
}

impl DepositLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deposit against the current claim count.
    ///
    /// Fails with [`LedgerError::ZeroShares`] while no ticket has been issued,
    /// and with [`LedgerError::Overflow`] if the currency total would wrap.
    /// Nothing is mutated on failure.
    pub fn record(
        &mut self,
        request: DepositRequest,
        claims: &ClaimRegistry,
        currencies: &mut CurrencyRegistry,
        tickets_issued: u64,
    ) -> Result<DepositId, LedgerError> {
        if tickets_issued == 0 {
            return Err(LedgerError::ZeroShares);
        }

        let running = self.total_deposited(&request.currency);
        let new_total = running
            .checked_add(request.amount)
            .ok_or_else(|| LedgerError::Overflow {
                currency: request.currency.clone(),
            })?;

        let id = DepositId(self.deposits.len() as u64);
        let timestamp = Timestamp::now_after(self.deposits.last().map(|d| d.timestamp));
        currencies.register(&request.currency);
        self.totals.insert(request.currency.clone(), new_total);
        self.deposits.push(Deposit {
            id,
            amount: request.amount,
            currency: request.currency,
            max_tickets_at_deposit: claims.current(),
            depositor: request.depositor,
            timestamp,
        });
        Ok(id)
    }

    pub fn get(&self, id: DepositId) -> Result<&Deposit, LedgerError> {
        id.index()
            .and_then(|i| self.deposits.get(i))
            .ok_or(LedgerError::NotFound(id))
    }

    /// All deposits in id order.
    pub fn all(&self) -> &[Deposit] {
        &self.deposits
    }

    pub fn len(&self) -> usize {
        self.deposits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty()
    }

    /// Running total for `currency`; zero for currencies never deposited.
    pub fn total_deposited(&self, currency: &Currency) -> Amount {
        self.totals.get(currency).copied().unwrap_or(0)
    }

    pub fn totals(&self) -> &BTreeMap<Currency, Amount> {
        &self.totals
    }

    /// Rebuild a log from already-validated records.
    pub(crate) fn from_records(
        deposits: Vec<Deposit>,
        currencies: &mut CurrencyRegistry,
    ) -> Result<Self, LedgerError> {
        let mut totals: BTreeMap<Currency, Amount> = BTreeMap::new();
        for deposit in &deposits {
            currencies.register(&deposit.currency);
            let entry = totals.entry(deposit.currency.clone()).or_insert(0);
            *entry = entry
                .checked_add(deposit.amount)
                .ok_or_else(|| LedgerError::Overflow {
                    currency: deposit.currency.clone(),
                })?;
        }
        Ok(Self { deposits, totals })
    }
}
