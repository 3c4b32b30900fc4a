//! In-memory value transfer with balances and failure injection.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use prl_types::{AccountId, Amount, Currency};

use crate::collab::{TransferError, ValueTransfer};

#[derive(Debug, Default)]
struct VaultState {
    balances: BTreeMap<(AccountId, Currency), Amount>,
    failing: HashSet<Currency>,
    transfers: u64,
}

/// Credits recipients in memory.
///
/// Transfers in a currency marked with [`fail_currency`](Self::fail_currency)
/// are refused until [`heal_currency`](Self::heal_currency) is called.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    state: Mutex<VaultState>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: &AccountId, currency: &Currency) -> Amount {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .balances
            .get(&(account.clone(), currency.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of everything transferred out in `currency`.
    pub fn total_out(&self, currency: &Currency) -> Amount {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .balances
            .iter()
            .filter(|((_, c), _)| c == currency)
            .map(|(_, amount)| *amount)
            .sum()
    }

    /// Number of successful transfers.
    pub fn transfer_count(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).transfers
    }

    pub fn fail_currency(&self, currency: Currency) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .failing
            .insert(currency);
    }

    pub fn heal_currency(&self, currency: &Currency) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .failing
            .remove(currency);
    }
}

impl ValueTransfer for InMemoryVault {
    fn transfer(
        &self,
        currency: &Currency,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.failing.contains(currency) {
            return Err(TransferError {
                currency: currency.clone(),
                to: to.clone(),
                amount,
                reason: "currency transfers are failing".into(),
            });
        }

        let balance = state
            .balances
            .entry((to.clone(), currency.clone()))
            .or_insert(0);
        *balance = balance.checked_add(amount).ok_or_else(|| TransferError {
            currency: currency.clone(),
            to: to.clone(),
            amount,
            reason: "recipient balance would overflow".into(),
        })?;
        state.transfers += 1;
        Ok(())
    }
}
