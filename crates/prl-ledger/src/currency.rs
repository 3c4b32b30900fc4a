//! Insertion-ordered registry of every currency that has received a deposit.

use std::collections::HashSet;

use prl_types::Currency;

/// Ordered, append-once set of currencies.
///
/// Currencies are discovered lazily by the first deposit in them. The order
/// returned by [`list`](Self::list) is first-seen order and never changes
/// except by appending.
#[derive(Clone, Debug, Default)]
pub struct CurrencyRegistry {
    order: Vec<Currency>,
    seen: HashSet<Currency>,
}

impl CurrencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `currency` if absent. Returns `true` if it was newly registered.
    pub fn register(&mut self, currency: &Currency) -> bool {
        if self.seen.contains(currency) {
            return false;
        }
        self.seen.insert(currency.clone());
        self.order.push(currency.clone());
        tracing::debug!(%currency, position = self.order.len() - 1, "currency registered");
        true
    }

    pub fn contains(&self, currency: &Currency) -> bool {
        self.seen.contains(currency)
    }

    /// Currencies in first-seen order.
    pub fn list(&self) -> &[Currency] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
