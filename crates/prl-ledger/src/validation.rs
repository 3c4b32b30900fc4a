use std::collections::{BTreeMap, HashSet};

use prl_types::{Amount, Currency, DepositId};

use crate::traits::LedgerReader;

/// Result of ledger validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub deposit_count: u64,
    pub claim_count: u64,
    pub sequence_gapless: bool,
    pub snapshots_monotonic: bool,
    pub registry_consistent: bool,
    pub totals_consistent: bool,
    pub redemptions_consistent: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub deposit: Option<DepositId>,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    SequenceGap,
    ZeroSnapshot,
    SnapshotRegression,
    SnapshotAboveClaimCount,
    RegistryMismatch,
    TotalMismatch,
    DanglingRedemption,
    IneligibleRedemption,
    /// Paid out plus dust exceeds what was deposited.
    Overpaid,
}

/// Ledger integrity validator.
pub struct LedgerValidator;

impl LedgerValidator {
    /// Check every structural invariant of the ledger behind `reader`.
    pub fn validate<R: LedgerReader>(reader: &R) -> ValidationReport {
        let deposits = reader.deposits();
        let claim_count = reader.claim_count();
        let mut violations = Vec::new();
        let mut sequence_gapless = true;
        let mut snapshots_monotonic = true;
        let mut registry_consistent = true;
        let mut totals_consistent = true;
        let mut redemptions_consistent = true;

        let mut first_seen: Vec<Currency> = Vec::new();
        let mut seen: HashSet<Currency> = HashSet::new();
        let mut sums: BTreeMap<Currency, Option<Amount>> = BTreeMap::new();
        let mut previous_snapshot = 0u64;

        for (index, deposit) in deposits.iter().enumerate() {
            let expected = DepositId(index as u64);
            if deposit.id != expected {
                sequence_gapless = false;
                violations.push(Violation {
                    deposit: Some(deposit.id),
                    kind: ViolationKind::SequenceGap,
                    description: format!("expected {expected}, found {}", deposit.id),
                });
            }

            let snapshot = deposit.max_tickets_at_deposit;
            if snapshot == 0 {
                snapshots_monotonic = false;
                violations.push(Violation {
                    deposit: Some(deposit.id),
                    kind: ViolationKind::ZeroSnapshot,
                    description: format!("{} snapshotted a zero claim count", deposit.id),
                });
            }
            if snapshot < previous_snapshot {
                snapshots_monotonic = false;
                violations.push(Violation {
                    deposit: Some(deposit.id),
                    kind: ViolationKind::SnapshotRegression,
                    description: format!(
                        "{} snapshot {snapshot} is below earlier snapshot {previous_snapshot}",
                        deposit.id
                    ),
                });
            }
            if snapshot > claim_count {
                snapshots_monotonic = false;
                violations.push(Violation {
                    deposit: Some(deposit.id),
                    kind: ViolationKind::SnapshotAboveClaimCount,
                    description: format!(
                        "{} snapshot {snapshot} exceeds current claim count {claim_count}",
                        deposit.id
                    ),
                });
            }
            previous_snapshot = previous_snapshot.max(snapshot);

            if seen.insert(deposit.currency.clone()) {
                first_seen.push(deposit.currency.clone());
            }
            let sum = sums.entry(deposit.currency.clone()).or_insert(Some(0));
            *sum = sum.and_then(|s| s.checked_add(deposit.amount));
        }

        let registered = reader.currencies();
        if registered != first_seen {
            registry_consistent = false;
            violations.push(Violation {
                deposit: None,
                kind: ViolationKind::RegistryMismatch,
                description: format!(
                    "registry lists {} currencies, deposits introduce {} in a different order",
                    registered.len(),
                    first_seen.len()
                ),
            });
        }

        for (currency, sum) in &sums {
            let recorded = reader.total_deposited(currency);
            if *sum != Some(recorded) {
                totals_consistent = false;
                violations.push(Violation {
                    deposit: None,
                    kind: ViolationKind::TotalMismatch,
                    description: format!(
                        "total for {currency} is {recorded}, deposits sum to {}",
                        sum.map_or_else(|| "an overflowing value".to_string(), |s| s.to_string())
                    ),
                });
            }
        }

        for (ticket, deposit_id) in reader.redemptions() {
            match deposit_id.index().and_then(|i| deposits.get(i)) {
                None => {
                    redemptions_consistent = false;
                    violations.push(Violation {
                        deposit: Some(deposit_id),
                        kind: ViolationKind::DanglingRedemption,
                        description: format!("{ticket} redeemed unknown {deposit_id}"),
                    });
                }
                Some(deposit) if !ticket.is_eligible_under(deposit.max_tickets_at_deposit) => {
                    redemptions_consistent = false;
                    violations.push(Violation {
                        deposit: Some(deposit_id),
                        kind: ViolationKind::IneligibleRedemption,
                        description: format!(
                            "{ticket} redeemed {deposit_id} but was not eligible under snapshot {}",
                            deposit.max_tickets_at_deposit
                        ),
                    });
                }
                Some(_) => {}
            }
        }

        ValidationReport {
            deposit_count: deposits.len() as u64,
            claim_count,
            sequence_gapless,
            snapshots_monotonic,
            registry_consistent,
            totals_consistent,
            redemptions_consistent,
            violations,
        }
    }
}
