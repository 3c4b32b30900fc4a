use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use prl_gate::{Action, Authorizer, FundraisingGate, FundraisingState};
use prl_ledger::{
    Deposit, DepositRequest, Ledger, LedgerError, LedgerValidator, ValidationReport, Violation,
    ViolationKind,
};
use prl_types::{AccountId, Amount, Currency, DepositId, TicketId};

use crate::collab::{OwnershipOracle, TicketIssuer, ValueTransfer};
use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::events::{Journal, PoolEvent, PoolEventKind};
use crate::payout::{Payout, PayoutEngine, ProratedEntry};
use crate::snapshot::PoolSnapshot;
use crate::tickets::TicketBook;
use crate::vault::InMemoryVault;

/// The external capabilities a pool is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub issuer: Arc<dyn TicketIssuer>,
    pub owners: Arc<dyn OwnershipOracle>,
    pub transfer: Arc<dyn ValueTransfer>,
    pub authorizer: Arc<dyn Authorizer>,
}

impl Collaborators {
    /// Wire a [`TicketBook`] as both issuer and oracle, and an
    /// [`InMemoryVault`] as the value transfer.
    pub fn in_memory(
        tickets: &Arc<TicketBook>,
        vault: &Arc<InMemoryVault>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            issuer: tickets.clone(),
            owners: tickets.clone(),
            transfer: vault.clone(),
            authorizer,
        }
    }
}

struct PoolState {
    ledger: Ledger,
    gate: FundraisingGate,
    paid: BTreeMap<Currency, Amount>,
    swept: BTreeMap<Currency, Amount>,
    journal: Journal,
}

/// One fractional-claim earnings pool.
///
/// Every mutating method takes the single write lock, but never holds it
/// across an external transfer: payouts are reserved under the lock, paid
/// with the lock released, and rolled back under the lock if the transfer
/// fails. Queries take the read lock once, so each one sees a state between
/// two mutations.
pub struct Pool {
    config: PoolConfig,
    collaborators: Collaborators,
    state: RwLock<PoolState>,
}

impl Pool {
    pub fn new(config: PoolConfig, collaborators: Collaborators) -> PoolResult<Self> {
        config.validate()?;
        let ledger = Ledger::new(config.initial_max_tickets)?;
        let gate = FundraisingGate::new(config.lifecycle);
        tracing::info!(
            max_tickets = config.initial_max_tickets,
            lifecycle = ?config.lifecycle,
            "pool created"
        );
        Ok(Self {
            config,
            collaborators,
            state: RwLock::new(PoolState {
                ledger,
                gate,
                paid: BTreeMap::new(),
                swept: BTreeMap::new(),
                journal: Journal::default(),
            }),
        })
    }

    /// Rebuild a pool from a snapshot taken by [`Pool::snapshot`].
    ///
    /// The ledger must pass validation and the paid and swept totals must be
    /// covered by its deposits. The claim count comes from the snapshot, not
    /// from `config`.
    pub fn restore(
        config: PoolConfig,
        collaborators: Collaborators,
        snapshot: PoolSnapshot,
    ) -> PoolResult<Self> {
        config.validate()?;
        let ledger = Ledger::restore(snapshot.ledger)?;
        let issued = collaborators.issuer.issued_count();
        if issued > ledger.claims().current() {
            return Err(LedgerError::InvalidSnapshot(format!(
                "{issued} tickets issued but the claim count is {}",
                ledger.claims().current()
            ))
            .into());
        }

        let state = PoolState {
            gate: FundraisingGate::with_state(config.lifecycle, snapshot.fundraising),
            ledger,
            paid: snapshot.paid,
            swept: snapshot.swept,
            journal: Journal::default(),
        };
        if let Some(first) = conservation_violations(&state).first() {
            return Err(LedgerError::InvalidSnapshot(first.description.clone()).into());
        }

        tracing::info!(
            max_tickets = state.ledger.claims().current(),
            deposits = state.ledger.deposit_log().len(),
            fundraising = %state.gate.state(),
            "pool restored from snapshot"
        );
        Ok(Self {
            config,
            collaborators,
            state: RwLock::new(state),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn read(&self) -> PoolResult<RwLockReadGuard<'_, PoolState>> {
        self.state.read().map_err(|_| PoolError::Poisoned)
    }

    fn write(&self) -> PoolResult<RwLockWriteGuard<'_, PoolState>> {
        self.state.write().map_err(|_| PoolError::Poisoned)
    }

    // ---- Mutations ----

    /// Issue the next ticket to `to`.
    pub fn issue_ticket(&self, to: &AccountId, caller: &AccountId) -> PoolResult<TicketId> {
        self.collaborators
            .authorizer
            .authorize(caller, Action::IssueTicket)?;
        let mut state = self.write()?;
        state.gate.require_open_for_purchase()?;

        let max_tickets = state.ledger.claims().current();
        if self.collaborators.issuer.issued_count() >= max_tickets {
            return Err(PoolError::CapacityExceeded { max_tickets });
        }

        let ticket = self.collaborators.issuer.next_ticket_id(to);
        state.journal.push(PoolEventKind::TicketIssued {
            ticket,
            owner: to.clone(),
        });
        tracing::debug!(%ticket, owner = %to, "ticket issued");
        Ok(ticket)
    }

    /// Record a deposit of `amount` in `currency` made by `depositor`.
    pub fn record_deposit(
        &self,
        amount: Amount,
        currency: Currency,
        depositor: &AccountId,
    ) -> PoolResult<DepositId> {
        self.collaborators
            .authorizer
            .authorize(depositor, Action::RecordDeposit)?;
        let mut state = self.write()?;
        state.gate.require_closed_for_deposit()?;
        if amount == 0 && self.config.reject_zero_deposits {
            return Err(PoolError::ZeroAmount);
        }

        let issued = self.collaborators.issuer.issued_count();
        let request = DepositRequest::new(amount, currency.clone(), depositor.clone());
        let deposit = state.ledger.record_deposit(request, issued)?;
        let max_tickets_at_deposit = state.ledger.claims().current();
        state.journal.push(PoolEventKind::DepositRecorded {
            deposit,
            currency: currency.clone(),
            amount,
            max_tickets_at_deposit,
            depositor: depositor.clone(),
        });
        tracing::info!(
            %deposit,
            %currency,
            %amount,
            max_tickets_at_deposit,
            "deposit recorded"
        );
        Ok(deposit)
    }

    /// Pay `ticket` every share it is owed, in deposit order.
    ///
    /// Returns the transfers that happened. A failed transfer aborts the
    /// call with [`PoolError::TransferFailed`]; shares paid before it in the
    /// same call stay paid, and the next call resumes at the failed deposit.
    pub fn withdraw(&self, ticket: TicketId, caller: &AccountId) -> PoolResult<Vec<Payout>> {
        let reserved = {
            let mut state = self.write()?;

            let owner = self
                .collaborators
                .owners
                .owner_of(ticket)
                .ok_or(PoolError::NotIssued(ticket))?;
            if owner != *caller {
                return Err(PoolError::NotOwner {
                    ticket,
                    caller: caller.clone(),
                });
            }
            state.gate.require_closed_for_withdraw()?;
            if state.ledger.deposit_log().is_empty() {
                return Err(PoolError::NoDeposits);
            }
            PayoutEngine::reserve(&mut state.ledger, ticket)?
        };
        if reserved.is_empty() {
            return Ok(Vec::new());
        }

        let outcome =
            PayoutEngine::settle(ticket, reserved, caller, self.collaborators.transfer.as_ref());

        let mut state = self.write()?;
        PayoutEngine::release(&mut state.ledger, ticket, &outcome.unpaid);
        for payout in &outcome.paid {
            let paid = state.paid.entry(payout.currency.clone()).or_insert(0);
            // Bounded by the currency's total deposited.
            *paid = paid.saturating_add(payout.amount);
            state.journal.push(PoolEventKind::Withdrawn {
                ticket,
                deposit: payout.deposit,
                currency: payout.currency.clone(),
                amount: payout.amount,
                to: caller.clone(),
            });
        }

        if let Some((deposit, source)) = outcome.failure {
            return Err(PoolError::TransferFailed {
                deposit: Some(deposit),
                source,
            });
        }

        tracing::info!(%ticket, payouts = outcome.paid.len(), "withdrawal complete");
        Ok(outcome.paid)
    }

    pub fn grow_claim_count(&self, new_value: u64, caller: &AccountId) -> PoolResult<()> {
        self.collaborators
            .authorizer
            .authorize(caller, Action::GrowClaimCount)?;
        let mut state = self.write()?;
        let from = state.ledger.claims().current();
        state.ledger.grow_claim_count(new_value)?;
        state.journal.push(PoolEventKind::ClaimCountGrown {
            from,
            to: new_value,
        });
        tracing::info!(from, to = new_value, "claim count grown");
        Ok(())
    }

    pub fn close_fundraising(&self, caller: &AccountId) -> PoolResult<()> {
        self.collaborators
            .authorizer
            .authorize(caller, Action::CloseFundraising)?;
        let mut state = self.write()?;
        state.gate.close()?;
        state.journal.push(PoolEventKind::FundraisingClosed);
        Ok(())
    }

    /// Transfer the outstanding floor-division dust of `currency` to `to`.
    ///
    /// Returns the amount swept, zero when there was nothing to sweep.
    pub fn sweep_dust(
        &self,
        currency: &Currency,
        to: &AccountId,
        caller: &AccountId,
    ) -> PoolResult<Amount> {
        self.collaborators
            .authorizer
            .authorize(caller, Action::SweepDust)?;
        if !self.config.allow_dust_sweep {
            return Err(PoolError::DustSweepDisabled);
        }

        let outstanding = {
            let mut state = self.write()?;
            let outstanding = dust_outstanding(&state, currency);
            if outstanding == 0 {
                return Ok(0);
            }
            // Counted as swept while in flight so no concurrent sweep sees it.
            let swept = state.swept.entry(currency.clone()).or_insert(0);
            *swept = swept.saturating_add(outstanding);
            outstanding
        };

        let result = self.collaborators.transfer.transfer(currency, to, outstanding);

        let mut state = self.write()?;
        if let Err(source) = result {
            if let Some(swept) = state.swept.get_mut(currency) {
                *swept = swept.saturating_sub(outstanding);
            }
            tracing::warn!(%currency, amount = %outstanding, error = %source, "dust sweep failed");
            return Err(PoolError::TransferFailed {
                deposit: None,
                source,
            });
        }
        state.journal.push(PoolEventKind::DustSwept {
            currency: currency.clone(),
            amount: outstanding,
            to: to.clone(),
        });
        tracing::info!(%currency, amount = %outstanding, %to, "dust swept");
        Ok(outstanding)
    }

    // ---- Queries ----

    pub fn fundraising_state(&self) -> PoolResult<FundraisingState> {
        Ok(self.read()?.gate.state())
    }

    pub fn claim_count(&self) -> PoolResult<u64> {
        Ok(self.read()?.ledger.claims().current())
    }

    pub fn tickets_issued(&self) -> u64 {
        self.collaborators.issuer.issued_count()
    }

    pub fn total_deposited(&self, currency: &Currency) -> PoolResult<Amount> {
        Ok(self.read()?.ledger.deposit_log().total_deposited(currency))
    }

    pub fn total_paid(&self, currency: &Currency) -> PoolResult<Amount> {
        Ok(self.read()?.paid.get(currency).copied().unwrap_or(0))
    }

    pub fn total_swept(&self, currency: &Currency) -> PoolResult<Amount> {
        Ok(self.read()?.swept.get(currency).copied().unwrap_or(0))
    }

    /// Floor-division remainders of `currency` deposits not yet swept.
    pub fn dust(&self, currency: &Currency) -> PoolResult<Amount> {
        Ok(dust_outstanding(&*self.read()?, currency))
    }

    pub fn list_currencies(&self) -> PoolResult<Vec<Currency>> {
        Ok(self.read()?.ledger.currency_registry().list().to_vec())
    }

    pub fn list_deposits(&self) -> PoolResult<Vec<Deposit>> {
        Ok(self.read()?.ledger.deposit_log().all().to_vec())
    }

    pub fn deposit(&self, id: DepositId) -> PoolResult<Deposit> {
        Ok(self.read()?.ledger.deposit_log().get(id)?.clone())
    }

    pub fn is_redeemed(&self, ticket: TicketId, deposit: DepositId) -> PoolResult<bool> {
        Ok(self
            .read()?
            .ledger
            .redemption_index()
            .is_redeemed(ticket, deposit))
    }

    /// What `ticket` is still owed for deposit `id`.
    pub fn entitlement(&self, ticket: TicketId, id: DepositId) -> PoolResult<Amount> {
        let state = self.read()?;
        let deposit = state.ledger.deposit_log().get(id)?;
        Ok(PayoutEngine::entitlement(&state.ledger, ticket, deposit))
    }

    pub fn prorated_view(&self, ticket: TicketId) -> PoolResult<Vec<ProratedEntry>> {
        Ok(PayoutEngine::prorated_view(&self.read()?.ledger, ticket))
    }

    /// Per-currency totals the next withdraw of `ticket` would pay.
    pub fn claimable(&self, ticket: TicketId) -> PoolResult<BTreeMap<Currency, Amount>> {
        let state = self.read()?;
        let mut totals: BTreeMap<Currency, Amount> = BTreeMap::new();
        for payout in PayoutEngine::pending(&state.ledger, ticket) {
            let entry = totals.entry(payout.currency).or_insert(0);
            *entry = entry.saturating_add(payout.amount);
        }
        Ok(totals)
    }

    pub fn events(&self) -> PoolResult<Vec<PoolEvent>> {
        Ok(self.read()?.journal.all().to_vec())
    }

    /// Capture the ledger, the fundraising phase, and the paid and swept
    /// totals. Payouts in flight when the snapshot is taken count as
    /// redeemed but not yet paid.
    pub fn snapshot(&self) -> PoolResult<PoolSnapshot> {
        let state = self.read()?;
        Ok(PoolSnapshot {
            ledger: state.ledger.snapshot(),
            fundraising: state.gate.state(),
            paid: state.paid.clone(),
            swept: state.swept.clone(),
        })
    }

    /// Ledger integrity plus, per currency, that paid out and dust together
    /// never exceed what was deposited.
    pub fn validate(&self) -> PoolResult<ValidationReport> {
        let state = self.read()?;
        let mut report = LedgerValidator::validate(&state.ledger);
        report.violations.extend(conservation_violations(&state));
        Ok(report)
    }
}

fn conservation_violations(state: &PoolState) -> Vec<Violation> {
    let log = state.ledger.deposit_log();
    let mut violations = Vec::new();
    let currencies = state
        .ledger
        .currency_registry()
        .list()
        .iter()
        .chain(state.paid.keys())
        .chain(state.swept.keys());

    let mut checked = Vec::new();
    for currency in currencies {
        if checked.contains(currency) {
            continue;
        }
        checked.push(currency.clone());

        let deposited = log.total_deposited(currency);
        let dust = total_dust(state, currency);
        let paid = state.paid.get(currency).copied().unwrap_or(0);
        let swept = state.swept.get(currency).copied().unwrap_or(0);

        if paid.checked_add(dust).map_or(true, |out| out > deposited) {
            violations.push(Violation {
                deposit: None,
                kind: ViolationKind::Overpaid,
                description: format!(
                    "{currency}: paid {paid} plus dust {dust} exceeds deposited {deposited}"
                ),
            });
        }
        if swept > dust {
            violations.push(Violation {
                deposit: None,
                kind: ViolationKind::Overpaid,
                description: format!("{currency}: swept {swept} but only {dust} dust accrued"),
            });
        }
    }
    violations
}

fn total_dust(state: &PoolState, currency: &Currency) -> Amount {
    state
        .ledger
        .deposit_log()
        .all()
        .iter()
        .filter(|d| d.currency == *currency)
        .map(Deposit::dust)
        .fold(0, Amount::saturating_add)
}

fn dust_outstanding(state: &PoolState, currency: &Currency) -> Amount {
    let swept = state.swept.get(currency).copied().unwrap_or(0);
    total_dust(state, currency).saturating_sub(swept)
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, Weak};
    use std::thread;

    use prl_gate::{AllowAll, GateError, LifecyclePolicy, Role, RoleTable};
    use proptest::prelude::*;

    use super::*;
    use crate::collab::TransferError;

    struct Harness {
        pool: Arc<Pool>,
        tickets: Arc<TicketBook>,
        vault: Arc<InMemoryVault>,
    }

    fn harness_with(config: PoolConfig, authorizer: Arc<dyn Authorizer>) -> Harness {
        let tickets = Arc::new(TicketBook::new());
        let vault = Arc::new(InMemoryVault::new());
        let collaborators = Collaborators::in_memory(&tickets, &vault, authorizer);
        let pool = Arc::new(Pool::new(config, collaborators).unwrap());
        Harness {
            pool,
            tickets,
            vault,
        }
    }

    fn harness(max_tickets: u64, lifecycle: LifecyclePolicy) -> Harness {
        let config = PoolConfig {
            lifecycle,
            ..PoolConfig::with_max_tickets(max_tickets)
        };
        harness_with(config, Arc::new(AllowAll))
    }

    fn admin() -> AccountId {
        AccountId::from_label("admin")
    }

    fn payer() -> AccountId {
        AccountId::from_label("payer")
    }

    fn holder(i: u64) -> AccountId {
        AccountId::from_label(&format!("holder-{i}"))
    }

    fn usdc() -> Currency {
        Currency::token("USDC").unwrap()
    }

    #[test]
    fn growing_denominator_pays_each_deposit_by_its_snapshot() {
        let h = harness(2, LifecyclePolicy::Continuous);
        let t0 = h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        let t1 = h.pool.issue_ticket(&holder(1), &admin()).unwrap();
        let d0 = h.pool.record_deposit(100, Currency::Native, &payer()).unwrap();
        assert_eq!(h.pool.deposit(d0).unwrap().max_tickets_at_deposit, 2);
        assert_eq!(h.pool.entitlement(t0, d0).unwrap(), 50);
        assert_eq!(h.pool.entitlement(t1, d0).unwrap(), 50);

        h.pool.grow_claim_count(3, &admin()).unwrap();
        let t2 = h.pool.issue_ticket(&holder(2), &admin()).unwrap();
        let d1 = h.pool.record_deposit(100, Currency::Native, &payer()).unwrap();
        assert_eq!(h.pool.deposit(d1).unwrap().max_tickets_at_deposit, 3);
        assert_eq!(h.pool.entitlement(t2, d1).unwrap(), 33);
        assert_eq!(h.pool.entitlement(t2, d0).unwrap(), 0);
        assert_eq!(h.pool.entitlement(t0, d1).unwrap(), 33);

        let paid = h.pool.withdraw(t0, &holder(0)).unwrap();
        assert_eq!(
            paid,
            vec![
                Payout {
                    deposit: d0,
                    currency: Currency::Native,
                    amount: 50
                },
                Payout {
                    deposit: d1,
                    currency: Currency::Native,
                    amount: 33
                },
            ]
        );
        assert_eq!(h.vault.balance(&holder(0), &Currency::Native), 83);
        assert_eq!(h.pool.total_paid(&Currency::Native).unwrap(), 83);
    }

    #[test]
    fn small_deposit_is_all_dust() {
        let h = harness(10, LifecyclePolicy::Sequential);
        let t0 = h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        h.pool.close_fundraising(&admin()).unwrap();
        let d0 = h.pool.record_deposit(7, Currency::Native, &payer()).unwrap();

        assert_eq!(h.pool.entitlement(t0, d0).unwrap(), 0);
        assert!(h.pool.withdraw(t0, &holder(0)).unwrap().is_empty());
        assert_eq!(h.pool.dust(&Currency::Native).unwrap(), 7);
        assert!(!h.pool.is_redeemed(t0, d0).unwrap());
    }

    #[test]
    fn deposit_before_any_ticket_has_no_shares() {
        let h = harness(5, LifecyclePolicy::Sequential);
        h.pool.close_fundraising(&admin()).unwrap();
        assert!(matches!(
            h.pool.record_deposit(100, Currency::Native, &payer()),
            Err(PoolError::Ledger(LedgerError::ZeroShares))
        ));
        assert!(h.pool.list_deposits().unwrap().is_empty());
        assert!(h.pool.list_currencies().unwrap().is_empty());
    }

    #[test]
    fn sequential_lifecycle_separates_purchase_from_payout() {
        let h = harness(3, LifecyclePolicy::Sequential);
        let t0 = h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        assert!(matches!(
            h.pool.record_deposit(10, Currency::Native, &payer()),
            Err(PoolError::Gate(GateError::FundraisingOpen(Action::RecordDeposit)))
        ));
        assert!(matches!(
            h.pool.withdraw(t0, &holder(0)),
            Err(PoolError::Gate(GateError::FundraisingOpen(Action::Withdraw)))
        ));

        h.pool.close_fundraising(&admin()).unwrap();
        assert!(matches!(
            h.pool.issue_ticket(&holder(1), &admin()),
            Err(PoolError::Gate(GateError::FundraisingClosed(Action::IssueTicket)))
        ));
        assert!(matches!(
            h.pool.close_fundraising(&admin()),
            Err(PoolError::Gate(GateError::AlreadyClosed))
        ));
        assert_eq!(h.pool.fundraising_state().unwrap(), FundraisingState::Closed);
    }

    #[test]
    fn withdraw_checks_ownership_first() {
        let h = harness(2, LifecyclePolicy::Sequential);
        let t0 = h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        assert!(matches!(
            h.pool.withdraw(t0, &holder(1)),
            Err(PoolError::NotOwner { .. })
        ));
        assert!(matches!(
            h.pool.withdraw(TicketId(9), &holder(0)),
            Err(PoolError::NotIssued(TicketId(9)))
        ));
    }

    #[test]
    fn withdraw_without_deposits_fails() {
        let h = harness(2, LifecyclePolicy::Sequential);
        let t0 = h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        h.pool.close_fundraising(&admin()).unwrap();
        assert!(matches!(
            h.pool.withdraw(t0, &holder(0)),
            Err(PoolError::NoDeposits)
        ));
    }

    #[test]
    fn second_withdraw_is_empty_until_new_deposit() {
        let h = harness(2, LifecyclePolicy::Sequential);
        let t0 = h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        h.pool.issue_ticket(&holder(1), &admin()).unwrap();
        h.pool.close_fundraising(&admin()).unwrap();
        h.pool.record_deposit(10, Currency::Native, &payer()).unwrap();

        assert_eq!(h.pool.withdraw(t0, &holder(0)).unwrap().len(), 1);
        let events_before = h.pool.events().unwrap().len();
        assert!(h.pool.withdraw(t0, &holder(0)).unwrap().is_empty());
        assert_eq!(h.pool.events().unwrap().len(), events_before);
        assert_eq!(h.vault.transfer_count(), 1);

        h.pool.record_deposit(20, Currency::Native, &payer()).unwrap();
        let caught_up = h.pool.withdraw(t0, &holder(0)).unwrap();
        assert_eq!(caught_up.len(), 1);
        assert_eq!(caught_up[0].deposit, DepositId(1));
        assert_eq!(caught_up[0].amount, 10);
    }

    #[test]
    fn failed_transfer_resumes_on_next_withdraw() {
        let h = harness(1, LifecyclePolicy::Sequential);
        let t0 = h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        h.pool.close_fundraising(&admin()).unwrap();
        h.pool.record_deposit(10, Currency::Native, &payer()).unwrap();
        h.pool.record_deposit(20, usdc(), &payer()).unwrap();
        h.pool.record_deposit(30, Currency::Native, &payer()).unwrap();

        h.vault.fail_currency(usdc());
        match h.pool.withdraw(t0, &holder(0)) {
            Err(PoolError::TransferFailed { deposit, .. }) => {
                assert_eq!(deposit, Some(DepositId(1)))
            }
            other => panic!("expected transfer failure, got {other:?}"),
        }
        assert!(h.pool.is_redeemed(t0, DepositId(0)).unwrap());
        assert!(!h.pool.is_redeemed(t0, DepositId(1)).unwrap());
        assert_eq!(h.pool.total_paid(&Currency::Native).unwrap(), 10);

        h.vault.heal_currency(&usdc());
        let rest = h.pool.withdraw(t0, &holder(0)).unwrap();
        assert_eq!(
            rest.iter().map(|p| p.deposit).collect::<Vec<_>>(),
            vec![DepositId(1), DepositId(2)]
        );
        assert_eq!(h.vault.balance(&holder(0), &usdc()), 20);
        assert_eq!(h.vault.balance(&holder(0), &Currency::Native), 40);
    }

    #[test]
    fn currencies_are_isolated_and_listed_in_first_seen_order() {
        let h = harness(2, LifecyclePolicy::Sequential);
        let t0 = h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        h.pool.issue_ticket(&holder(1), &admin()).unwrap();
        h.pool.close_fundraising(&admin()).unwrap();
        h.pool.record_deposit(40, usdc(), &payer()).unwrap();
        h.pool.record_deposit(10, Currency::Native, &payer()).unwrap();
        h.pool.record_deposit(60, usdc(), &payer()).unwrap();

        assert_eq!(
            h.pool.list_currencies().unwrap(),
            vec![usdc(), Currency::Native]
        );
        assert_eq!(h.pool.total_deposited(&usdc()).unwrap(), 100);
        assert_eq!(h.pool.total_deposited(&Currency::Native).unwrap(), 10);

        let claimable = h.pool.claimable(t0).unwrap();
        assert_eq!(claimable.get(&usdc()), Some(&50));
        assert_eq!(claimable.get(&Currency::Native), Some(&5));
    }

    #[test]
    fn transferred_ticket_pays_its_current_owner() {
        let h = harness(1, LifecyclePolicy::Sequential);
        let t0 = h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        h.pool.close_fundraising(&admin()).unwrap();
        h.pool.record_deposit(9, Currency::Native, &payer()).unwrap();

        assert!(h.tickets.reassign(t0, holder(1)));
        assert!(matches!(
            h.pool.withdraw(t0, &holder(0)),
            Err(PoolError::NotOwner { .. })
        ));
        h.pool.withdraw(t0, &holder(1)).unwrap();
        assert_eq!(h.vault.balance(&holder(1), &Currency::Native), 9);
    }

    #[test]
    fn capacity_follows_claim_count() {
        let h = harness(1, LifecyclePolicy::Sequential);
        h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        assert!(matches!(
            h.pool.issue_ticket(&holder(1), &admin()),
            Err(PoolError::CapacityExceeded { max_tickets: 1 })
        ));
        h.pool.grow_claim_count(2, &admin()).unwrap();
        assert_eq!(h.pool.issue_ticket(&holder(1), &admin()).unwrap(), TicketId(1));
        assert!(matches!(
            h.pool.grow_claim_count(2, &admin()),
            Err(PoolError::Ledger(LedgerError::InvalidGrowth { .. }))
        ));
    }

    #[test]
    fn zero_deposit_is_rejected_by_default() {
        let h = harness(1, LifecyclePolicy::Sequential);
        h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        h.pool.close_fundraising(&admin()).unwrap();
        assert!(matches!(
            h.pool.record_deposit(0, Currency::Native, &payer()),
            Err(PoolError::ZeroAmount)
        ));

        let lenient = harness_with(
            PoolConfig {
                reject_zero_deposits: false,
                lifecycle: LifecyclePolicy::Continuous,
                ..PoolConfig::with_max_tickets(1)
            },
            Arc::new(AllowAll),
        );
        lenient.pool.issue_ticket(&holder(0), &admin()).unwrap();
        assert_eq!(
            lenient.pool.record_deposit(0, Currency::Native, &payer()).unwrap(),
            DepositId(0)
        );
    }

    #[test]
    fn dust_sweep_needs_config_and_moves_remainders_once() {
        let disabled = harness(3, LifecyclePolicy::Continuous);
        assert!(matches!(
            disabled
                .pool
                .sweep_dust(&Currency::Native, &admin(), &admin()),
            Err(PoolError::DustSweepDisabled)
        ));

        let h = harness_with(
            PoolConfig {
                allow_dust_sweep: true,
                lifecycle: LifecyclePolicy::Continuous,
                ..PoolConfig::with_max_tickets(3)
            },
            Arc::new(AllowAll),
        );
        h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        h.pool.record_deposit(100, Currency::Native, &payer()).unwrap();
        h.pool.record_deposit(11, Currency::Native, &payer()).unwrap();
        assert_eq!(h.pool.dust(&Currency::Native).unwrap(), 3);

        let treasury = AccountId::from_label("treasury");
        assert_eq!(
            h.pool.sweep_dust(&Currency::Native, &treasury, &admin()).unwrap(),
            3
        );
        assert_eq!(h.vault.balance(&treasury, &Currency::Native), 3);
        assert_eq!(h.pool.dust(&Currency::Native).unwrap(), 0);
        assert_eq!(
            h.pool.sweep_dust(&Currency::Native, &treasury, &admin()).unwrap(),
            0
        );
        assert_eq!(h.pool.total_swept(&Currency::Native).unwrap(), 3);
    }

    #[test]
    fn role_table_guards_admin_operations() {
        let roles = RoleTable::new()
            .with(admin(), Role::Admin)
            .with(admin(), Role::Issuer);
        let config = PoolConfig {
            lifecycle: LifecyclePolicy::Continuous,
            ..PoolConfig::with_max_tickets(2)
        };
        let h = harness_with(config, Arc::new(roles));
        let stranger = AccountId::from_label("stranger");

        assert!(matches!(
            h.pool.issue_ticket(&stranger, &stranger),
            Err(PoolError::Gate(GateError::Unauthorized { .. }))
        ));
        assert!(matches!(
            h.pool.grow_claim_count(5, &stranger),
            Err(PoolError::Gate(GateError::Unauthorized { .. }))
        ));
        assert!(matches!(
            h.pool.close_fundraising(&stranger),
            Err(PoolError::Gate(GateError::Unauthorized { .. }))
        ));

        let t0 = h.pool.issue_ticket(&stranger, &admin()).unwrap();
        h.pool.record_deposit(10, Currency::Native, &payer()).unwrap();
        assert_eq!(h.pool.withdraw(t0, &stranger).unwrap().len(), 1);
    }

    #[test]
    fn journal_records_every_mutation_in_order() {
        let h = harness(1, LifecyclePolicy::Sequential);
        let t0 = h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        h.pool.close_fundraising(&admin()).unwrap();
        h.pool.record_deposit(5, Currency::Native, &payer()).unwrap();
        h.pool.withdraw(t0, &holder(0)).unwrap();

        let names: Vec<_> = h
            .pool
            .events()
            .unwrap()
            .iter()
            .map(|e| e.kind.name())
            .collect();
        assert_eq!(
            names,
            vec!["TicketIssued", "FundraisingClosed", "DepositRecorded", "Withdrawn"]
        );
    }

    #[test]
    fn snapshot_restores_equivalent_pool() {
        let h = harness(2, LifecyclePolicy::Sequential);
        let t0 = h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        let t1 = h.pool.issue_ticket(&holder(1), &admin()).unwrap();
        h.pool.close_fundraising(&admin()).unwrap();
        h.pool.record_deposit(11, usdc(), &payer()).unwrap();
        h.pool.withdraw(t0, &holder(0)).unwrap();

        let bytes = h.pool.snapshot().unwrap().to_bytes().unwrap();
        let collaborators = Collaborators::in_memory(&h.tickets, &h.vault, Arc::new(AllowAll));
        let restored = Pool::restore(
            PoolConfig::with_max_tickets(2),
            collaborators,
            PoolSnapshot::from_bytes(&bytes).unwrap(),
        )
        .unwrap();

        assert_eq!(restored.fundraising_state().unwrap(), FundraisingState::Closed);
        assert_eq!(restored.total_deposited(&usdc()).unwrap(), 11);
        assert_eq!(restored.total_paid(&usdc()).unwrap(), 5);
        assert_eq!(restored.dust(&usdc()).unwrap(), 1);
        assert!(restored.is_redeemed(t0, DepositId(0)).unwrap());
        assert!(restored.events().unwrap().is_empty());
        assert!(restored.validate().unwrap().is_valid());

        assert!(restored.withdraw(t0, &holder(0)).unwrap().is_empty());
        assert_eq!(restored.withdraw(t1, &holder(1)).unwrap()[0].amount, 5);
        assert_eq!(restored.total_paid(&usdc()).unwrap(), 10);
    }

    #[test]
    fn restore_rejects_totals_the_deposits_cannot_cover() {
        let h = harness(1, LifecyclePolicy::Sequential);
        h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        h.pool.close_fundraising(&admin()).unwrap();
        h.pool.record_deposit(10, Currency::Native, &payer()).unwrap();

        let mut snapshot = h.pool.snapshot().unwrap();
        snapshot.paid.insert(Currency::Native, 11);
        let collaborators = Collaborators::in_memory(&h.tickets, &h.vault, Arc::new(AllowAll));
        assert!(matches!(
            Pool::restore(PoolConfig::with_max_tickets(1), collaborators, snapshot),
            Err(PoolError::Ledger(LedgerError::InvalidSnapshot(_)))
        ));
    }

    #[test]
    fn restore_rejects_more_tickets_than_claims() {
        let h = harness(2, LifecyclePolicy::Sequential);
        h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        h.pool.issue_ticket(&holder(1), &admin()).unwrap();

        let mut snapshot = h.pool.snapshot().unwrap();
        snapshot.ledger.max_tickets = 1;
        let collaborators = Collaborators::in_memory(&h.tickets, &h.vault, Arc::new(AllowAll));
        assert!(matches!(
            Pool::restore(PoolConfig::with_max_tickets(1), collaborators, snapshot),
            Err(PoolError::Ledger(LedgerError::InvalidSnapshot(_)))
        ));
    }

    #[test]
    fn validate_flags_payouts_beyond_deposits() {
        let h = harness(2, LifecyclePolicy::Sequential);
        h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        h.pool.close_fundraising(&admin()).unwrap();
        h.pool.record_deposit(11, Currency::Native, &payer()).unwrap();
        assert!(h.pool.validate().unwrap().is_valid());

        // Two shares of 5 leave 1 dust, so at most 10 can ever be paid.
        h.pool.state.write().unwrap().paid.insert(Currency::Native, 11);
        let report = h.pool.validate().unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::Overpaid);
        assert_eq!(report.violations[0].deposit, None);

        h.pool.state.write().unwrap().paid.clear();
        h.pool.state.write().unwrap().swept.insert(usdc(), 1);
        let report = h.pool.validate().unwrap();
        assert_eq!(
            report.violations.iter().map(|v| v.kind).collect::<Vec<_>>(),
            vec![ViolationKind::Overpaid]
        );
    }

    #[test]
    fn failed_dust_sweep_changes_nothing_and_can_be_retried() {
        let h = harness_with(
            PoolConfig {
                allow_dust_sweep: true,
                lifecycle: LifecyclePolicy::Continuous,
                ..PoolConfig::with_max_tickets(3)
            },
            Arc::new(AllowAll),
        );
        h.pool.issue_ticket(&holder(0), &admin()).unwrap();
        h.pool.record_deposit(100, Currency::Native, &payer()).unwrap();
        let treasury = AccountId::from_label("treasury");

        h.vault.fail_currency(Currency::Native);
        assert!(matches!(
            h.pool.sweep_dust(&Currency::Native, &treasury, &admin()),
            Err(PoolError::TransferFailed { deposit: None, .. })
        ));
        assert_eq!(h.pool.total_swept(&Currency::Native).unwrap(), 0);
        assert_eq!(h.pool.dust(&Currency::Native).unwrap(), 1);
        assert!(h
            .pool
            .events()
            .unwrap()
            .iter()
            .all(|e| e.kind.name() != "DustSwept"));

        h.vault.heal_currency(&Currency::Native);
        assert_eq!(
            h.pool.sweep_dust(&Currency::Native, &treasury, &admin()).unwrap(),
            1
        );
        assert_eq!(h.pool.total_swept(&Currency::Native).unwrap(), 1);
        assert_eq!(h.vault.balance(&treasury, &Currency::Native), 1);
        assert!(h.pool.validate().unwrap().is_valid());
    }

    /// Calls back into the pool from inside every transfer.
    struct ReentrantVault {
        vault: InMemoryVault,
        pool: Mutex<Weak<Pool>>,
        nested: Mutex<Vec<PoolResult<Vec<Payout>>>>,
    }

    impl ValueTransfer for ReentrantVault {
        fn transfer(
            &self,
            currency: &Currency,
            to: &AccountId,
            amount: Amount,
        ) -> Result<(), TransferError> {
            let pool = self.pool.lock().unwrap().upgrade();
            if let Some(pool) = pool {
                let result = pool.withdraw(TicketId(0), &holder(0));
                self.nested.lock().unwrap().push(result);
            }
            self.vault.transfer(currency, to, amount)
        }
    }

    #[test]
    fn transfer_may_reenter_the_pool() {
        let tickets = Arc::new(TicketBook::new());
        let reentrant = Arc::new(ReentrantVault {
            vault: InMemoryVault::new(),
            pool: Mutex::new(Weak::new()),
            nested: Mutex::new(Vec::new()),
        });
        let collaborators = Collaborators {
            issuer: tickets.clone(),
            owners: tickets.clone(),
            transfer: reentrant.clone(),
            authorizer: Arc::new(AllowAll),
        };
        let pool = Arc::new(Pool::new(PoolConfig::with_max_tickets(2), collaborators).unwrap());
        *reentrant.pool.lock().unwrap() = Arc::downgrade(&pool);

        let t0 = pool.issue_ticket(&holder(0), &admin()).unwrap();
        pool.issue_ticket(&holder(1), &admin()).unwrap();
        pool.close_fundraising(&admin()).unwrap();
        pool.record_deposit(100, Currency::Native, &payer()).unwrap();
        pool.record_deposit(7, usdc(), &payer()).unwrap();

        let paid = pool.withdraw(t0, &holder(0)).unwrap();
        assert_eq!(paid.len(), 2);

        let nested = reentrant.nested.lock().unwrap();
        assert_eq!(nested.len(), 2);
        assert!(nested.iter().all(|r| matches!(r, Ok(p) if p.is_empty())));
        assert_eq!(reentrant.vault.transfer_count(), 2);
        assert_eq!(reentrant.vault.balance(&holder(0), &Currency::Native), 50);
        assert_eq!(reentrant.vault.balance(&holder(0), &usdc()), 3);
        assert_eq!(pool.total_paid(&Currency::Native).unwrap(), 50);
        assert!(pool.validate().unwrap().is_valid());
    }

    #[test]
    fn concurrent_withdrawals_pay_exactly_once() {
        let h = harness(4, LifecyclePolicy::Sequential);
        for i in 0..4 {
            h.pool.issue_ticket(&holder(i), &admin()).unwrap();
        }
        h.pool.close_fundraising(&admin()).unwrap();
        for _ in 0..5 {
            h.pool.record_deposit(101, Currency::Native, &payer()).unwrap();
        }

        let handles: Vec<_> = (0..16)
            .map(|n| {
                let pool = Arc::clone(&h.pool);
                thread::spawn(move || {
                    let i = n % 4;
                    pool.withdraw(TicketId(i), &holder(i)).unwrap().len()
                })
            })
            .collect();
        let payouts: usize = handles.into_iter().map(|t| t.join().unwrap()).sum();

        assert_eq!(payouts, 20);
        assert_eq!(h.vault.transfer_count(), 20);
        for i in 0..4 {
            assert_eq!(h.vault.balance(&holder(i), &Currency::Native), 125);
        }
        assert_eq!(h.pool.dust(&Currency::Native).unwrap(), 5);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Issue,
        Deposit(u128, bool),
        Grow(u64),
        Withdraw(u64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Issue),
            (0u128..1_000, any::<bool>()).prop_map(|(a, token)| Op::Deposit(a, token)),
            (1u64..4).prop_map(Op::Grow),
            (0u64..12).prop_map(Op::Withdraw),
        ]
    }

    fn run_ops(h: &Harness, ops: &[Op]) {
        for op in ops {
            let _ = match op {
                Op::Issue => {
                    let next = h.pool.tickets_issued();
                    h.pool.issue_ticket(&holder(next), &admin()).map(drop)
                }
                Op::Deposit(amount, token) => {
                    let currency = if *token { usdc() } else { Currency::Native };
                    h.pool.record_deposit(*amount, currency, &payer()).map(drop)
                }
                Op::Grow(by) => {
                    let current = h.pool.claim_count().unwrap();
                    h.pool.grow_claim_count(current + by, &admin())
                }
                Op::Withdraw(i) => h.pool.withdraw(TicketId(*i), &holder(*i)).map(drop),
            };
        }
    }

    proptest! {
        #[test]
        fn payouts_never_exceed_deposits(ops in proptest::collection::vec(op(), 0..40)) {
            let h = harness(2, LifecyclePolicy::Continuous);
            run_ops(&h, &ops);

            for currency in [Currency::Native, usdc()] {
                let deposited = h.pool.total_deposited(&currency).unwrap();
                let paid = h.pool.total_paid(&currency).unwrap();
                prop_assert!(paid <= deposited);
                prop_assert_eq!(h.vault.total_out(&currency), paid);
            }
            prop_assert!(h.pool.validate().unwrap().is_valid());
        }

        #[test]
        fn full_withdrawal_leaves_exactly_the_dust(ops in proptest::collection::vec(op(), 0..40)) {
            let h = harness(2, LifecyclePolicy::Continuous);
            run_ops(&h, &ops);

            let issued = h.pool.tickets_issued();
            for i in 0..issued {
                let _ = h.pool.withdraw(TicketId(i), &holder(i));
            }

            // Shares of eligible ids that were never issued stay in the pool.
            let unissued = |currency: &Currency| -> Amount {
                h.pool
                    .list_deposits()
                    .unwrap()
                    .iter()
                    .filter(|d| d.currency == *currency)
                    .map(|d| d.share() * Amount::from(d.max_tickets_at_deposit.saturating_sub(issued)))
                    .sum()
            };
            for currency in [Currency::Native, usdc()] {
                let deposited = h.pool.total_deposited(&currency).unwrap();
                let paid = h.pool.total_paid(&currency).unwrap();
                prop_assert_eq!(
                    deposited - paid,
                    h.pool.dust(&currency).unwrap() + unissued(&currency)
                );
            }
        }

        #[test]
        fn growth_never_changes_recorded_entitlements(
            ops in proptest::collection::vec(op(), 0..40),
            by in 1u64..50,
        ) {
            let h = harness(2, LifecyclePolicy::Continuous);
            run_ops(&h, &ops);

            let deposits = h.pool.list_deposits().unwrap();
            let ids = 0..(h.pool.claim_count().unwrap() + by);
            let before: Vec<Amount> = ids
                .clone()
                .flat_map(|t| deposits.iter().map(move |d| (t, d.id)))
                .map(|(t, d)| h.pool.entitlement(TicketId(t), d).unwrap())
                .collect();

            let current = h.pool.claim_count().unwrap();
            h.pool.grow_claim_count(current + by, &admin()).unwrap();

            let after: Vec<Amount> = ids
                .flat_map(|t| deposits.iter().map(move |d| (t, d.id)))
                .map(|(t, d)| h.pool.entitlement(TicketId(t), d).unwrap())
                .collect();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn repeated_withdraw_pays_nothing_new(ops in proptest::collection::vec(op(), 0..40)) {
            let h = harness(2, LifecyclePolicy::Continuous);
            run_ops(&h, &ops);

            for i in 0..h.pool.tickets_issued() {
                let _ = h.pool.withdraw(TicketId(i), &holder(i));
                let before = h.vault.transfer_count();
                if let Ok(again) = h.pool.withdraw(TicketId(i), &holder(i)) {
                    prop_assert!(again.is_empty());
                }
                prop_assert_eq!(h.vault.transfer_count(), before);
            }
        }
    }
}
