//! TOML scenarios: a pool configuration plus a list of steps to replay.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use prl_gate::{Role, RoleTable};
use prl_pool::{
    Collaborators, InMemoryVault, OwnershipOracle, Payout, Pool, PoolConfig, PoolError, PoolEvent,
    TicketBook,
};
use prl_types::{AccountId, Amount, Currency, DepositId, TicketId};

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub pool: PoolConfig,
    /// Account holding the admin and issuer roles, as a label or hex id.
    #[serde(default = "default_admin")]
    pub admin: String,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

fn default_admin() -> String {
    "admin".into()
}

fn default_depositor() -> String {
    "depositor".into()
}

/// One scenario action. Account fields take a label or a 64-character hex
/// account id.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Issue {
        to: String,
    },
    Deposit {
        #[serde(deserialize_with = "de_amount")]
        amount: Amount,
        #[serde(default)]
        currency: Currency,
        #[serde(default = "default_depositor")]
        from: String,
    },
    Grow {
        to: u64,
    },
    Close,
    Withdraw {
        ticket: u64,
        /// Defaults to the ticket's current owner.
        caller: Option<String>,
    },
    Sweep {
        currency: Currency,
        to: String,
    },
}

/// TOML integers stop at `i64`, so larger amounts are written as decimal
/// strings.
fn de_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = Amount;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
            Ok(Amount::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
            u64::try_from(v)
                .map(Amount::from)
                .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
            v.parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}

fn account(value: &str) -> anyhow::Result<AccountId> {
    value
        .parse()
        .with_context(|| format!("invalid account `{value}`"))
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Issue { .. } => "issue",
            Self::Deposit { .. } => "deposit",
            Self::Grow { .. } => "grow",
            Self::Close => "close",
            Self::Withdraw { .. } => "withdraw",
            Self::Sweep { .. } => "sweep",
        }
    }
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("failed to parse scenario")
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&content)
    }
}

/// What a successful step produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Issued(TicketId),
    Deposited(DepositId),
    Grown(u64),
    Closed,
    Withdrawn(Vec<Payout>),
    Swept(Amount),
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issued(ticket) => write!(f, "issued {ticket}"),
            Self::Deposited(deposit) => write!(f, "recorded {deposit}"),
            Self::Grown(to) => write!(f, "claim count is now {to}"),
            Self::Closed => write!(f, "fundraising closed"),
            Self::Withdrawn(paid) if paid.is_empty() => write!(f, "nothing to pay"),
            Self::Withdrawn(paid) => {
                let parts: Vec<String> = paid
                    .iter()
                    .map(|p| format!("{} {} from {}", p.amount, p.currency, p.deposit))
                    .collect();
                write!(f, "paid {}", parts.join(", "))
            }
            Self::Swept(amount) => write!(f, "swept {amount}"),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub action: &'static str,
    pub ok: bool,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CurrencySummary {
    pub deposited: Amount,
    pub paid: Amount,
    pub dust: Amount,
    pub swept: Amount,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
    pub currencies: BTreeMap<String, CurrencySummary>,
    pub events: Vec<PoolEvent>,
}

/// A pool wired to in-memory collaborators, driven by scenario steps.
pub struct Runner {
    pool: Pool,
    tickets: Arc<TicketBook>,
    vault: Arc<InMemoryVault>,
    admin: AccountId,
}

impl Runner {
    pub fn new(scenario: &Scenario) -> anyhow::Result<Self> {
        let admin = account(&scenario.admin)?;
        let roles = RoleTable::new()
            .with(admin.clone(), Role::Admin)
            .with(admin.clone(), Role::Issuer);
        let tickets = Arc::new(TicketBook::new());
        let vault = Arc::new(InMemoryVault::new());
        let collaborators = Collaborators::in_memory(&tickets, &vault, Arc::new(roles));
        let pool = Pool::new(scenario.pool.clone(), collaborators)
            .context("invalid pool configuration")?;
        Ok(Self {
            pool,
            tickets,
            vault,
            admin,
        })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn vault(&self) -> &InMemoryVault {
        &self.vault
    }

    pub fn apply(&self, step: &Step) -> anyhow::Result<StepOutcome> {
        let outcome = match step {
            Step::Issue { to } => self
                .pool
                .issue_ticket(&account(to)?, &self.admin)
                .map(StepOutcome::Issued),
            Step::Deposit {
                amount,
                currency,
                from,
            } => self
                .pool
                .record_deposit(*amount, currency.clone(), &account(from)?)
                .map(StepOutcome::Deposited),
            Step::Grow { to } => self
                .pool
                .grow_claim_count(*to, &self.admin)
                .map(|()| StepOutcome::Grown(*to)),
            Step::Close => self
                .pool
                .close_fundraising(&self.admin)
                .map(|()| StepOutcome::Closed),
            Step::Withdraw { ticket, caller } => {
                let ticket = TicketId(*ticket);
                let caller = match caller {
                    Some(value) => account(value)?,
                    None => self
                        .tickets
                        .owner_of(ticket)
                        .ok_or(PoolError::NotIssued(ticket))?,
                };
                self.pool
                    .withdraw(ticket, &caller)
                    .map(StepOutcome::Withdrawn)
            }
            Step::Sweep { currency, to } => self
                .pool
                .sweep_dust(currency, &account(to)?, &self.admin)
                .map(StepOutcome::Swept),
        };
        Ok(outcome?)
    }

    /// Apply every step in order. A failing step is reported and the run
    /// continues with the next one.
    pub fn run(&self, steps: &[Step]) -> anyhow::Result<RunReport> {
        let steps = steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let (ok, detail) = match self.apply(step) {
                    Ok(outcome) => (true, outcome.to_string()),
                    Err(err) => {
                        tracing::debug!(index, action = step.name(), error = %err, "step failed");
                        (false, format!("{err:#}"))
                    }
                };
                StepReport {
                    index,
                    action: step.name(),
                    ok,
                    detail,
                }
            })
            .collect();

        let mut currencies = BTreeMap::new();
        for currency in self.pool.list_currencies()? {
            currencies.insert(currency.to_string(), self.summary(&currency)?);
        }

        Ok(RunReport {
            steps,
            currencies,
            events: self.pool.events()?,
        })
    }

    fn summary(&self, currency: &Currency) -> anyhow::Result<CurrencySummary> {
        Ok(CurrencySummary {
            deposited: self.pool.total_deposited(currency)?,
            paid: self.pool.total_paid(currency)?,
            dust: self.pool.dust(currency)?,
            swept: self.pool.total_swept(currency)?,
        })
    }
}
