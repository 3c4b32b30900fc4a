//! Pool facade for the Pro-Rata Ledger.
//!
//! [`Pool`] serializes every mutation of one ledger behind a single lock
//! and pays tickets through injected collaborators. This is the main entry
//! point for applications embedding the ledger.

pub mod collab;
pub mod config;
pub mod error;
pub mod events;
pub mod payout;
pub mod pool;
pub mod snapshot;
pub mod tickets;
pub mod vault;

pub use collab::{OwnershipOracle, TicketIssuer, TransferError, ValueTransfer};
pub use config::PoolConfig;
pub use error::{PoolError, PoolResult};
pub use events::{PoolEvent, PoolEventKind};
pub use payout::{Payout, PayoutEngine, ProratedEntry, WithdrawOutcome};
pub use pool::{Collaborators, Pool};
pub use snapshot::PoolSnapshot;
pub use tickets::TicketBook;
pub use vault::InMemoryVault;

// Re-export key types
pub use prl_gate::{Action, AllowAll, Authorizer, FundraisingState, LifecyclePolicy, Role, RoleTable};
pub use prl_ledger::{Deposit, LedgerSnapshot, ValidationReport};
pub use prl_types::{AccountId, Amount, Currency, DepositId, TicketId, TokenId};
