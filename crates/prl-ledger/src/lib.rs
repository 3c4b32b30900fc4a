//! Append-only deposit ledger for the Pro-Rata Ledger (PRL).
//!
//! This crate holds the accounting state of one pool. It provides:
//! - [`CurrencyRegistry`]: first-seen ordered set of deposited currencies
//! - [`ClaimRegistry`]: the strictly increasing claim-count denominator
//! - [`DepositLedger`]: immutable deposit records with claim-count snapshots
//! - [`RedemptionIndex`]: per-(ticket, deposit) redeemed flags
//! - [`Ledger`]: the four components mutated together
//! - [`LedgerValidator`] and [`LedgerSnapshot`] for integrity checks and
//!   persistence

pub mod claims;
pub mod currency;
pub mod deposit;
pub mod error;
pub mod ledger;
pub mod redemption;
pub mod snapshot;
pub mod traits;
pub mod validation;

pub use claims::ClaimRegistry;
pub use currency::CurrencyRegistry;
pub use deposit::{Deposit, DepositLedger, DepositRequest};
pub use error::LedgerError;
pub use ledger::Ledger;
pub use redemption::RedemptionIndex;
pub use snapshot::{LedgerSnapshot, SNAPSHOT_VERSION};
pub use traits::LedgerReader;
pub use validation::{LedgerValidator, ValidationReport, Violation, ViolationKind};
