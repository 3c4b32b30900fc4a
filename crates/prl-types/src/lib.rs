//! Foundation types for the Pro-Rata Ledger (PRL).
//!
//! This crate provides the identity, currency, and identifier types shared by
//! every other PRL crate.
//!
//! # Key Types
//!
//! - [`AccountId`]: Opaque 32-byte identity of a depositor, owner, or admin
//! - [`Currency`]: Either the native currency or a fungible token
//! - [`TicketId`]: Sequential, gapless claim-token number
//! - [`DepositId`]: Sequential, gapless deposit number
//! - [`Amount`]: Unsigned value unit used for all accounting
//! - [`Timestamp`]: Wall-clock milliseconds attached to deposits and events

pub mod currency;
pub mod error;
pub mod identity;
pub mod ids;
pub mod temporal;

pub use currency::{Currency, TokenId};
pub use error::TypeError;
pub use identity::AccountId;
pub use ids::{Amount, DepositId, TicketId};
pub use temporal::Timestamp;
