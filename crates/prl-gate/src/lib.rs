//! Lifecycle gate and caller authorization for the Pro-Rata Ledger.
//!
//! A pool starts `Open` (tickets can be issued) and is closed exactly once.
//! The [`LifecyclePolicy`] decides which phase deposits and withdrawals
//! belong to. Independently, every mutating call names its caller and is
//! checked by an injected [`Authorizer`].
//!
//! # Quick Start
//!
//! ```rust
//! use prl_gate::{Action, Authorizer, FundraisingGate, LifecyclePolicy, Role, RoleTable};
//! use prl_types::AccountId;
//!
//! let admin = AccountId::from_label("admin");
//! let roles = RoleTable::new().with(admin.clone(), Role::Admin);
//! assert!(roles.authorize(&admin, Action::CloseFundraising).is_ok());
//!
//! let mut gate = FundraisingGate::new(LifecyclePolicy::Sequential);
//! assert!(gate.require_closed_for_withdraw().is_err());
//! gate.close().unwrap();
//! assert!(gate.require_closed_for_withdraw().is_ok());
//! ```

pub mod auth;
pub mod error;
pub mod gate;

pub use auth::{Action, AllowAll, Authorizer, Role, RoleTable};
pub use error::GateError;
pub use gate::{FundraisingGate, FundraisingState, LifecyclePolicy};
