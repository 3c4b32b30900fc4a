//! Caller authorization for mutating pool operations.
//!
//! The pool never decides on its own who may call what. Every mutating
//! method receives the caller's [`AccountId`] and asks an injected
//! [`Authorizer`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use prl_types::AccountId;
use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// A mutating pool operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    IssueTicket,
    RecordDeposit,
    Withdraw,
    GrowClaimCount,
    CloseFundraising,
    SweepDust,
}

impl Action {
    /// The role a [`RoleTable`] requires for this action, if any.
    ///
    /// Deposits are permissionless and withdrawals are authorized by ticket
    /// ownership instead of a role.
    pub fn required_role(self) -> Option<Role> {
        match self {
            Self::IssueTicket => Some(Role::Issuer),
            Self::GrowClaimCount | Self::CloseFundraising | Self::SweepDust => Some(Role::Admin),
            Self::RecordDeposit | Self::Withdraw => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::IssueTicket => "issue tickets",
            Self::RecordDeposit => "record deposits",
            Self::Withdraw => "withdraw",
            Self::GrowClaimCount => "grow the claim count",
            Self::CloseFundraising => "close fundraising",
            Self::SweepDust => "sweep dust",
        };
        f.write_str(s)
    }
}

/// A role that can be granted in a [`RoleTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May grow the claim count, close fundraising and sweep dust.
    Admin,
    /// May issue tickets.
    Issuer,
}

/// Decides whether a caller may perform an action.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, caller: &AccountId, action: Action) -> bool;

    /// [`is_authorized`](Self::is_authorized) as a `Result`.
    fn authorize(&self, caller: &AccountId, action: Action) -> Result<(), GateError> {
        if self.is_authorized(caller, action) {
            Ok(())
        } else {
            tracing::debug!(%caller, %action, "authorization denied");
            Err(GateError::Unauthorized {
                caller: caller.clone(),
                action,
            })
        }
    }
}

/// Any `Fn(&AccountId, Action) -> bool` can serve as an authorizer.
impl<F> Authorizer for F
where
    F: Fn(&AccountId, Action) -> bool + Send + Sync,
{
    fn is_authorized(&self, caller: &AccountId, action: Action) -> bool {
        self(caller, action)
    }
}

/// Permits every caller every action.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn is_authorized(&self, _caller: &AccountId, _action: Action) -> bool {
        true
    }
}

/// Role grants per account.
#[derive(Clone, Debug, Default)]
pub struct RoleTable {
    grants: HashMap<AccountId, HashSet<Role>>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`grant`](Self::grant).
    pub fn with(mut self, account: AccountId, role: Role) -> Self {
        self.grant(account, role);
        self
    }

    pub fn grant(&mut self, account: AccountId, role: Role) {
        self.grants.entry(account).or_default().insert(role);
    }

    /// Returns `true` if the role was held.
    pub fn revoke(&mut self, account: &AccountId, role: Role) -> bool {
        self.grants
            .get_mut(account)
            .is_some_and(|roles| roles.remove(&role))
    }

    pub fn has_role(&self, account: &AccountId, role: Role) -> bool {
        self.grants
            .get(account)
            .is_some_and(|roles| roles.contains(&role))
    }
}

impl Authorizer for RoleTable {
    fn is_authorized(&self, caller: &AccountId, action: Action) -> bool {
        match action.required_role() {
            Some(role) => self.has_role(caller, role),
            None => true,
        }
    }
}
