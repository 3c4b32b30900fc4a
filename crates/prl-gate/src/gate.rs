use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::Action;
use crate::error::GateError;

/// Phase of the pool's fundraising lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundraisingState {
    /// Accepting new claims (ticket issuance).
    #[default]
    Open,
    /// No new claims; terminal.
    Closed,
}

impl fmt::Display for FundraisingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// Which operations each phase permits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePolicy {
    /// Purchase only while open; deposits and withdrawals only once closed.
    #[default]
    Sequential,
    /// Purchase only while open; deposits and withdrawals in either phase.
    Continuous,
}

/// Two-state gate with a single irreversible `Open -> Closed` transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FundraisingGate {
    state: FundraisingState,
    policy: LifecyclePolicy,
}

impl FundraisingGate {
    pub fn new(policy: LifecyclePolicy) -> Self {
        Self {
            state: FundraisingState::Open,
            policy,
        }
    }

    /// Resume a gate persisted in `state`.
    pub fn with_state(policy: LifecyclePolicy, state: FundraisingState) -> Self {
        Self { state, policy }
    }

    pub fn state(&self) -> FundraisingState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == FundraisingState::Open
    }

    pub fn close(&mut self) -> Result<(), GateError> {
        if !self.is_open() {
            return Err(GateError::AlreadyClosed);
        }
        self.state = FundraisingState::Closed;
        tracing::info!("fundraising closed");
        Ok(())
    }

    pub fn require_open_for_purchase(&self) -> Result<(), GateError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(GateError::FundraisingClosed(Action::IssueTicket))
        }
    }

    pub fn require_closed_for_deposit(&self) -> Result<(), GateError> {
        self.require_closed(Action::RecordDeposit)
    }

    pub fn require_closed_for_withdraw(&self) -> Result<(), GateError> {
        self.require_closed(Action::Withdraw)
    }

    fn require_closed(&self, action: Action) -> Result<(), GateError> {
        match (self.policy, self.state) {
            (LifecyclePolicy::Sequential, FundraisingState::Open) => {
                Err(GateError::FundraisingOpen(action))
            }
            _ => Ok(()),
        }
    }
}
