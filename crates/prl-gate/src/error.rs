use prl_types::AccountId;

use crate::auth::Action;

/// Errors raised by the fundraising gate and authorization checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// `close` was called on a gate that is already closed.
    #[error("fundraising is already closed")]
    AlreadyClosed,

    /// The operation requires fundraising to be closed.
    #[error("fundraising is still open; {0} is not allowed yet")]
    FundraisingOpen(Action),

    /// The operation requires fundraising to be open.
    #[error("fundraising is closed; {0} is no longer allowed")]
    FundraisingClosed(Action),

    /// The caller is not permitted to perform the action.
    #[error("{caller} is not authorized to {action}")]
    Unauthorized { caller: AccountId, action: Action },
}
