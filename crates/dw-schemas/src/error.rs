//! Shared error taxonomy (spec.md §7). Each crate converts its local error
//! type into [`DwError`] at its public boundary, the way `abp-error`
//! centralizes a taxonomy other crates in the agent-backplane pack convert
//! into rather than each crate inventing its own error enum ad hoc.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DwError {
    /// Raw command rejected by the parser. Recorded as INVALID, not retried.
    #[error("parse error at {offending_token:?}: {message}")]
    Parse {
        offending_token: String,
        message: String,
    },

    /// Document backend or integration port I/O failure. Retried implicitly
    /// at the next tick.
    #[error("transient backend error: {0}")]
    TransientBackend(String),

    /// Integration disabled, wallet not set up, insufficient gas, channel
    /// closed. Surfaced as command FAILED; user-actionable.
    #[error("precondition not met: {0}")]
    Precondition(String),

    /// Integration port reported a business failure (insufficient funds,
    /// recipient invalid). Command FAILED, message surfaced.
    #[error("execution failed: {0}")]
    Execution(String),

    /// Internal bug: an illegal state transition was attempted. Never
    /// corrupts repository state; the event is logged and the caller sees
    /// a generic error.
    #[error("illegal state transition: {0}")]
    IllegalStateTransition(String),

    /// APPROVED older than the stale-sweep threshold; swept to FAILED.
    #[error("stale command")]
    Stale,
}

impl DwError {
    /// User-facing text mirrored into the command's ERROR cell and the
    /// audit log (spec.md §7 "User-visible surface").
    pub fn user_message(&self) -> String {
        match self {
            DwError::Parse { message, .. } => message.clone(),
            DwError::TransientBackend(m) => m.clone(),
            DwError::Precondition(m) => m.clone(),
            DwError::Execution(m) => m.clone(),
            DwError::IllegalStateTransition(_) => "internal error".to_string(),
            DwError::Stale => "stale".to_string(),
        }
    }
}
