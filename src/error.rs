//! Error taxonomy for the exchange.
//!
//! Every fallible operation returns [`EngineError`] synchronously at the call
//! boundary; nothing is retried internally. Settlement rejection is not an
//! error — it is a modeled outcome handled by the settlement bridge.

use thiserror::Error;

/// Errors surfaced by the exchange.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed submission (bad kind/side, zero quantity, zero price on a
    /// limit/stop). Rejected before any state mutation.
    #[error("validation: {0}")]
    Validation(String),

    /// Unknown order or trade reference.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller lacks the capability for the operation (non-owner edit/cancel,
    /// non-agent settlement callback).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Operation not legal in the entity's current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A data-model invariant would be broken. Indicates a defect in the
    /// matching algorithm itself, not bad input.
    #[error("consistency violation: {0}")]
    Consistency(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
