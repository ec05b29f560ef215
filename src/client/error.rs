// ABOUTME: Session error types covering state preconditions and engine-reported failures
// ABOUTME: Every error is recoverable; a fresh bind may be attempted after any of them

use crate::datatypes::{BindResult, DeliveryResult};
use thiserror::Error;

/// Precondition violations detected locally, before the engine is called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    /// Re-binding, or changing credentials or settings, while bound
    #[error("Already bound")]
    AlreadyBound,

    /// Unbinding or sending while unbound
    #[error("Not bound")]
    NotBound,

    /// Any operation after the session was disposed
    #[error("Session disposed")]
    Disposed,
}

/// Error type for session client operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session is not in the right state for the operation
    #[error("Invalid session state: {0}")]
    InvalidState(#[from] StateError),

    /// The engine rejected the bind; the session stays unbound
    #[error("Bind failed: {0}")]
    BindFailure(BindResult),

    /// The engine rejected the message; the session state is unchanged
    #[error("Delivery failed: {0}")]
    DeliveryFailure(DeliveryResult),

    /// An address pattern is empty or contains the range separator
    #[error("Invalid address pattern: {0:?}")]
    InvalidAddress(String),

    /// No tokio runtime was supplied or found to run dispatch workers on
    #[error("No tokio runtime available for dispatch workers")]
    NoRuntime,
}

impl SessionError {
    /// Returns the state violation, if this is one
    pub fn state(&self) -> Option<StateError> {
        match self {
            SessionError::InvalidState(state) => Some(*state),
            _ => None,
        }
    }

    /// Returns true for locally detected precondition failures
    pub fn is_invalid_state(&self) -> bool {
        self.state().is_some()
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;
