// ABOUTME: Result codes reported by the protocol engine when submitting an outbound message
// ABOUTME: Non-Ok codes are surfaced to callers as SessionError::DeliveryFailure

use crate::client::error::{SessionError, SessionResult};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// Outcome of the engine's send primitive
#[derive(TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryResult {
    /// Accepted for delivery
    Ok = 0,
    /// Rejected by the server, usually because the session is bound as receiver
    Rejected = 1,
    /// Source address refused
    InvalidSourceAddress = 2,
    /// Destination address refused
    InvalidDestinationAddress = 3,
    /// Any other failure
    Fail = 4,
}

impl DeliveryResult {
    /// Returns true if the message was accepted
    pub fn is_ok(&self) -> bool {
        *self == DeliveryResult::Ok
    }

    /// Converts a non-Ok code into a `DeliveryFailure` error
    pub fn into_result(self) -> SessionResult<()> {
        match self {
            DeliveryResult::Ok => Ok(()),
            reason => Err(SessionError::DeliveryFailure(reason)),
        }
    }
}

impl fmt::Display for DeliveryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DeliveryResult::Ok => "OK",
            DeliveryResult::Rejected => "Rejected",
            DeliveryResult::InvalidSourceAddress => "Invalid Source Address",
            DeliveryResult::InvalidDestinationAddress => "Invalid Destination Address",
            DeliveryResult::Fail => "Unknown Error",
        };
        f.write_str(text)
    }
}
