// ABOUTME: Result codes reported by the protocol engine for a bind attempt
// ABOUTME: Non-Ok codes are surfaced to callers as SessionError::BindFailure

use crate::client::error::{SessionError, SessionResult};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// Outcome of the engine's bind primitive
#[derive(TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BindResult {
    /// Bound successfully
    Ok = 0,
    /// Unknown system id
    InvalidUser = 1,
    /// Wrong password
    InvalidPassword = 2,
    /// The address range is not valid for this user
    InvalidAddress = 3,
    /// The server does not accept this kind of bind; another bind type may work
    InvalidCommand = 4,
    /// Any other local or remote failure
    Fail = 5,
}

impl BindResult {
    /// Returns true if the bind was accepted
    pub fn is_ok(&self) -> bool {
        *self == BindResult::Ok
    }

    /// Converts a non-Ok code into a `BindFailure` error
    pub fn into_result(self) -> SessionResult<()> {
        match self {
            BindResult::Ok => Ok(()),
            reason => Err(SessionError::BindFailure(reason)),
        }
    }
}

impl fmt::Display for BindResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BindResult::Ok => "OK",
            BindResult::InvalidUser => "InvalidUser",
            BindResult::InvalidPassword => "InvalidPassword",
            BindResult::InvalidAddress => "InvalidAddressRange",
            BindResult::InvalidCommand => "InvalidCommand",
            BindResult::Fail => "NetworkError",
        };
        f.write_str(text)
    }
}
