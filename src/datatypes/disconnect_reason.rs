// ABOUTME: Reason codes carried by the engine's connection-lost notification
// ABOUTME: Unknown raw codes decode as NetworkError

use num_enum::{FromPrimitive, IntoPrimitive};
use std::fmt;

/// Why the engine reported the connection as lost
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// The session was unbound by the peer
    Unbind = 0,
    /// The server dropped the session, typically after unanswered keep-alives
    Kicked = 1,
    /// The transport failed
    #[num_enum(default)]
    NetworkError = 2,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DisconnectReason::Unbind => "Unbind",
            DisconnectReason::Kicked => "Kicked",
            DisconnectReason::NetworkError => "NetworkError",
        };
        f.write_str(text)
    }
}
