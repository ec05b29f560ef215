// ABOUTME: Bind capability requested from the message center when a session is established
// ABOUTME: Wire values match the engine's login-type codes (receiver, transmitter, transceiver)

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// Capability requested at bind time.
///
/// Fixed for the lifetime of a binding; a different capability requires an
/// unbind followed by a new bind.
#[derive(TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BindType {
    /// Receive-only session
    Receiver = 0,
    /// Send-only session
    Transmitter = 1,
    /// Session that can both send and receive
    Transceiver = 2,
}

impl BindType {
    /// Returns true if a session bound with this capability may submit messages
    pub fn can_transmit(&self) -> bool {
        matches!(self, BindType::Transmitter | BindType::Transceiver)
    }

    /// Returns true if a session bound with this capability receives deliveries
    pub fn can_receive(&self) -> bool {
        matches!(self, BindType::Receiver | BindType::Transceiver)
    }
}

impl fmt::Display for BindType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BindType::Receiver => "Receiver",
            BindType::Transmitter => "Transmitter",
            BindType::Transceiver => "Transceiver",
        };
        f.write_str(name)
    }
}
