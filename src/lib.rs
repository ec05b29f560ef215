//! Session client for SMPP message centers.
//!
//! The crate manages a binding to a message center on top of a protocol
//! engine that does the actual PDU work. It enforces the bind lifecycle,
//! sends outbound text, and delivers inbound messages and connection-loss
//! events to subscribers in order and off the engine's thread.
//!
//! * [`engine`] - the contract a protocol engine implements
//! * [`client`] - the session client, its builder and the delivery dispatcher
//! * [`datatypes`] - bind types, data codings, result codes and settings

pub mod client;
pub mod datatypes;
pub mod engine;

#[cfg(test)]
mod tests;

// Re-export the main client API for easy access
pub use client::{
    DrainPolicy, SessionBuilder, SessionClient, SessionConfig, SessionError, SessionResult,
    SessionState, StateError, SubscriptionId,
};
pub use datatypes::{
    BindResult, BindType, DataCoding, DeliveryResult, DisconnectReason, InboundMessage,
    MessageSettings,
};
pub use engine::{EngineEvents, EngineHandle, ProtocolEngine};

/// Boxed error for binaries and demos that mix this crate's errors with others
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type using the boxed [`Error`].
///
/// # Example
///
/// ```rust,no_run
/// use smpp_session::{BindType, SessionClient};
/// # use smpp_session::ProtocolEngine;
/// # use std::sync::Arc;
///
/// # fn run(engine: Arc<dyn ProtocolEngine>) -> smpp_session::Result<()> {
/// let session = SessionClient::builder(engine)
///     .system_id("system_id")
///     .password("password")
///     .address("1000-1099")
///     .build()?;
///
/// session.bind(BindType::Transmitter, "localhost", 2775)?;
/// session.send_message("1000", "5550100", "Hello, World!")?;
///
/// // Unbinds and releases the engine handle
/// session.dispose();
/// # Ok(())
/// # }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
