// ABOUTME: Contract for the protocol engine that owns PDU encoding and the transport
// ABOUTME: The session core drives it through handle-based primitives and receives two notification channels

//! Protocol engine adapter
//!
//! The engine is the component that actually speaks SMPP: it frames PDUs,
//! owns the socket, answers keep-alives and applies the data coding rules
//! from [`MessageSettings`]. The session core never looks inside it. It
//! allocates one [`EngineHandle`] per session, configures it through the
//! setters below, and calls `bind`/`unbind`/`send_message`.
//!
//! Inbound traffic flows the other way through [`EngineEvents`], which the
//! engine invokes on a thread it controls. Implementations of `EngineEvents`
//! provided by this crate never block that thread and never run application
//! code on it.
//!
//! ## Implementing an engine
//!
//! ```rust
//! use smpp_session::datatypes::{BindResult, BindType, DeliveryResult, MessageSettings};
//! use smpp_session::engine::{EngineEvents, EngineHandle, ProtocolEngine};
//! use std::sync::Arc;
//!
//! /// Accepts every bind and every message without a network
//! struct NullEngine;
//!
//! impl ProtocolEngine for NullEngine {
//!     fn create(&self, _events: Arc<dyn EngineEvents>) -> EngineHandle {
//!         EngineHandle::new(1)
//!     }
//!     fn destroy(&self, _handle: EngineHandle) {}
//!     fn set_server_address(&self, _handle: EngineHandle, _host: &str, _port: u16) {}
//!     fn set_login_type(&self, _handle: EngineHandle, _bind_type: BindType) {}
//!     fn set_system_id(&self, _handle: EngineHandle, _system_id: &str) {}
//!     fn set_password(&self, _handle: EngineHandle, _password: &str) {}
//!     fn set_system_type(&self, _handle: EngineHandle, _system_type: &str) {}
//!     fn set_address_range(&self, _handle: EngineHandle, _pattern: &str) {}
//!     fn set_message_settings(&self, _handle: EngineHandle, _settings: &MessageSettings) {}
//!     fn bind(&self, _handle: EngineHandle) -> BindResult {
//!         BindResult::Ok
//!     }
//!     fn unbind(&self, _handle: EngineHandle) {}
//!     fn send_message(
//!         &self,
//!         _handle: EngineHandle,
//!         _from: &str,
//!         _to: &str,
//!         _content: &[u8],
//!     ) -> DeliveryResult {
//!         DeliveryResult::Ok
//!     }
//! }
//! ```

use crate::datatypes::{BindResult, BindType, DeliveryResult, MessageSettings};
use std::fmt;
use std::sync::Arc;

/// Opaque identifier of one engine client instance
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EngineHandle(u64);

impl EngineHandle {
    /// Wrap a raw engine identifier
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier as allocated by the engine
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "esme#{}", self.0)
    }
}

/// Notification channels the engine invokes asynchronously
///
/// Both methods are called on an engine-owned thread. Implementations must
/// return quickly and must not call back into the engine.
pub trait EngineEvents: Send + Sync {
    /// A deliver_sm arrived for the session identified by `handle`
    fn on_message(&self, handle: EngineHandle, from: &str, to: &str, content: &[u8]);

    /// The connection behind `handle` is gone.
    ///
    /// `reason` is the engine's raw disconnect code; see
    /// [`DisconnectReason`](crate::datatypes::DisconnectReason).
    fn on_connection_lost(&self, handle: EngineHandle, reason: i32);
}

/// Primitives offered by the protocol engine
///
/// All calls are synchronous and may block on the network. The session
/// serializes them per handle, so implementations only need to tolerate
/// calls for different handles arriving concurrently.
pub trait ProtocolEngine: Send + Sync {
    /// Allocate a client instance that reports inbound traffic to `events`
    fn create(&self, events: Arc<dyn EngineEvents>) -> EngineHandle;

    /// Release a client instance; called exactly once per handle
    fn destroy(&self, handle: EngineHandle);

    /// Set the message center address used by the next bind
    fn set_server_address(&self, handle: EngineHandle, host: &str, port: u16);

    /// Set the capability requested by the next bind
    fn set_login_type(&self, handle: EngineHandle, bind_type: BindType);

    /// Set the system id (user name)
    fn set_system_id(&self, handle: EngineHandle, system_id: &str);

    /// Set the password
    fn set_password(&self, handle: EngineHandle, password: &str);

    /// Set the system type
    fn set_system_type(&self, handle: EngineHandle, system_type: &str);

    /// Set the address range, patterns joined by `|`
    fn set_address_range(&self, handle: EngineHandle, pattern: &str);

    /// Set delivery encoding and feature flags
    fn set_message_settings(&self, handle: EngineHandle, settings: &MessageSettings);

    /// Connect and bind with the current configuration
    fn bind(&self, handle: EngineHandle) -> BindResult;

    /// Unbind and disconnect; always eventually succeeds
    fn unbind(&self, handle: EngineHandle);

    /// Submit a message whose body is UTF-8 encoded
    fn send_message(
        &self,
        handle: EngineHandle,
        from: &str,
        to: &str,
        content: &[u8],
    ) -> DeliveryResult;
}
