// ABOUTME: Session client module: bind state machine, delivery dispatcher and their supporting types
// ABOUTME: Exports the public session API consumed by front ends

//! SMPP Session Client Module
//!
//! This module sits between a protocol engine and the application:
//!
//! * **Bind lifecycle** - `Unbound -> Bound -> Unbound`, with credentials and
//!   settings frozen while bound
//! * **Ordered delivery** - inbound messages reach subscribers in arrival
//!   order, one at a time, off the engine's thread
//! * **Connection loss** - forces the session unbound and notifies subscribers
//! * **Clean teardown** - `dispose` unbinds if needed and releases the engine
//!   handle exactly once
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smpp_session::client::SessionClient;
//! use smpp_session::datatypes::BindType;
//! # use smpp_session::engine::ProtocolEngine;
//! # use std::sync::Arc;
//!
//! # fn example(engine: Arc<dyn ProtocolEngine>) -> Result<(), Box<dyn std::error::Error>> {
//! let session = SessionClient::new(engine)?;
//! session.set_system_id("test")?;
//! session.set_password("secret")?;
//! session.add_address("1000-1099")?;
//!
//! session.on_new_message(|message| println!("{}: {}", message.from, message.text()))?;
//! session.on_connection_lost(|reason| eprintln!("connection lost: {}", reason))?;
//!
//! session.bind(BindType::Transceiver, "127.0.0.1", 2775)?;
//! session.send_message("1000", "5550100", "hi")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Threading
//!
//! Every operation is synchronous and may be called from any thread,
//! including from inside a subscriber. Subscribers run on the tokio
//! blocking pool of the runtime given to the builder (or the runtime
//! current at build time), so a session must be built inside, or handed, a
//! tokio runtime.

pub mod builder;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod session;
mod subscribers;
pub mod types;

// Re-export the main types for easy access
pub use builder::SessionBuilder;
pub use config::{DrainPolicy, SessionConfig};
pub use dispatcher::{DispatchStatus, Dispatcher, MessageHandler};
pub use error::{SessionError, SessionResult, StateError};
pub use session::{ConnectionLostHandler, SessionClient};
pub use subscribers::SubscriptionId;
pub use types::{ADDRESS_SEPARATOR, AddressSet, SessionState};
