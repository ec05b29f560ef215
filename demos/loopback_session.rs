// ABOUTME: Session client demo running against an in-process loopback engine
// ABOUTME: Shows binding, sending, ordered inbound delivery, connection loss and teardown

//! # Loopback Session
//!
//! Drives a [`SessionClient`] against an engine that echoes every sent
//! message back as an inbound message from a thread of its own, the way a
//! real engine reports deliveries from its network thread.
//!
//! ## Usage
//!
//! ```bash
//! # Bind as transceiver and send five messages
//! cargo run --example loopback_session -- --system-id test --count 5
//!
//! # Reject the bind, or drop the connection after sending
//! cargo run --example loopback_session -- --reject-bind
//! cargo run --example loopback_session -- --kick -d
//! ```

use argh::FromArgs;
use parking_lot::Mutex;
use smpp_session::client::SessionClient;
use smpp_session::datatypes::*;
use smpp_session::engine::{EngineEvents, EngineHandle, ProtocolEngine};
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Session client against a loopback engine
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: Option<String>,

    /// the password
    #[argh(option)]
    password: Option<String>,

    /// address-range pattern to bind with (default: 1000-1099)
    #[argh(option, short = 'a')]
    address: Option<String>,

    /// number of messages to send (default: 3)
    #[argh(option, short = 'n')]
    count: Option<u32>,

    /// the telephone number that the messages will be from (default: 1000)
    #[argh(option, short = 'f')]
    from: Option<String>,

    /// the recipient telephone number (default: 5550100)
    #[argh(option, short = 't')]
    to: Option<String>,

    /// make the engine reject the bind with an invalid password
    #[argh(switch)]
    reject_bind: bool,

    /// make the engine drop the connection once the echoes arrived
    #[argh(switch)]
    kick: bool,
}

/// Engine that binds when told to and echoes every message back
struct LoopbackEngine {
    next_handle: AtomicU64,
    events: Mutex<Option<(EngineHandle, Arc<dyn EngineEvents>)>>,
    reject_bind: bool,
}

impl LoopbackEngine {
    fn new(reject_bind: bool) -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            events: Mutex::new(None),
            reject_bind,
        }
    }

    fn listener(&self) -> Option<(EngineHandle, Arc<dyn EngineEvents>)> {
        self.events.lock().clone()
    }

    /// Report a kicked connection from the engine's own thread
    fn kick(&self) {
        if let Some((handle, events)) = self.listener() {
            thread::spawn(move || events.on_connection_lost(handle, DisconnectReason::Kicked.into()));
        }
    }
}

impl ProtocolEngine for LoopbackEngine {
    fn create(&self, events: Arc<dyn EngineEvents>) -> EngineHandle {
        let handle = EngineHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        *self.events.lock() = Some((handle, events));
        handle
    }

    fn destroy(&self, handle: EngineHandle) {
        debug!("engine: releasing {}", handle);
        self.events.lock().take();
    }

    fn set_server_address(&self, handle: EngineHandle, host: &str, port: u16) {
        debug!("engine: {} server {}:{}", handle, host, port);
    }

    fn set_login_type(&self, handle: EngineHandle, bind_type: BindType) {
        debug!("engine: {} login type {}", handle, bind_type);
    }

    fn set_system_id(&self, handle: EngineHandle, system_id: &str) {
        debug!("engine: {} system id {:?}", handle, system_id);
    }

    fn set_password(&self, handle: EngineHandle, _password: &str) {
        debug!("engine: {} password set", handle);
    }

    fn set_system_type(&self, handle: EngineHandle, system_type: &str) {
        debug!("engine: {} system type {:?}", handle, system_type);
    }

    fn set_address_range(&self, handle: EngineHandle, pattern: &str) {
        debug!("engine: {} address range {:?}", handle, pattern);
    }

    fn set_message_settings(&self, handle: EngineHandle, settings: &MessageSettings) {
        debug!(
            "engine: {} coding {} max length {}",
            handle,
            settings.effective_data_coding(),
            settings.effective_max_message_length()
        );
    }

    fn bind(&self, _handle: EngineHandle) -> BindResult {
        if self.reject_bind {
            BindResult::InvalidPassword
        } else {
            BindResult::Ok
        }
    }

    fn unbind(&self, handle: EngineHandle) {
        debug!("engine: {} unbind", handle);
    }

    fn send_message(&self, _handle: EngineHandle, from: &str, to: &str, content: &[u8]) -> DeliveryResult {
        if to.is_empty() {
            return DeliveryResult::InvalidDestinationAddress;
        }
        if let Some((handle, events)) = self.listener() {
            let (from, to, content) = (from.to_string(), to.to_string(), content.to_vec());
            thread::spawn(move || events.on_message(handle, &to, &from, &content));
        }
        DeliveryResult::Ok
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging { Level::DEBUG } else { Level::INFO })
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let count = cli_args.count.unwrap_or(3);
    let from = cli_args.from.unwrap_or_else(|| "1000".to_owned());
    let to = cli_args.to.unwrap_or_else(|| "5550100".to_owned());

    let engine = Arc::new(LoopbackEngine::new(cli_args.reject_bind));
    let session = SessionClient::builder(engine.clone())
        .system_id(cli_args.system_id.unwrap_or_default())
        .password(cli_args.password.unwrap_or_default())
        .address(cli_args.address.unwrap_or_else(|| "1000-1099".to_owned()))
        .settings(MessageSettings::default().with_deliver_data_coding(DataCoding::Latin1))
        .build()?;

    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
    session.on_new_message(move |message| {
        info!("Received from {}: {}", message.from, message.text());
        let _ = inbound_tx.send(());
    })?;
    let (lost_tx, mut lost_rx) = mpsc::unbounded_channel();
    session.on_connection_lost(move |reason| {
        warn!("Connection lost: {}", reason);
        let _ = lost_tx.send(reason);
    })?;

    if let Err(e) = session.bind(BindType::Transceiver, "127.0.0.1", 2775) {
        error!("Bind failed: {e}");
        session.dispose();
        return Err(e.into());
    }

    for i in 1..=count {
        session.send_message(&from, &to, &format!("message {i} of {count}"))?;
    }
    info!("Sent {} messages", count);

    for _ in 0..count {
        if timeout(Duration::from_secs(5), inbound_rx.recv()).await.is_err() {
            warn!("Timed out waiting for echoes");
            break;
        }
    }
    info!("Dispatch status: {:?}", session.dispatch_status());

    if cli_args.kick {
        engine.kick();
        if let Ok(Some(reason)) = timeout(Duration::from_secs(5), lost_rx.recv()).await {
            info!("Session is {} after {}", session.state(), reason);
        }
        if let Err(e) = session.send_message(&from, &to, "after the kick") {
            info!("Send after connection loss refused: {e}");
        }
    }

    session.dispose();
    info!("Done");
    Ok(())
}
