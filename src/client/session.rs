// ABOUTME: Session client owning one engine handle, the bind state machine, credentials and settings
// ABOUTME: Feeds engine notifications into the dispatcher and handles connection loss off the engine thread

use crate::client::builder::SessionBuilder;
use crate::client::config::{DrainPolicy, SessionConfig};
use crate::client::dispatcher::{DispatchStatus, Dispatcher};
use crate::client::error::{SessionResult, StateError};
use crate::client::subscribers::{Subscribers, SubscriptionId};
use crate::client::types::{AddressSet, SessionState};
use crate::datatypes::{BindType, DisconnectReason, InboundMessage, MessageSettings};
use crate::engine::{EngineEvents, EngineHandle, ProtocolEngine};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tracing::{debug, info, trace, warn};

/// Callback invoked when the engine reports the connection as lost
pub type ConnectionLostHandler = dyn Fn(DisconnectReason) + Send + Sync;

/// Session client for one binding to a message center
///
/// Owns a single engine handle for its whole life. All operations are
/// synchronous, may be called from any thread, and are serialized by one
/// session-wide lock. Inbound messages and connection-loss events are
/// delivered to subscribers on the tokio blocking pool, never on the
/// engine's thread and never from inside `bind`, `unbind` or
/// `send_message`.
///
/// # Example
///
/// ```rust,no_run
/// use smpp_session::client::SessionClient;
/// use smpp_session::datatypes::BindType;
/// # use smpp_session::engine::ProtocolEngine;
/// # use std::sync::Arc;
///
/// # fn example(engine: Arc<dyn ProtocolEngine>) -> Result<(), Box<dyn std::error::Error>> {
/// let session = SessionClient::builder(engine)
///     .system_id("test")
///     .password("secret")
///     .address("1000-1099")
///     .build()?;
///
/// session.on_new_message(|message| {
///     println!("{} -> {}: {}", message.from, message.to, message.text());
/// })?;
///
/// session.bind(BindType::Transceiver, "127.0.0.1", 2775)?;
/// session.send_message("1000", "5550100", "hi")?;
/// session.unbind()?;
/// session.dispose();
/// # Ok(())
/// # }
/// ```
pub struct SessionClient {
    engine: Arc<dyn ProtocolEngine>,
    shared: Arc<Shared>,
    config: SessionConfig,
}

/// State reachable from both the client and the engine's notification thread
struct Shared {
    inner: Mutex<SessionInner>,
    /// Bumped at every bind attempt; connection-loss events sampled under an
    /// older value belong to a binding that no longer exists
    generation: AtomicU64,
    losses: Mutex<LossQueue>,
    dispatcher: Arc<Dispatcher>,
    connection_lost: Subscribers<ConnectionLostHandler>,
    runtime: Handle,
}

/// Connection-loss reports with the bind generation they were sampled under
#[derive(Default)]
struct LossQueue {
    items: VecDeque<(DisconnectReason, u64)>,
    worker_active: bool,
}

/// Handles queued connection losses one at a time, in report order
struct LossWorker {
    shared: Arc<Shared>,
    started: bool,
}

impl LossWorker {
    fn run(mut self) {
        self.started = true;
        self.shared.drain_losses();
    }
}

impl Drop for LossWorker {
    fn drop(&mut self) {
        if self.started {
            return;
        }
        let mut losses = self.shared.losses.lock();
        losses.worker_active = false;
        warn!(
            "Runtime is shutting down; dropped {} connection-loss reports",
            losses.items.len()
        );
        losses.items.clear();
    }
}

struct SessionInner {
    state: SessionState,
    /// `None` before the engine allocated it and after dispose
    handle: Option<EngineHandle>,
    bind_type: Option<BindType>,
    system_id: String,
    password: String,
    system_type: String,
    addresses: AddressSet,
    settings: MessageSettings,
}

impl SessionInner {
    fn live_handle(&self) -> Result<EngineHandle, StateError> {
        match (self.state, self.handle) {
            (SessionState::Disposed, _) | (_, None) => Err(StateError::Disposed),
            (_, Some(handle)) => Ok(handle),
        }
    }

    fn bound_handle(&self) -> Result<EngineHandle, StateError> {
        let handle = self.live_handle()?;
        if self.state != SessionState::Bound {
            return Err(StateError::NotBound);
        }
        Ok(handle)
    }
}

#[derive(Copy, Clone, Debug)]
enum Credential {
    SystemId,
    Password,
    SystemType,
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Credential::SystemId => "system id",
            Credential::Password => "password",
            Credential::SystemType => "system type",
        };
        f.write_str(name)
    }
}

/// Engine-facing side of a session
struct SessionEvents {
    shared: Arc<Shared>,
}

impl EngineEvents for SessionEvents {
    fn on_message(&self, handle: EngineHandle, from: &str, to: &str, content: &[u8]) {
        trace!("{} delivered a message from {}", handle, from);
        self.shared.dispatcher.enqueue(InboundMessage::new(
            from,
            to,
            Bytes::copy_from_slice(content),
        ));
    }

    fn on_connection_lost(&self, handle: EngineHandle, reason: i32) {
        let reason = DisconnectReason::from(reason);
        let generation = self.shared.generation.load(Ordering::SeqCst);
        debug!("{} reported connection loss ({})", handle, reason);

        let start_worker = {
            let mut losses = self.shared.losses.lock();
            losses.items.push_back((reason, generation));
            !std::mem::replace(&mut losses.worker_active, true)
        };
        if start_worker {
            let worker = LossWorker {
                shared: Arc::clone(&self.shared),
                started: false,
            };
            drop(self.shared.runtime.spawn_blocking(move || worker.run()));
        }
    }
}

impl Shared {
    fn drain_losses(&self) {
        loop {
            let (reason, generation) = {
                let mut losses = self.losses.lock();
                match losses.items.pop_front() {
                    Some(loss) => loss,
                    None => {
                        losses.worker_active = false;
                        break;
                    }
                }
            };
            self.handle_connection_lost(reason, generation);
        }
    }

    fn handle_connection_lost(&self, reason: DisconnectReason, generation: u64) {
        let notify = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Disposed {
                debug!("Ignoring connection loss ({}) on a disposed session", reason);
                false
            } else if self.generation.load(Ordering::SeqCst) != generation {
                warn!(
                    "Dropping connection loss ({}) reported for a previous binding",
                    reason
                );
                false
            } else if inner.state == SessionState::Bound {
                inner.state = SessionState::Unbound;
                inner.bind_type = None;
                warn!("Connection lost: {}", reason);
                true
            } else {
                warn!("Connection loss ({}) reported while not bound", reason);
                true
            }
        };

        if notify {
            self.connection_lost
                .notify("ConnectionLost", |handler| handler(reason));
        }
    }
}

impl SessionClient {
    /// Start configuring a session on top of `engine`
    pub fn builder(engine: Arc<dyn ProtocolEngine>) -> SessionBuilder {
        SessionBuilder::new(engine)
    }

    /// Create a session with default configuration on the current tokio runtime
    pub fn new(engine: Arc<dyn ProtocolEngine>) -> SessionResult<Self> {
        SessionBuilder::new(engine).build()
    }

    /// Allocate the engine handle and wire its notifications to the dispatcher
    pub(crate) fn create(
        engine: Arc<dyn ProtocolEngine>,
        config: SessionConfig,
        runtime: Handle,
    ) -> Self {
        let shared = Arc::new(Shared {
            inner: Mutex::new(SessionInner {
                state: SessionState::Unbound,
                handle: None,
                bind_type: None,
                system_id: String::new(),
                password: String::new(),
                system_type: String::new(),
                addresses: AddressSet::new(),
                settings: MessageSettings::default(),
            }),
            generation: AtomicU64::new(0),
            losses: Mutex::new(LossQueue::default()),
            dispatcher: Dispatcher::new(runtime.clone()),
            connection_lost: Subscribers::default(),
            runtime,
        });

        let events = Arc::new(SessionEvents {
            shared: Arc::clone(&shared),
        });
        let handle = engine.create(events);
        shared.inner.lock().handle = Some(handle);
        debug!("Created session {}", handle);

        Self {
            engine,
            shared,
            config,
        }
    }

    /// Bind to the message center at `host:port`
    ///
    /// Pushes the bind type, server address, address range and message
    /// settings to the engine, in that order, then binds. On rejection the
    /// session stays unbound and the engine's reason is returned as
    /// `BindFailure`.
    pub fn bind(&self, bind_type: BindType, host: &str, port: u16) -> SessionResult<()> {
        let mut inner = self.shared.inner.lock();
        let handle = inner.live_handle()?;
        if inner.state == SessionState::Bound {
            return Err(StateError::AlreadyBound.into());
        }

        let address_range = inner.addresses.range_pattern();
        info!(
            "Binding {} as {} to {}:{} (address range {:?})",
            handle, bind_type, host, port, address_range
        );
        self.engine.set_login_type(handle, bind_type);
        self.engine.set_server_address(handle, host, port);
        self.engine.set_address_range(handle, &address_range);
        self.engine.set_message_settings(handle, &inner.settings);

        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        let result = self.engine.bind(handle);
        if let Err(err) = result.into_result() {
            warn!("Bind of {} rejected: {}", handle, result);
            return Err(err);
        }

        inner.state = SessionState::Bound;
        inner.bind_type = Some(bind_type);
        info!("{} bound as {}", handle, bind_type);
        Ok(())
    }

    /// Unbind from the message center
    pub fn unbind(&self) -> SessionResult<()> {
        let mut inner = self.shared.inner.lock();
        let handle = inner.bound_handle()?;

        self.engine.unbind(handle);
        inner.state = SessionState::Unbound;
        inner.bind_type = None;
        info!("{} unbound", handle);
        Ok(())
    }

    /// Send a text message
    ///
    /// The text is handed to the engine as UTF-8; the engine applies the
    /// configured data coding and packing. A rejected message leaves the
    /// session bound.
    pub fn send_message(&self, from: &str, to: &str, content: &str) -> SessionResult<()> {
        let inner = self.shared.inner.lock();
        let handle = inner.bound_handle()?;

        let result = self
            .engine
            .send_message(handle, from, to, content.as_bytes());
        drop(inner);

        if !result.is_ok() {
            warn!("Message {} -> {} rejected: {}", from, to, result);
        }
        result.into_result()
    }

    /// Set the system id; only allowed while unbound unless unchanged
    pub fn set_system_id(&self, system_id: impl Into<String>) -> SessionResult<()> {
        self.update_credential(Credential::SystemId, system_id.into())
    }

    /// Set the password; only allowed while unbound unless unchanged
    pub fn set_password(&self, password: impl Into<String>) -> SessionResult<()> {
        self.update_credential(Credential::Password, password.into())
    }

    /// Set the system type; only allowed while unbound unless unchanged
    pub fn set_system_type(&self, system_type: impl Into<String>) -> SessionResult<()> {
        self.update_credential(Credential::SystemType, system_type.into())
    }

    fn update_credential(&self, credential: Credential, value: String) -> SessionResult<()> {
        let mut inner = self.shared.inner.lock();
        let handle = inner.live_handle()?;
        let bound = inner.state == SessionState::Bound;

        let field = match credential {
            Credential::SystemId => &mut inner.system_id,
            Credential::Password => &mut inner.password,
            Credential::SystemType => &mut inner.system_type,
        };
        if *field == value {
            return Ok(());
        }
        if bound {
            return Err(StateError::AlreadyBound.into());
        }

        *field = value;
        match credential {
            Credential::SystemId => self.engine.set_system_id(handle, field),
            Credential::Password => self.engine.set_password(handle, field),
            Credential::SystemType => self.engine.set_system_type(handle, field),
        }
        debug!("Pushed {} to {}", credential, handle);
        Ok(())
    }

    /// Replace the message settings; only allowed while unbound unless unchanged
    pub fn set_settings(&self, settings: MessageSettings) -> SessionResult<()> {
        self.update_settings(|current| *current = settings)
    }

    /// Modify the message settings in place under the session lock
    ///
    /// `update` must not call back into this session.
    pub fn update_settings(
        &self,
        update: impl FnOnce(&mut MessageSettings),
    ) -> SessionResult<()> {
        let mut inner = self.shared.inner.lock();
        let handle = inner.live_handle()?;

        let mut settings = inner.settings;
        update(&mut settings);
        if settings == inner.settings {
            return Ok(());
        }
        if inner.state == SessionState::Bound {
            return Err(StateError::AlreadyBound.into());
        }

        inner.settings = settings;
        debug!("Updated message settings of {}", handle);
        Ok(())
    }

    /// Add an address-range pattern, returning false if already present
    ///
    /// Address changes are pushed to the engine at the next bind; while
    /// bound they have no effect on the current binding.
    pub fn add_address(&self, pattern: &str) -> SessionResult<bool> {
        let mut inner = self.shared.inner.lock();
        let handle = inner.live_handle()?;
        let added = inner.addresses.insert(pattern)?;
        if added && inner.state == SessionState::Bound {
            debug!("Address {:?} for {} takes effect on the next bind", pattern, handle);
        }
        Ok(added)
    }

    /// Remove an address-range pattern, returning false if absent
    pub fn remove_address(&self, pattern: &str) -> SessionResult<bool> {
        let mut inner = self.shared.inner.lock();
        let handle = inner.live_handle()?;
        let removed = inner.addresses.remove(pattern);
        if removed && inner.state == SessionState::Bound {
            debug!("Removal of {:?} for {} takes effect on the next bind", pattern, handle);
        }
        Ok(removed)
    }

    /// Remove every address-range pattern
    pub fn clear_addresses(&self) -> SessionResult<()> {
        let mut inner = self.shared.inner.lock();
        let handle = inner.live_handle()?;
        inner.addresses.clear();
        if inner.state == SessionState::Bound {
            debug!("Cleared addresses of {}; takes effect on the next bind", handle);
        }
        Ok(())
    }

    /// Current address-range patterns, sorted
    pub fn addresses(&self) -> Vec<String> {
        self.shared
            .inner
            .lock()
            .addresses
            .iter()
            .map(str::to_string)
            .collect()
    }

    /// The address range the next bind will push to the engine
    pub fn address_range(&self) -> String {
        self.shared.inner.lock().addresses.range_pattern()
    }

    /// Register a handler for inbound messages
    pub fn on_new_message<F>(&self, handler: F) -> SessionResult<SubscriptionId>
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.shared.inner.lock().live_handle()?;
        Ok(self.shared.dispatcher.subscribe(handler))
    }

    /// Register a handler for connection loss
    ///
    /// Losses are handled one at a time in the order the engine reported
    /// them, so handlers never run concurrently with each other.
    pub fn on_connection_lost<F>(&self, handler: F) -> SessionResult<SubscriptionId>
    where
        F: Fn(DisconnectReason) + Send + Sync + 'static,
    {
        self.shared.inner.lock().live_handle()?;
        Ok(self.shared.connection_lost.add(Arc::new(handler)))
    }

    /// Remove a handler registered with either `on_*` method
    pub fn unsubscribe(&self, id: SubscriptionId) -> SessionResult<bool> {
        self.shared.inner.lock().live_handle()?;
        Ok(self.shared.dispatcher.unsubscribe(id) || self.shared.connection_lost.remove(id))
    }

    /// Tear the session down
    ///
    /// Unbinds if bound, then releases the engine handle. Calling it again
    /// does nothing. Afterwards every operation fails with `Disposed`.
    pub fn dispose(&self) {
        let handle = {
            let mut inner = self.shared.inner.lock();
            let Some(handle) = inner.handle.take() else {
                return;
            };
            if inner.state == SessionState::Bound {
                debug!("Unbinding {} before release", handle);
                self.engine.unbind(handle);
            }
            self.engine.destroy(handle);
            inner.state = SessionState::Disposed;
            inner.bind_type = None;
            handle
        };

        if self.config.drain_policy == DrainPolicy::Discard {
            let dropped = self.shared.dispatcher.discard_pending();
            if dropped > 0 {
                debug!("Discarded {} undelivered messages of {}", dropped, handle);
            }
        }
        info!("Session {} disposed", handle);
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    /// Returns true while bound
    pub fn is_bound(&self) -> bool {
        self.state() == SessionState::Bound
    }

    /// Capability of the current binding
    pub fn bind_type(&self) -> Option<BindType> {
        self.shared.inner.lock().bind_type
    }

    /// The engine handle, until the session is disposed
    pub fn handle(&self) -> Option<EngineHandle> {
        self.shared.inner.lock().handle
    }

    /// Current system id
    pub fn system_id(&self) -> String {
        self.shared.inner.lock().system_id.clone()
    }

    /// Current password
    pub fn password(&self) -> String {
        self.shared.inner.lock().password.clone()
    }

    /// Current system type
    pub fn system_type(&self) -> String {
        self.shared.inner.lock().system_type.clone()
    }

    /// Current message settings
    pub fn settings(&self) -> MessageSettings {
        self.shared.inner.lock().settings
    }

    /// Activity of the inbound delivery queue
    pub fn dispatch_status(&self) -> DispatchStatus {
        self.shared.dispatcher.status()
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("SessionClient")
            .field("state", &inner.state)
            .field("handle", &inner.handle)
            .field("bind_type", &inner.bind_type)
            .field("system_id", &inner.system_id)
            .field("addresses", &inner.addresses)
            .finish()
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        if self.config.unbind_on_drop {
            self.dispose();
        }
    }
}
