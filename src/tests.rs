//! Integration tests for the session client driven by a recording engine

use crate::client::{DrainPolicy, SessionClient, SessionConfig, SessionError, SessionState, StateError};
use crate::datatypes::*;
use crate::engine::{EngineEvents, EngineHandle, ProtocolEngine};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Create,
    Destroy(EngineHandle),
    ServerAddress(String, u16),
    LoginType(BindType),
    SystemId(String),
    Password(String),
    SystemType(String),
    AddressRange(String),
    Settings(MessageSettings),
    Bind,
    Unbind,
    Send { from: String, to: String, content: Vec<u8> },
}

/// Engine double that records every primitive and lets tests play the
/// engine's notification thread
pub(crate) struct RecordingEngine {
    calls: Mutex<Vec<Call>>,
    events: Mutex<Option<(EngineHandle, Arc<dyn EngineEvents>)>>,
    bind_result: Mutex<BindResult>,
    delivery_result: Mutex<DeliveryResult>,
}

impl RecordingEngine {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            events: Mutex::new(None),
            bind_result: Mutex::new(BindResult::Ok),
            delivery_result: Mutex::new(DeliveryResult::Ok),
        })
    }

    pub(crate) fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub(crate) fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| matches(call)).count()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().clear();
    }

    pub(crate) fn reply_to_bind(&self, result: BindResult) {
        *self.bind_result.lock() = result;
    }

    pub(crate) fn reply_to_send(&self, result: DeliveryResult) {
        *self.delivery_result.lock() = result;
    }

    /// Deliver inbound messages from a separate thread, in order
    pub(crate) fn inject_messages(&self, messages: Vec<(&'static str, &'static str, Vec<u8>)>) -> thread::ThreadId {
        let (handle, events) = self.events.lock().clone().unwrap();
        thread::spawn(move || {
            for (from, to, content) in messages {
                events.on_message(handle, from, to, &content);
            }
            thread::current().id()
        })
        .join()
        .unwrap()
    }

    pub(crate) fn lose_connection(&self, reason: i32) {
        self.lose_connection_burst(vec![reason]);
    }

    /// Report several losses back to back from one engine thread
    pub(crate) fn lose_connection_burst(&self, reasons: Vec<i32>) {
        let listener = self.listener();
        thread::spawn(move || {
            for reason in reasons {
                listener.1.on_connection_lost(listener.0, reason);
            }
        })
        .join()
        .unwrap();
    }

    /// The session's notification sink, kept even after the engine released it
    pub(crate) fn listener(&self) -> (EngineHandle, Arc<dyn EngineEvents>) {
        self.events.lock().clone().unwrap()
    }
}

impl ProtocolEngine for RecordingEngine {
    fn create(&self, events: Arc<dyn EngineEvents>) -> EngineHandle {
        let handle = EngineHandle::new(42);
        *self.events.lock() = Some((handle, events));
        self.record(Call::Create);
        handle
    }

    fn destroy(&self, handle: EngineHandle) {
        self.events.lock().take();
        self.record(Call::Destroy(handle));
    }

    fn set_server_address(&self, _handle: EngineHandle, host: &str, port: u16) {
        self.record(Call::ServerAddress(host.to_string(), port));
    }

    fn set_login_type(&self, _handle: EngineHandle, bind_type: BindType) {
        self.record(Call::LoginType(bind_type));
    }

    fn set_system_id(&self, _handle: EngineHandle, system_id: &str) {
        self.record(Call::SystemId(system_id.to_string()));
    }

    fn set_password(&self, _handle: EngineHandle, password: &str) {
        self.record(Call::Password(password.to_string()));
    }

    fn set_system_type(&self, _handle: EngineHandle, system_type: &str) {
        self.record(Call::SystemType(system_type.to_string()));
    }

    fn set_address_range(&self, _handle: EngineHandle, pattern: &str) {
        self.record(Call::AddressRange(pattern.to_string()));
    }

    fn set_message_settings(&self, _handle: EngineHandle, settings: &MessageSettings) {
        self.record(Call::Settings(*settings));
    }

    fn bind(&self, _handle: EngineHandle) -> BindResult {
        self.record(Call::Bind);
        *self.bind_result.lock()
    }

    fn unbind(&self, _handle: EngineHandle) {
        self.record(Call::Unbind);
    }

    fn send_message(
        &self,
        _handle: EngineHandle,
        from: &str,
        to: &str,
        content: &[u8],
    ) -> DeliveryResult {
        self.record(Call::Send {
            from: from.to_string(),
            to: to.to_string(),
            content: content.to_vec(),
        });
        *self.delivery_result.lock()
    }
}

pub(crate) fn session(engine: &Arc<RecordingEngine>) -> SessionClient {
    SessionClient::new(engine.clone()).unwrap()
}

fn state_error<T: std::fmt::Debug>(result: Result<T, SessionError>) -> StateError {
    result.unwrap_err().state().unwrap()
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_transceiver_scenario() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        client.set_system_id("test").unwrap();
        client.add_address("1000-1099").unwrap();

        let (lost_tx, mut lost_rx) = mpsc::unbounded_channel();
        client.on_connection_lost(move |reason| {
            let _ = lost_tx.send(reason);
        })
        .unwrap();

        client
            .bind(BindType::Transceiver, "127.0.0.1", 9090)
            .unwrap();
        assert_eq!(client.state(), SessionState::Bound);
        assert_eq!(client.bind_type(), Some(BindType::Transceiver));

        assert_eq!(
            state_error(client.bind(BindType::Transceiver, "127.0.0.1", 9090)),
            StateError::AlreadyBound
        );

        client.send_message("1000", "5550100", "hi").unwrap();
        assert!(engine.calls().contains(&Call::Send {
            from: "1000".to_string(),
            to: "5550100".to_string(),
            content: b"hi".to_vec(),
        }));

        engine.lose_connection(DisconnectReason::NetworkError.into());
        let reason = timeout(Duration::from_secs(5), lost_rx.recv())
            .await
            .unwrap();
        assert_eq!(reason, Some(DisconnectReason::NetworkError));
        assert_eq!(client.state(), SessionState::Unbound);
        assert!(lost_rx.try_recv().is_err());

        assert_eq!(
            state_error(client.send_message("1000", "5550100", "hi")),
            StateError::NotBound
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bind_pushes_configuration_in_order() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        let settings = MessageSettings::default().with_deliver_data_coding(DataCoding::Latin1);
        client.set_settings(settings).unwrap();
        client.add_address("2000").unwrap();
        client.add_address("1000-1099").unwrap();
        engine.clear();

        client.bind(BindType::Receiver, "smsc.local", 2775).unwrap();

        assert_eq!(
            engine.calls(),
            vec![
                Call::LoginType(BindType::Receiver),
                Call::ServerAddress("smsc.local".to_string(), 2775),
                Call::AddressRange("1000-1099|2000".to_string()),
                Call::Settings(settings),
                Call::Bind,
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_address_range_reflects_current_set() {
        let engine = RecordingEngine::new();
        let client = session(&engine);

        client.add_address("3000").unwrap();
        client.add_address("1000").unwrap();
        client.add_address("3000").unwrap();
        client.add_address("2000").unwrap();
        assert!(client.remove_address("1000").unwrap());
        assert!(!client.remove_address("9999").unwrap());
        assert_eq!(client.addresses(), vec!["2000", "3000"]);

        client.bind(BindType::Transmitter, "localhost", 2775).unwrap();
        assert!(engine.calls().contains(&Call::AddressRange("2000|3000".to_string())));

        // Changes while bound are accepted but only reach the engine on the next bind
        client.clear_addresses().unwrap();
        client.add_address("4000").unwrap();
        assert_eq!(engine.count(|call| matches!(call, Call::AddressRange(_))), 1);

        client.unbind().unwrap();
        client.bind(BindType::Transmitter, "localhost", 2775).unwrap();
        assert_eq!(
            engine.calls().iter().rev().find(|call| matches!(call, Call::AddressRange(_))),
            Some(&Call::AddressRange("4000".to_string()))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invalid_address_is_rejected() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        assert!(matches!(
            client.add_address("1000|2000"),
            Err(SessionError::InvalidAddress(_))
        ));
        assert!(client.addresses().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bind_while_bound_does_not_reach_engine() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        client.bind(BindType::Transmitter, "localhost", 2775).unwrap();

        for _ in 0..3 {
            assert_eq!(
                state_error(client.bind(BindType::Receiver, "other", 1)),
                StateError::AlreadyBound
            );
        }
        assert_eq!(engine.count(|call| *call == Call::Bind), 1);
        assert_eq!(client.bind_type(), Some(BindType::Transmitter));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_send_and_unbind_while_unbound_do_not_reach_engine() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        engine.clear();

        assert_eq!(
            state_error(client.send_message("1000", "5550100", "hi")),
            StateError::NotBound
        );
        assert_eq!(state_error(client.unbind()), StateError::NotBound);
        assert!(engine.calls().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_credential_setters_skip_unchanged_values() {
        let engine = RecordingEngine::new();
        let client = session(&engine);

        client.set_system_id("test").unwrap();
        client.set_system_id("test").unwrap();
        client.set_password("secret").unwrap();
        client.set_password("secret").unwrap();
        client.set_system_type("").unwrap();

        assert_eq!(engine.count(|call| matches!(call, Call::SystemId(_))), 1);
        assert_eq!(engine.count(|call| matches!(call, Call::Password(_))), 1);
        assert_eq!(engine.count(|call| matches!(call, Call::SystemType(_))), 0);
        assert_eq!(client.system_id(), "test");
        assert_eq!(client.password(), "secret");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_credentials_and_settings_frozen_while_bound() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        client.set_system_id("test").unwrap();
        client.bind(BindType::Transceiver, "localhost", 2775).unwrap();

        assert_eq!(state_error(client.set_system_id("other")), StateError::AlreadyBound);
        assert_eq!(state_error(client.set_password("pw")), StateError::AlreadyBound);
        assert_eq!(state_error(client.set_system_type("VMA")), StateError::AlreadyBound);
        assert_eq!(
            state_error(client.update_settings(|settings| settings.enable_submit_multi = false)),
            StateError::AlreadyBound
        );
        assert_eq!(client.system_id(), "test");
        assert!(client.settings().enable_submit_multi);

        // Re-assigning the current value is not a mutation
        client.set_system_id("test").unwrap();
        client.set_settings(client.settings()).unwrap();

        client.unbind().unwrap();
        client.set_system_id("other").unwrap();
        client
            .update_settings(|settings| settings.enable_submit_multi = false)
            .unwrap();
        assert!(!client.settings().enable_submit_multi);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bind_failure_leaves_session_unbound() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        engine.reply_to_bind(BindResult::InvalidPassword);

        let err = client.bind(BindType::Transmitter, "localhost", 2775).unwrap_err();
        assert!(matches!(err, SessionError::BindFailure(BindResult::InvalidPassword)));
        assert_eq!(client.state(), SessionState::Unbound);
        assert_eq!(client.bind_type(), None);

        // Still usable: fix the password and try again
        client.set_password("right").unwrap();
        engine.reply_to_bind(BindResult::Ok);
        client.bind(BindType::Transmitter, "localhost", 2775).unwrap();
        assert!(client.is_bound());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delivery_failure_keeps_session_bound() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        client.bind(BindType::Transceiver, "localhost", 2775).unwrap();
        engine.reply_to_send(DeliveryResult::InvalidDestinationAddress);

        let err = client.send_message("1000", "bogus", "hi").unwrap_err();
        assert!(matches!(
            err,
            SessionError::DeliveryFailure(DeliveryResult::InvalidDestinationAddress)
        ));
        assert!(client.is_bound());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_send_hands_utf8_bytes_to_engine() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        client.bind(BindType::Transmitter, "localhost", 2775).unwrap();

        client.send_message("1000", "5550100", "¿qué tal?").unwrap();
        assert!(engine.calls().contains(&Call::Send {
            from: "1000".to_string(),
            to: "5550100".to_string(),
            content: "¿qué tal?".as_bytes().to_vec(),
        }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spurious_connection_loss_while_unbound() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        let (lost_tx, mut lost_rx) = mpsc::unbounded_channel();
        client.on_connection_lost(move |reason| {
            let _ = lost_tx.send(reason);
        })
        .unwrap();

        client.bind(BindType::Transceiver, "localhost", 2775).unwrap();
        engine.lose_connection(DisconnectReason::Kicked.into());
        assert_eq!(
            timeout(Duration::from_secs(5), lost_rx.recv()).await.unwrap(),
            Some(DisconnectReason::Kicked)
        );
        assert_eq!(client.state(), SessionState::Unbound);

        // Unknown raw codes are reported as network errors
        engine.lose_connection(77);
        assert_eq!(
            timeout(Duration::from_secs(5), lost_rx.recv()).await.unwrap(),
            Some(DisconnectReason::NetworkError)
        );
        assert_eq!(client.state(), SessionState::Unbound);

        client.bind(BindType::Transceiver, "localhost", 2775).unwrap();
        assert!(client.is_bound());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_inbound_messages_delivered_in_order_off_engine_thread() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.on_new_message(move |message| {
            let _ = tx.send((message.clone(), thread::current().id()));
        })
        .unwrap();
        client.bind(BindType::Receiver, "localhost", 2775).unwrap();

        let messages: Vec<_> = (0..50)
            .map(|i| ("5550100", "1000", format!("message {}", i).into_bytes()))
            .collect();
        let engine_thread = engine.inject_messages(messages);

        for i in 0..50 {
            let (message, delivered_on) = timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(message.from, "5550100");
            assert_eq!(message.to, "1000");
            assert_eq!(message.text(), format!("message {}", i));
            assert_ne!(delivered_on, engine_thread);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_subscriber_can_reply_through_session() {
        let engine = RecordingEngine::new();
        let client = Arc::new(session(&engine));
        let weak = Arc::downgrade(&client);
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.on_new_message(move |message| {
            if let Some(client) = weak.upgrade() {
                let reply = format!("re: {}", message.text());
                let _ = tx.send(client.send_message(&message.to, &message.from, &reply).is_ok());
            }
        })
        .unwrap();
        client.bind(BindType::Transceiver, "localhost", 2775).unwrap();

        engine.inject_messages(vec![("5550100", "1000", b"ping".to_vec())]);
        assert_eq!(
            timeout(Duration::from_secs(5), rx.recv()).await.unwrap(),
            Some(true)
        );
        assert!(engine.calls().contains(&Call::Send {
            from: "1000".to_string(),
            to: "5550100".to_string(),
            content: b"re: ping".to_vec(),
        }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unsubscribe_stops_delivery() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let first = client.on_new_message(|_| {}).unwrap();
        client.on_new_message(move |message| {
            let _ = tx.send(message.text().into_owned());
        })
        .unwrap();
        let lost = client.on_connection_lost(|_| {}).unwrap();

        assert!(client.unsubscribe(first).unwrap());
        assert!(!client.unsubscribe(first).unwrap());
        assert!(client.unsubscribe(lost).unwrap());

        engine.inject_messages(vec![("a", "b", b"still here".to_vec())]);
        assert_eq!(
            timeout(Duration::from_secs(5), rx.recv()).await.unwrap(),
            Some("still here".to_string())
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dispose_unbinds_then_releases_once() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        client.bind(BindType::Transceiver, "localhost", 2775).unwrap();
        let subscription = client.on_new_message(|_| {}).unwrap();
        engine.clear();

        client.dispose();
        client.dispose();

        assert_eq!(
            engine.calls(),
            vec![Call::Unbind, Call::Destroy(EngineHandle::new(42))]
        );
        assert_eq!(client.state(), SessionState::Disposed);
        assert_eq!(client.handle(), None);

        assert_eq!(
            state_error(client.bind(BindType::Transceiver, "localhost", 2775)),
            StateError::Disposed
        );
        assert_eq!(state_error(client.unbind()), StateError::Disposed);
        assert_eq!(
            state_error(client.send_message("a", "b", "c")),
            StateError::Disposed
        );
        assert_eq!(state_error(client.set_system_id("x")), StateError::Disposed);
        assert_eq!(state_error(client.add_address("1000")), StateError::Disposed);
        assert_eq!(state_error(client.clear_addresses()), StateError::Disposed);
        assert_eq!(state_error(client.on_new_message(|_| {})), StateError::Disposed);
        assert_eq!(
            state_error(client.on_connection_lost(|_| {})),
            StateError::Disposed
        );
        assert_eq!(state_error(client.unsubscribe(subscription)), StateError::Disposed);

        drop(client);
        assert_eq!(engine.count(|call| matches!(call, Call::Destroy(_))), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connection_loss_after_dispose_is_ignored() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        let (lost_tx, mut lost_rx) = mpsc::unbounded_channel();
        client
            .on_connection_lost(move |reason| {
                let _ = lost_tx.send(reason);
            })
            .unwrap();
        client.bind(BindType::Transceiver, "localhost", 2775).unwrap();

        let (handle, events) = engine.listener();
        client.dispose();
        thread::spawn(move || events.on_connection_lost(handle, DisconnectReason::Kicked.into()))
            .join()
            .unwrap();

        assert!(
            timeout(Duration::from_millis(200), lost_rx.recv())
                .await
                .is_err()
        );
        assert_eq!(client.state(), SessionState::Disposed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connection_losses_handled_one_at_a_time_in_order() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        let busy = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let overlaps = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let (lost_tx, mut lost_rx) = mpsc::unbounded_channel();
        {
            let busy = Arc::clone(&busy);
            let overlaps = Arc::clone(&overlaps);
            client
                .on_connection_lost(move |reason| {
                    if busy.swap(true, std::sync::atomic::Ordering::SeqCst) {
                        overlaps.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    }
                    thread::sleep(Duration::from_millis(20));
                    busy.store(false, std::sync::atomic::Ordering::SeqCst);
                    let _ = lost_tx.send(reason);
                })
                .unwrap();
        }
        client.bind(BindType::Transceiver, "localhost", 2775).unwrap();

        engine.lose_connection_burst(vec![
            DisconnectReason::Kicked.into(),
            DisconnectReason::Unbind.into(),
            DisconnectReason::NetworkError.into(),
        ]);

        let mut reasons = Vec::new();
        for _ in 0..3 {
            reasons.push(
                timeout(Duration::from_secs(5), lost_rx.recv())
                    .await
                    .unwrap()
                    .unwrap(),
            );
        }
        assert_eq!(
            reasons,
            vec![
                DisconnectReason::Kicked,
                DisconnectReason::Unbind,
                DisconnectReason::NetworkError,
            ]
        );
        assert_eq!(overlaps.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(client.state(), SessionState::Unbound);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dispose_while_unbound_skips_unbind() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        engine.clear();

        client.dispose();
        assert_eq!(engine.calls(), vec![Call::Destroy(EngineHandle::new(42))]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_drop_disposes_unless_disabled() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        client.bind(BindType::Transmitter, "localhost", 2775).unwrap();
        drop(client);
        assert_eq!(engine.count(|call| *call == Call::Unbind), 1);
        assert_eq!(engine.count(|call| matches!(call, Call::Destroy(_))), 1);

        let engine = RecordingEngine::new();
        let client = SessionClient::builder(engine.clone())
            .config(SessionConfig::new().with_unbind_on_drop(false))
            .build()
            .unwrap();
        drop(client);
        assert_eq!(engine.count(|call| matches!(call, Call::Destroy(_))), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_discard_policy_drops_queued_messages() {
        let engine = RecordingEngine::new();
        let client = SessionClient::builder(engine.clone())
            .config(SessionConfig::new().with_drain_policy(DrainPolicy::Discard))
            .build()
            .unwrap();

        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.on_new_message(move |message| {
            if message.text() == "first" {
                let _ = release_rx.lock().recv();
            }
            let _ = tx.send(message.text().into_owned());
        })
        .unwrap();
        client.bind(BindType::Receiver, "localhost", 2775).unwrap();

        engine.inject_messages(vec![
            ("a", "b", b"first".to_vec()),
            ("a", "b", b"second".to_vec()),
            ("a", "b", b"third".to_vec()),
        ]);
        for _ in 0..200 {
            if client.dispatch_status().pending == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        client.dispose();
        release_tx.send(()).unwrap();

        assert_eq!(
            timeout(Duration::from_secs(5), rx.recv()).await.unwrap(),
            Some("first".to_string())
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(client.dispatch_status().discarded, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_deliver_policy_drains_after_dispose() {
        let engine = RecordingEngine::new();
        let client = session(&engine);
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.on_new_message(move |message| {
            if message.text() == "first" {
                let _ = release_rx.lock().recv();
            }
            let _ = tx.send(message.text().into_owned());
        })
        .unwrap();
        client.bind(BindType::Receiver, "localhost", 2775).unwrap();

        engine.inject_messages(vec![
            ("a", "b", b"first".to_vec()),
            ("a", "b", b"second".to_vec()),
        ]);
        client.dispose();
        release_tx.send(()).unwrap();

        for expected in ["first", "second"] {
            assert_eq!(
                timeout(Duration::from_secs(5), rx.recv()).await.unwrap(),
                Some(expected.to_string())
            );
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_builder_applies_initial_values() {
        let engine = RecordingEngine::new();
        let settings = MessageSettings::default().with_gsm7bit_packing(true);
        let client = SessionClient::builder(engine.clone())
            .system_id("esme")
            .password("secret")
            .system_type("MYAPP")
            .addresses(["2000", "1000-1099"])
            .settings(settings)
            .build()
            .unwrap();

        assert_eq!(
            engine.calls(),
            vec![
                Call::Create,
                Call::SystemId("esme".to_string()),
                Call::Password("secret".to_string()),
                Call::SystemType("MYAPP".to_string()),
            ]
        );
        assert_eq!(client.address_range(), "1000-1099|2000");
        assert_eq!(client.settings(), settings);
        assert_eq!(client.system_type(), "MYAPP");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_builder_releases_handle_on_invalid_address() {
        let engine = RecordingEngine::new();
        let result = SessionClient::builder(engine.clone())
            .address("1000|2000")
            .build();

        assert!(matches!(result, Err(SessionError::InvalidAddress(_))));
        assert_eq!(engine.count(|call| matches!(call, Call::Destroy(_))), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_builder_releases_handle_when_drop_would_not() {
        let engine = RecordingEngine::new();
        let result = SessionClient::builder(engine.clone())
            .config(SessionConfig::new().with_unbind_on_drop(false))
            .address("1000|2000")
            .build();

        assert!(matches!(result, Err(SessionError::InvalidAddress(_))));
        assert_eq!(
            engine.calls(),
            vec![Call::Create, Call::Destroy(EngineHandle::new(42))]
        );
    }

    #[test]
    fn test_builder_requires_runtime() {
        let engine = RecordingEngine::new();
        let result = SessionClient::new(engine.clone());
        assert!(matches!(result, Err(SessionError::NoRuntime)));
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_builder_accepts_explicit_runtime() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let engine = RecordingEngine::new();
        let client = SessionClient::builder(engine.clone())
            .runtime(runtime.handle().clone())
            .build()
            .unwrap();
        client.bind(BindType::Transmitter, "localhost", 2775).unwrap();
        client.dispose();
        assert_eq!(engine.count(|call| matches!(call, Call::Destroy(_))), 1);
    }
}
