// ABOUTME: Registry of application callbacks for session events with add/remove semantics
// ABOUTME: Handlers are snapshotted before invocation and panics are contained and logged

use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Identifies a registered handler so it can be removed later
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }
}

/// Ordered list of handlers of one event kind
pub(crate) struct Subscribers<H: ?Sized> {
    handlers: RwLock<Vec<(SubscriptionId, Arc<H>)>>,
}

impl<H: ?Sized> Default for Subscribers<H> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }
}

impl<H: ?Sized> Subscribers<H> {
    pub(crate) fn add(&self, handler: Arc<H>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.handlers.write().push((id, handler));
        id
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Copies the current handlers so they run without holding the lock;
    /// a handler may then add or remove subscriptions itself.
    pub(crate) fn snapshot(&self) -> Vec<Arc<H>> {
        self.handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }

    /// Run `call` for every handler in registration order.
    ///
    /// Returns the number of handlers that panicked.
    pub(crate) fn notify(&self, event: &str, call: impl Fn(&H)) -> usize {
        let mut panicked = 0;
        for handler in self.snapshot() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(&*handler)));
            if let Err(payload) = outcome {
                panicked += 1;
                error!("{} handler panicked: {}", event, panic_message(&*payload));
            }
        }
        panicked
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}
