// ABOUTME: Delivery dispatcher decoupling the engine's notification thread from subscriber callbacks
// ABOUTME: Single-consumer FIFO drained by at most one blocking-pool worker at a time per session

//! Inbound delivery
//!
//! The engine reports inbound messages on its own thread. That thread must
//! never block and must never run application code, since a subscriber is
//! free to call back into the session (to send a reply, for instance).
//!
//! The dispatcher therefore only queues on the engine thread. The first
//! message that finds the queue idle starts one worker on the tokio
//! blocking pool; that worker delivers messages one at a time, in arrival
//! order, until the queue is empty, and then exits. The `worker_active`
//! flag is read and written under the same lock as the queue itself, so a
//! message enqueued while a worker is running is always picked up by that
//! worker and a second worker is never started alongside it.

use crate::client::subscribers::{Subscribers, SubscriptionId};
use crate::datatypes::InboundMessage;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

/// Callback invoked for every inbound message
pub type MessageHandler = dyn Fn(&InboundMessage) + Send + Sync;

/// Snapshot of dispatcher activity
///
/// # Example
///
/// ```rust
/// # use smpp_session::client::Dispatcher;
/// # #[tokio::main]
/// # async fn main() {
/// let dispatcher = Dispatcher::new(tokio::runtime::Handle::current());
/// let status = dispatcher.status();
///
/// if status.worker_active {
///     println!("{} messages waiting", status.pending);
/// }
/// println!("delivered {} messages", status.delivered);
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStatus {
    /// Messages queued and not yet handed to subscribers
    pub pending: usize,
    /// Whether a dispatch worker is currently draining the queue
    pub worker_active: bool,
    /// Total dispatch workers started
    pub workers_started: u64,
    /// Messages handed to subscribers
    pub delivered: u64,
    /// Subscriber invocations that panicked
    pub handler_panics: u64,
    /// Messages dropped because the session was disposed with
    /// [`DrainPolicy::Discard`](crate::client::DrainPolicy::Discard) or the
    /// runtime shut down
    pub discarded: u64,
}

/// Messages waiting for delivery plus the state of the worker draining them
#[derive(Debug, Default)]
struct PendingQueue {
    items: VecDeque<InboundMessage>,
    /// Set when a worker is started and cleared by that worker, under the
    /// queue lock, when it finds the queue empty
    worker_active: bool,
    /// Once set, nothing is queued or delivered any more
    discarding: bool,
}

/// The one worker allowed to drain a dispatcher
///
/// If the runtime drops it without running it (during shutdown), the queue
/// is released so `worker_active` does not stay set forever.
struct Worker {
    dispatcher: Arc<Dispatcher>,
    started: bool,
}

impl Worker {
    fn run(mut self) {
        self.started = true;
        self.dispatcher.drain();
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if !self.started {
            self.dispatcher.abandon();
        }
    }
}

/// Ordered, non-overlapping delivery of inbound messages
pub struct Dispatcher {
    pending: Mutex<PendingQueue>,
    subscribers: Subscribers<MessageHandler>,
    runtime: Handle,
    workers_started: AtomicU64,
    delivered: AtomicU64,
    handler_panics: AtomicU64,
    discarded: AtomicU64,
}

impl Dispatcher {
    /// Create a dispatcher whose workers run on `runtime`'s blocking pool
    pub fn new(runtime: Handle) -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(PendingQueue::default()),
            subscribers: Subscribers::default(),
            runtime,
            workers_started: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            handler_panics: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        })
    }

    /// Register a handler for inbound messages
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.subscribers.add(Arc::new(handler))
    }

    /// Remove a handler; returns false if it was not registered here
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    /// Number of registered handlers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Queue a message for delivery
    ///
    /// Never blocks beyond the queue lock and never runs subscriber code on
    /// the calling thread.
    pub fn enqueue(self: &Arc<Self>, message: InboundMessage) {
        let start_worker = {
            let mut pending = self.pending.lock();
            if pending.discarding {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                trace!("Discarding inbound message from {} after dispose", message.from);
                return;
            }
            trace!(
                "Queued inbound message {} -> {} ({} bytes)",
                message.from,
                message.to,
                message.content.len()
            );
            pending.items.push_back(message);
            !std::mem::replace(&mut pending.worker_active, true)
        };

        if start_worker {
            self.workers_started.fetch_add(1, Ordering::Relaxed);
            debug!("Starting dispatch worker");
            let worker = Worker {
                dispatcher: Arc::clone(self),
                started: false,
            };
            // Detached: the worker exits on its own once the queue is empty.
            drop(self.runtime.spawn_blocking(move || worker.run()));
        }
    }

    /// Called when the runtime dropped a worker without running it
    fn abandon(&self) {
        let dropped = {
            let mut pending = self.pending.lock();
            pending.worker_active = false;
            let dropped = pending.items.len();
            pending.items.clear();
            dropped
        };
        self.discarded.fetch_add(dropped as u64, Ordering::Relaxed);
        warn!(
            "Runtime is shutting down; dropped {} undelivered messages",
            dropped
        );
    }

    /// Drop everything queued and refuse further messages
    ///
    /// A delivery already in progress completes; the worker then finds the
    /// queue empty and exits. Returns the number of messages dropped.
    pub fn discard_pending(&self) -> usize {
        let mut pending = self.pending.lock();
        pending.discarding = true;
        let dropped = pending.items.len();
        pending.items.clear();
        self.discarded.fetch_add(dropped as u64, Ordering::Relaxed);
        dropped
    }

    /// Current activity counters
    pub fn status(&self) -> DispatchStatus {
        let (pending, worker_active) = {
            let queue = self.pending.lock();
            (queue.items.len(), queue.worker_active)
        };
        DispatchStatus {
            pending,
            worker_active,
            workers_started: self.workers_started.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }

    fn drain(&self) {
        let mut count = 0u64;
        loop {
            let message = {
                let mut pending = self.pending.lock();
                match pending.items.pop_front() {
                    Some(message) => message,
                    None => {
                        pending.worker_active = false;
                        break;
                    }
                }
            };
            self.deliver(&message);
            count += 1;
        }
        debug!("Dispatch worker drained {} messages", count);
    }

    fn deliver(&self, message: &InboundMessage) {
        let panicked = self
            .subscribers
            .notify("NewMessage", |handler| handler(message));
        if panicked > 0 {
            self.handler_panics
                .fetch_add(panicked as u64, Ordering::Relaxed);
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }
}
