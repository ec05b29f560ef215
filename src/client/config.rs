// ABOUTME: Session configuration controlling teardown behaviour of the delivery dispatcher
// ABOUTME: Decides whether messages still queued at dispose time are delivered or dropped

/// What happens to inbound messages still queued when the session is disposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainPolicy {
    /// Keep draining the queue to the subscribers registered at delivery time
    #[default]
    Deliver,
    /// Drop queued messages, and any that arrive later, once disposed
    Discard,
}

/// Configuration for a [`SessionClient`](crate::client::SessionClient)
///
/// # Example
///
/// ```rust
/// use smpp_session::client::{DrainPolicy, SessionConfig};
///
/// // Default configuration (deliver queued messages, tear down on drop)
/// let config = SessionConfig::default();
///
/// // Drop whatever is still queued when the session goes away
/// let config = SessionConfig::new()
///     .with_drain_policy(DrainPolicy::Discard)
///     .with_unbind_on_drop(false);
/// assert_eq!(config.drain_policy, DrainPolicy::Discard);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Handling of queued inbound messages at dispose time (default: `Deliver`)
    ///
    /// There is no cancellation for a running dispatch worker. With
    /// `Deliver`, a queue that is non-empty at dispose time is drained to
    /// completion. With `Discard`, the queue is cleared and the worker stops
    /// after the message it is currently delivering.
    pub drain_policy: DrainPolicy,

    /// Dispose the session when the client is dropped (default: true)
    ///
    /// Disposing unbinds a bound session and releases the engine handle.
    /// When false, a dropped client leaks its engine handle.
    pub unbind_on_drop: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            drain_policy: DrainPolicy::Deliver,
            unbind_on_drop: true,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how queued messages are handled at dispose time
    pub fn with_drain_policy(mut self, drain_policy: DrainPolicy) -> Self {
        self.drain_policy = drain_policy;
        self
    }

    /// Set whether dropping the client disposes the session
    pub fn with_unbind_on_drop(mut self, unbind_on_drop: bool) -> Self {
        self.unbind_on_drop = unbind_on_drop;
        self
    }
}
