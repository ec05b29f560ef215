// ABOUTME: A message received from the message center, as handed to NewMessage subscribers
// ABOUTME: Content stays as raw bytes; text() decodes it as UTF-8 the way the engine delivers it

use bytes::Bytes;
use std::borrow::Cow;

/// Inbound short message
///
/// Produced on the engine's notification thread, queued once, and delivered
/// once to every NewMessage subscriber registered at delivery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Address the message was sent from
    pub from: String,
    /// Address the message is directed to
    pub to: String,
    /// Message body, UTF-8 encoded by the engine
    pub content: Bytes,
}

impl InboundMessage {
    /// Create a new inbound message
    pub fn new(from: impl Into<String>, to: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            content: content.into(),
        }
    }

    /// Message body as text, replacing invalid UTF-8 sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Size of the body in bytes
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Returns true if the body is empty
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
