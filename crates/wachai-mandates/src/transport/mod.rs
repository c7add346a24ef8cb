//! Peer-to-peer message transports.
//!
//! A transport moves opaque bytes between addresses. It knows nothing about
//! mandates; [`crate::exchange`] layers envelopes on top and tolerates any
//! unrelated traffic sharing the same inbox.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::MandateResult;

mod memory;
mod spool;

pub use memory::{MemoryNetwork, MemoryTransport};
pub use spool::{SpoolTransport, DEFAULT_POLL_INTERVAL};

/// A message as received, before any envelope parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender address as reported by the transport.
    pub sender: String,
    pub content: Vec<u8>,
    /// Transport-assigned id, used to acknowledge the message.
    pub id: Option<String>,
}

impl InboundMessage {
    pub fn new(sender: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Live feed of new messages. Ends when the transport closes.
pub type MessageStream = BoxStream<'static, MandateResult<InboundMessage>>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Address this transport receives on.
    fn address(&self) -> &str;

    /// Deliver `content` to `peer`.
    async fn send(&self, peer: &str, content: &[u8]) -> MandateResult<()>;

    /// Everything in the inbox, oldest first. Transports that track
    /// acknowledgements leave out messages already acknowledged.
    async fn list_messages(&self) -> MandateResult<Vec<InboundMessage>>;

    /// Messages arriving after the call.
    async fn stream_messages(&self) -> MandateResult<MessageStream>;

    /// Mark `message` and everything delivered before it as processed.
    async fn acknowledge(&self, _message: &InboundMessage) -> MandateResult<()> {
        Ok(())
    }
}

/// Inboxes are keyed by lowercase address so checksum casing never splits
/// one peer across two inboxes.
pub(crate) fn inbox_key(address: &str) -> String {
    address.to_ascii_lowercase()
}
