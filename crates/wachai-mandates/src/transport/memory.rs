//! In-process transport. Every [`MemoryTransport`] created from the same
//! [`MemoryNetwork`] can reach the others.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::trace;

use super::{inbox_key, InboundMessage, MessageStream, Transport};
use crate::error::{MandateError, MandateResult};

#[derive(Debug, Default)]
struct Inbox {
    messages: Vec<InboundMessage>,
    subscribers: Vec<mpsc::UnboundedSender<InboundMessage>>,
}

/// Shared switchboard.
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    inboxes: Arc<Mutex<HashMap<String, Inbox>>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoint receiving on `address`.
    pub fn transport(&self, address: impl Into<String>) -> MemoryTransport {
        MemoryTransport {
            address: address.into(),
            network: self.clone(),
        }
    }

    fn lock(&self) -> MandateResult<MutexGuard<'_, HashMap<String, Inbox>>> {
        self.inboxes.lock().map_err(|_| MandateError::Transport {
            message: "memory network lock poisoned".to_string(),
        })
    }

    fn deliver(&self, to: &str, message: InboundMessage) -> MandateResult<()> {
        let mut inboxes = self.lock()?;
        let inbox = inboxes.entry(inbox_key(to)).or_default();
        inbox
            .subscribers
            .retain(|tx| tx.send(message.clone()).is_ok());
        inbox.messages.push(message);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryTransport {
    address: String,
    network: MemoryNetwork,
}

#[async_trait]
impl Transport for MemoryTransport {
    fn address(&self) -> &str {
        &self.address
    }

    async fn send(&self, peer: &str, content: &[u8]) -> MandateResult<()> {
        trace!(from = %self.address, to = peer, bytes = content.len(), "memory send");
        self.network
            .deliver(peer, InboundMessage::new(self.address.clone(), content))
    }

    async fn list_messages(&self) -> MandateResult<Vec<InboundMessage>> {
        let inboxes = self.network.lock()?;
        Ok(inboxes
            .get(&inbox_key(&self.address))
            .map(|inbox| inbox.messages.clone())
            .unwrap_or_default())
    }

    async fn stream_messages(&self) -> MandateResult<MessageStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.network
            .lock()?
            .entry(inbox_key(&self.address))
            .or_default()
            .subscribers
            .push(tx);
        Ok(UnboundedReceiverStream::new(rx).map(Ok).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_lands_in_peer_inbox() {
        let network = MemoryNetwork::new();
        let alice = network.transport("0xAAaa");
        let bob = network.transport("0xBBbb");

        alice.send("0xbbbb", b"hello").await.unwrap();

        let inbox = bob.list_messages().await.unwrap();
        assert_eq!(inbox, vec![InboundMessage::new("0xAAaa", b"hello".to_vec())]);
        assert!(alice.list_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stream_sees_only_new_messages() {
        let network = MemoryNetwork::new();
        let alice = network.transport("0xaaaa");
        let bob = network.transport("0xbbbb");

        alice.send("0xbbbb", b"old").await.unwrap();
        let mut stream = bob.stream_messages().await.unwrap();
        alice.send("0xbbbb", b"new").await.unwrap();

        let next = stream.next().await.unwrap().unwrap();
        assert_eq!(next.content, b"new");
    }

    #[tokio::test]
    async fn test_dropped_stream_is_pruned() {
        let network = MemoryNetwork::new();
        let alice = network.transport("0xaaaa");
        let bob = network.transport("0xbbbb");

        drop(bob.stream_messages().await.unwrap());
        alice.send("0xbbbb", b"x").await.unwrap();

        let inboxes = network.lock().unwrap();
        assert!(inboxes["0xbbbb"].subscribers.is_empty());
    }
}
