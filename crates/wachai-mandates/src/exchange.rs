//! Mandate exchange over a [`Transport`].
//!
//! Sending never persists. Receiving stores every mandate it recognizes,
//! replacing a local copy with the same id only when the incoming record
//! carries every signature the local copy already holds. A replayed offer can
//! never strip a countersignature, and a record with emptied slots can never
//! remove the server signature.

use std::future::Future;

use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::account::is_address;
use crate::envelope::{self, EnvelopeAction};
use crate::error::{MandateError, MandateResult};
use crate::mandate::{MandateRecord, SignatureArtifact};
use crate::store::MandateStore;
use crate::transport::{InboundMessage, Transport};

/// Acknowledgement of a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub to: String,
    pub mandate_id: String,
    pub action: EnvelopeAction,
    pub nonce: String,
}

/// A mandate taken from the transport and stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMandate {
    pub from: String,
    pub action: EnvelopeAction,
    pub mandate_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Received(ReceivedMandate),
    /// Not a mandate envelope.
    Skipped,
    /// A mandate that would drop signatures held locally; not stored.
    Stale { from: String, mandate_id: String },
}

pub struct ExchangeSession<T, S> {
    transport: T,
    store: S,
}

impl<T: Transport, S: MandateStore> ExchangeSession<T, S> {
    pub fn new(transport: T, store: S) -> Self {
        Self { transport, store }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Wrap and send. `action` defaults to what the signature slots imply.
    pub async fn send(
        &self,
        peer: &str,
        record: &MandateRecord,
        action: Option<EnvelopeAction>,
    ) -> MandateResult<SendReceipt> {
        if !is_address(peer) {
            return Err(MandateError::invalid_input(format!(
                "invalid peer address: {}",
                peer
            )));
        }

        let envelope = envelope::wrap(record.clone(), action);
        let bytes = envelope.to_bytes()?;
        self.transport.send(peer, &bytes).await?;
        info!(
            to = peer,
            mandate_id = %record.mandate_id,
            action = %envelope.action,
            "mandate sent"
        );

        Ok(SendReceipt {
            to: peer.to_string(),
            mandate_id: record.mandate_id.clone(),
            action: envelope.action,
            nonce: envelope.nonce,
        })
    }

    /// Handle one inbound message.
    pub async fn receive_one(&self, message: &InboundMessage) -> MandateResult<ReceiveOutcome> {
        let Some(envelope) = envelope::unwrap(&message.content) else {
            debug!(from = %message.sender, "skipping non-mandate message");
            return Ok(ReceiveOutcome::Skipped);
        };

        let mandate = &envelope.mandate;
        match self.store.get(&mandate.mandate_id).await {
            Ok(stored) if !keeps_signatures(&stored, mandate) => {
                warn!(
                    from = %message.sender,
                    mandate_id = %mandate.mandate_id,
                    action = %envelope.action,
                    "ignoring mandate that would drop stored signatures"
                );
                return Ok(ReceiveOutcome::Stale {
                    from: message.sender.clone(),
                    mandate_id: mandate.mandate_id.clone(),
                });
            }
            Ok(_) | Err(MandateError::StorageNotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        self.store.put(mandate).await?;
        info!(
            from = %message.sender,
            mandate_id = %envelope.mandate.mandate_id,
            action = %envelope.action,
            "mandate received"
        );

        Ok(ReceiveOutcome::Received(ReceivedMandate {
            from: message.sender.clone(),
            action: envelope.action,
            mandate_id: envelope.mandate.mandate_id,
        }))
    }

    /// Process everything currently in the inbox once. Each message is
    /// acknowledged after handling; transports that track acknowledgements
    /// do not list it again.
    pub async fn receive_backlog(&self) -> MandateResult<Vec<ReceivedMandate>> {
        let mut received = Vec::new();
        for message in self.transport.list_messages().await? {
            if let Some(r) = self.handle(&message).await {
                received.push(r);
            }
        }
        Ok(received)
    }

    /// `receive_one`, with failures logged and the message acknowledged.
    async fn handle(&self, message: &InboundMessage) -> Option<ReceivedMandate> {
        let received = match self.receive_one(message).await {
            Ok(ReceiveOutcome::Received(r)) => Some(r),
            Ok(ReceiveOutcome::Skipped | ReceiveOutcome::Stale { .. }) => None,
            Err(e) => {
                warn!(from = %message.sender, error = %e, "failed to process message");
                None
            }
        };
        if let Err(e) = self.transport.acknowledge(message).await {
            warn!(from = %message.sender, error = %e, "failed to acknowledge message");
        }
        received
    }

    /// Process new messages until `shutdown` resolves or the stream ends.
    ///
    /// Messages are handled one at a time, in delivery order, each to
    /// completion; shutdown is only observed between messages. Returns the
    /// number of mandates received.
    pub async fn receive_stream<F, C>(&self, shutdown: F, mut on_received: C) -> MandateResult<usize>
    where
        F: Future<Output = ()>,
        C: FnMut(&ReceivedMandate),
    {
        let mut stream = self.transport.stream_messages().await?;
        tokio::pin!(shutdown);

        let mut count = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    debug!("receive stream shutting down");
                    break;
                }
                next = stream.next() => next,
            };

            let message = match next {
                None => break,
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    warn!(error = %e, "transport stream error");
                    continue;
                }
            };

            if let Some(received) = self.handle(&message).await {
                count += 1;
                on_received(&received);
            }
        }
        Ok(count)
    }
}

/// Every signature slot filled in `stored` comes back unchanged in `incoming`.
fn keeps_signatures(stored: &MandateRecord, incoming: &MandateRecord) -> bool {
    fn keeps(held: &Option<SignatureArtifact>, next: &Option<SignatureArtifact>) -> bool {
        held.is_none() || held == next
    }
    keeps(&stored.signatures.server, &incoming.signatures.server)
        && keeps(&stored.signatures.client, &incoming.signatures.client)
}
