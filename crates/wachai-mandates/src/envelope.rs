//! Transport envelope for mandates.
//!
//! Wire format (compact JSON):
//!
//! ```json
//! {"type":"wachai.mandate","version":"0.1","action":"offer",
//!  "mandate":{...},"sentAt":"2026-01-01T00:00:00.000Z","nonce":"..."}
//! ```
//!
//! The transport is shared with unrelated traffic, so [`unwrap`] is total:
//! anything that is not one of our envelopes yields `None`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::{MandateError, MandateResult};
use crate::mandate::{format_timestamp, MandateRecord};

pub const ENVELOPE_TYPE: &str = "wachai.mandate";
pub const ENVELOPE_VERSION: &str = "0.1";

/// What the sender means by this message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeAction {
    Offer,
    Accept,
    Reject,
    Counter,
}

impl EnvelopeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Counter => "counter",
        }
    }

    /// Best effort from signature slots: fully signed is an accept,
    /// anything else an offer. Reject and counter are never inferred.
    pub fn infer(record: &MandateRecord) -> Self {
        if record.is_fully_signed() {
            Self::Accept
        } else {
            Self::Offer
        }
    }
}

impl fmt::Display for EnvelopeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvelopeAction {
    type Err = MandateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offer" => Ok(Self::Offer),
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            "counter" => Ok(Self::Counter),
            other => Err(MandateError::invalid_input(format!(
                "invalid action {:?} (expected offer|accept|reject|counter)",
                other
            ))),
        }
    }
}

/// Mandate plus delivery metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandateEnvelope {
    #[serde(rename = "type")]
    pub envelope_type: String,
    pub version: String,
    pub action: EnvelopeAction,
    pub mandate: MandateRecord,
    pub sent_at: String,
    pub nonce: String,
}

impl MandateEnvelope {
    pub fn to_bytes(&self) -> MandateResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Wrap with a fresh nonce and the current time.
pub fn wrap(record: MandateRecord, action: Option<EnvelopeAction>) -> MandateEnvelope {
    wrap_at(record, action, Utc::now(), uuid::Uuid::now_v7().to_string())
}

pub fn wrap_at(
    record: MandateRecord,
    action: Option<EnvelopeAction>,
    sent_at: DateTime<Utc>,
    nonce: String,
) -> MandateEnvelope {
    let action = action.unwrap_or_else(|| EnvelopeAction::infer(&record));
    MandateEnvelope {
        envelope_type: ENVELOPE_TYPE.to_string(),
        version: ENVELOPE_VERSION.to_string(),
        action,
        mandate: record,
        sent_at: format_timestamp(sent_at),
        nonce,
    }
}

/// Parse raw transport content. Never fails; non-envelopes are `None`.
pub fn unwrap(raw: &[u8]) -> Option<MandateEnvelope> {
    let value: Value = match serde_json::from_slice(raw) {
        Ok(v) => v,
        Err(_) => {
            trace!("ignoring non-JSON message");
            return None;
        }
    };

    let obj = value.as_object()?;
    if obj.get("type").and_then(Value::as_str) != Some(ENVELOPE_TYPE)
        || obj.get("version").and_then(Value::as_str) != Some(ENVELOPE_VERSION)
    {
        trace!("ignoring message without envelope tag");
        return None;
    }

    let has_id = obj
        .get("mandate")
        .and_then(Value::as_object)
        .and_then(|m| m.get("mandateId"))
        .map_or(false, Value::is_string);
    if !has_id {
        trace!("ignoring envelope without mandate id");
        return None;
    }

    match serde_json::from_value(value) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            trace!(error = %e, "ignoring undecodable envelope");
            None
        }
    }
}
