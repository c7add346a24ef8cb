//! Mandate record types.
//!
//! The persisted JSON shape (camelCase keys) is a compatibility surface:
//! other tools read these records directly, and the signed bytes are derived
//! from it, so field names and the preservation of unknown fields matter.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::account::AccountId;
use crate::error::{MandateError, MandateResult};

/// Record shape version written into new mandates.
pub const MANDATE_RECORD_VERSION: &str = "0.1.0";

/// Algorithm tag for EIP-191 personal-message signatures.
pub const ALG_EIP191: &str = "eip191";

/// Kind label plus its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MandateCore {
    pub kind: String,
    pub payload: Map<String, Value>,
}

/// A signature over the canonical record bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureArtifact {
    /// Algorithm tag (`eip191`).
    pub alg: String,

    /// 0x-prefixed hex signature.
    pub signature: String,

    /// Address that produced the signature.
    pub signer: String,
}

/// The two signature slots. Absence of a slot means that party has not signed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<SignatureArtifact>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<SignatureArtifact>,
}

/// Which party a signature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerRole {
    Server,
    Client,
}

impl fmt::Display for SignerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => f.write_str("server"),
            Self::Client => f.write_str("client"),
        }
    }
}

/// Derived signature state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureState {
    Unsigned,
    ServerSigned,
    FullySigned,
}

/// A mandate and its signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandateRecord {
    pub mandate_id: String,
    pub version: String,
    pub client: String,
    pub server: String,
    pub created_at: String,
    pub deadline: String,
    pub intent: String,
    pub core: MandateCore,
    #[serde(default)]
    pub signatures: Signatures,

    /// Fields written by other implementations; kept so they stay signed.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MandateRecord {
    pub fn signature_state(&self) -> SignatureState {
        match (&self.signatures.server, &self.signatures.client) {
            (Some(_), Some(_)) => SignatureState::FullySigned,
            (Some(_), None) => SignatureState::ServerSigned,
            // Client-only records are not produced here but may arrive from
            // elsewhere; they are not fully signed.
            (None, _) => SignatureState::Unsigned,
        }
    }

    pub fn is_fully_signed(&self) -> bool {
        self.signature_state() == SignatureState::FullySigned
    }

    pub fn slot(&self, role: SignerRole) -> Option<&SignatureArtifact> {
        match role {
            SignerRole::Server => self.signatures.server.as_ref(),
            SignerRole::Client => self.signatures.client.as_ref(),
        }
    }

    /// Account identifier of a party.
    pub fn party(&self, role: SignerRole) -> &str {
        match role {
            SignerRole::Server => &self.server,
            SignerRole::Client => &self.client,
        }
    }

    pub fn party_account(&self, role: SignerRole) -> MandateResult<AccountId> {
        self.party(role).parse()
    }

    pub fn deadline_at(&self) -> MandateResult<DateTime<Utc>> {
        parse_timestamp("deadline", &self.deadline)
    }

    pub fn created_at(&self) -> MandateResult<DateTime<Utc>> {
        parse_timestamp("createdAt", &self.created_at)
    }

    /// Whether the deadline has passed at `now`. Unparseable deadlines count
    /// as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.deadline_at().map(|d| d <= now).unwrap_or(true)
    }

    /// Pretty JSON with a trailing newline, as persisted on disk.
    pub fn to_pretty_json(&self) -> MandateResult<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Fresh time-ordered identifier (UUIDv7, monotonic within the process).
pub fn new_mandate_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// ISO 8601 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(field: &str, value: &str) -> MandateResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| MandateError::invalid_input(format!("invalid {} {:?}: {}", field, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "mandateId": "0192f7a4-0000-7000-8000-000000000001",
            "version": "0.1.0",
            "client": "eip155:1:0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "server": "eip155:1:0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "createdAt": "2026-01-01T00:00:00.000Z",
            "deadline": "2026-01-01T00:10:00.000Z",
            "intent": "Mandate: demo",
            "core": { "kind": "demo", "payload": { "a": 1 } },
            "signatures": {}
        })
    }

    #[test]
    fn test_record_json_shape() {
        let record: MandateRecord = serde_json::from_value(sample()).unwrap();
        assert_eq!(record.signature_state(), SignatureState::Unsigned);
        assert_eq!(serde_json::to_value(&record).unwrap(), sample());
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let mut value = sample();
        value["agentHint"] = json!({ "x": true });
        let record: MandateRecord = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(record.extra.get("agentHint"), Some(&json!({ "x": true })));
        assert_eq!(serde_json::to_value(&record).unwrap(), value);
    }

    #[test]
    fn test_missing_signatures_defaults_to_empty() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("signatures");
        let record: MandateRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.signatures, Signatures::default());
    }

    #[test]
    fn test_expiry() {
        let record: MandateRecord = serde_json::from_value(sample()).unwrap();
        let before = DateTime::parse_from_rfc3339("2026-01-01T00:05:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let after = DateTime::parse_from_rfc3339("2026-01-01T00:10:01Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(!record.is_expired_at(before));
        assert!(record.is_expired_at(after));
    }

    #[test]
    fn test_ids_sort_by_creation() {
        let ids: Vec<String> = (0..64).map(|_| new_mandate_id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_pretty_json_has_trailing_newline() {
        let record: MandateRecord = serde_json::from_value(sample()).unwrap();
        let text = record.to_pretty_json().unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\n  \"mandateId\""));
    }
}
