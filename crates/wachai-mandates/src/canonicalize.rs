//! Canonical signing bytes for mandate records.
//!
//! Both signatures cover the same bytes: the record serialized to JSON, the
//! `signatures` member removed, then encoded with JCS (RFC 8785):
//! - object keys sorted by UTF-16 code units
//! - no whitespace
//! - ECMAScript number formatting
//!
//! Because the encoding depends only on the JSON data model, re-reading a
//! persisted record (pretty-printed, any key order) yields identical bytes.

use serde_json::Value as JsonValue;

use crate::error::{MandateError, MandateResult};
use crate::mandate::MandateRecord;

/// Convert a JSON value to JCS bytes.
pub fn to_canonical_jcs_bytes(value: &JsonValue) -> MandateResult<Vec<u8>> {
    serde_jcs::to_vec(value).map_err(|e| MandateError::Serialization {
        message: format!("canonicalization failed: {}", e),
    })
}

/// Bytes both parties sign: the record without its `signatures` map.
pub fn canonical_signing_bytes(record: &MandateRecord) -> MandateResult<Vec<u8>> {
    let mut value = serde_json::to_value(record)?;
    match value.as_object_mut() {
        Some(obj) => {
            obj.remove("signatures");
        }
        None => {
            return Err(MandateError::Serialization {
                message: "mandate record did not serialize to an object".to_string(),
            })
        }
    }
    to_canonical_jcs_bytes(&value)
}
