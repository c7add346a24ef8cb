//! Mandate assembly.
//!
//! Order of operations: autofill absent well-known fields, validate against
//! the registry (registry mode only), then construct. Nothing is built when
//! validation fails.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::account::AccountId;
use crate::config::DEFAULT_DEADLINE_SECS;
use crate::error::{MandateError, MandateResult};
use crate::mandate::{
    format_timestamp, new_mandate_id, MandateCore, MandateRecord, Signatures,
    MANDATE_RECORD_VERSION,
};
use crate::registry::SchemaRegistry;

/// How the payload is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildMode {
    /// Validate against the registry schema for the kind.
    Registry { base_url: String },
    /// Accept any JSON object; `kind` is a free label.
    Custom,
}

/// Field filled in because the caller left it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AutofilledField {
    Recipient,
    ChainId,
    Deadline,
}

impl AutofilledField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recipient => "recipient",
            Self::ChainId => "chainId",
            Self::Deadline => "deadline",
        }
    }
}

/// Ambient values used for autofill.
#[derive(Debug, Clone)]
pub struct AutofillContext {
    pub recipient: String,
    pub chain_id: u64,
    pub deadline: String,
}

/// Inputs for a new mandate.
#[derive(Debug, Clone)]
pub struct MandateRequest {
    pub kind: String,
    pub payload: Value,
    pub server: AccountId,
    pub client: AccountId,
    pub deadline: Option<DateTime<Utc>>,
    pub intent: Option<String>,
}

impl MandateRequest {
    /// Both parties on the same chain.
    pub fn new(
        kind: impl Into<String>,
        payload: Value,
        chain_id: u64,
        server_address: &str,
        client_address: &str,
    ) -> MandateResult<Self> {
        Ok(Self {
            kind: kind.into(),
            payload,
            server: AccountId::new(chain_id, server_address)?,
            client: AccountId::new(chain_id, client_address)?,
            deadline: None,
            intent: None,
        })
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }
}

/// A freshly built, unsigned mandate plus the autofill notice.
#[derive(Debug, Clone)]
pub struct BuiltMandate {
    pub record: MandateRecord,
    pub autofilled: Vec<AutofilledField>,
}

/// Builds mandates, consulting the registry in registry mode.
#[derive(Debug, Clone)]
pub struct MandateBuilder {
    registry: Option<SchemaRegistry>,
}

impl MandateBuilder {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    /// Builder that can only produce custom mandates.
    pub fn custom_only() -> Self {
        Self { registry: None }
    }

    /// Validate (registry mode) and construct the core. The payload must
    /// already contain everything that will be submitted.
    pub async fn build_core(
        &self,
        kind: &str,
        payload: Value,
        mode: &BuildMode,
    ) -> MandateResult<MandateCore> {
        if !payload.is_object() {
            return Err(MandateError::invalid_input("payload must be a JSON object"));
        }

        if let BuildMode::Registry { base_url } = mode {
            let registry = self.registry.as_ref().ok_or_else(|| {
                MandateError::invalid_input("registry mode requires a registry client")
            })?;
            registry.validate(kind, &payload, base_url).await?;
        }

        let Value::Object(payload) = payload else {
            return Err(MandateError::invalid_input("payload must be a JSON object"));
        };
        Ok(MandateCore {
            kind: kind.to_string(),
            payload,
        })
    }

    /// Build an unsigned record: autofill, validate, assemble.
    pub async fn build(&self, request: MandateRequest, mode: &BuildMode) -> MandateResult<BuiltMandate> {
        self.build_at(request, mode, Utc::now()).await
    }

    pub async fn build_at(
        &self,
        request: MandateRequest,
        mode: &BuildMode,
        now: DateTime<Utc>,
    ) -> MandateResult<BuiltMandate> {
        let deadline = request
            .deadline
            .unwrap_or_else(|| now + Duration::seconds(DEFAULT_DEADLINE_SECS));
        if deadline <= now {
            return Err(MandateError::invalid_input(format!(
                "deadline {} must be after creation time {}",
                format_timestamp(deadline),
                format_timestamp(now)
            )));
        }
        let deadline = format_timestamp(deadline);

        let mut payload = match request.payload {
            Value::Object(map) => map,
            _ => return Err(MandateError::invalid_input("payload must be a JSON object")),
        };

        let context = AutofillContext {
            recipient: request.client.address.clone(),
            chain_id: request.client.chain_id,
            deadline: deadline.clone(),
        };
        let autofilled = autofill(&mut payload, &context);
        if !autofilled.is_empty() {
            debug!(fields = ?autofilled, "payload autofilled");
        }

        let core = self
            .build_core(&request.kind, Value::Object(payload), mode)
            .await?;

        let intent = request
            .intent
            .unwrap_or_else(|| derive_intent(&core.kind, &core.payload));

        let record = MandateRecord {
            mandate_id: new_mandate_id(),
            version: MANDATE_RECORD_VERSION.to_string(),
            client: request.client.to_string(),
            server: request.server.to_string(),
            created_at: format_timestamp(now),
            deadline,
            intent,
            core,
            signatures: Signatures::default(),
            extra: Map::new(),
        };

        Ok(BuiltMandate { record, autofilled })
    }
}

impl Default for MandateBuilder {
    fn default() -> Self {
        Self::custom_only()
    }
}

/// Fill `recipient`, `chainId` and `deadline` when absent (or null).
/// Present values are never touched.
pub fn autofill(payload: &mut Map<String, Value>, context: &AutofillContext) -> Vec<AutofilledField> {
    let mut filled = Vec::new();
    let candidates = [
        (AutofilledField::Recipient, Value::from(context.recipient.clone())),
        (AutofilledField::ChainId, Value::from(context.chain_id)),
        (AutofilledField::Deadline, Value::from(context.deadline.clone())),
    ];
    for (field, value) in candidates {
        let absent = payload.get(field.as_str()).map_or(true, Value::is_null);
        if absent {
            payload.insert(field.as_str().to_string(), value);
            filled.push(field);
        }
    }
    filled
}

/// Human-readable summary for a core.
pub fn derive_intent(kind: &str, payload: &Map<String, Value>) -> String {
    if kind == "swap@1" {
        if let (Some(Value::String(token_in)), Some(Value::String(token_out))) =
            (payload.get("tokenIn"), payload.get("tokenOut"))
        {
            return format!(
                "Swap {} of {} for at least {} of {}",
                display_field(payload.get("amountIn")),
                token_in,
                display_field(payload.get("minOut")),
                token_out
            );
        }
    }
    format!("Mandate: {}", kind)
}

fn display_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
