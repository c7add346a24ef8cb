//! Signature state machine: Unsigned → ServerSigned → FullySigned.
//!
//! Transitions either complete or leave the record untouched. Verification
//! is offline, read-only and reports per party instead of failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::account::same_address;
use crate::canonicalize::canonical_signing_bytes;
use crate::error::{MandateError, MandateResult};
use crate::mandate::{MandateRecord, SignatureArtifact, SignatureState, SignerRole, ALG_EIP191};
use crate::signer::{recover_address, Signer};

/// Attach the server signature (`Unsigned → ServerSigned`).
pub fn sign_as_server(record: &mut MandateRecord, signer: &dyn Signer) -> MandateResult<()> {
    sign_as_server_at(record, signer, Utc::now())
}

/// Attach the client signature (`ServerSigned → FullySigned`).
pub fn sign_as_client(record: &mut MandateRecord, signer: &dyn Signer) -> MandateResult<()> {
    sign_as_client_at(record, signer, Utc::now())
}

pub fn sign_as_server_at(
    record: &mut MandateRecord,
    signer: &dyn Signer,
    now: DateTime<Utc>,
) -> MandateResult<()> {
    let artifact = prepare_signature(record, SignerRole::Server, signer, now)?;
    record.signatures.server = Some(artifact);
    debug!(mandate_id = %record.mandate_id, "server signature attached");
    Ok(())
}

pub fn sign_as_client_at(
    record: &mut MandateRecord,
    signer: &dyn Signer,
    now: DateTime<Utc>,
) -> MandateResult<()> {
    if record.signatures.server.is_none() {
        return Err(MandateError::OutOfOrderSignature {
            mandate_id: record.mandate_id.clone(),
        });
    }
    let artifact = prepare_signature(record, SignerRole::Client, signer, now)?;
    record.signatures.client = Some(artifact);
    debug!(mandate_id = %record.mandate_id, "client signature attached");
    Ok(())
}

/// All checks and the signature itself, computed before anything is written.
fn prepare_signature(
    record: &MandateRecord,
    role: SignerRole,
    signer: &dyn Signer,
    now: DateTime<Utc>,
) -> MandateResult<SignatureArtifact> {
    if record.slot(role).is_some() {
        return Err(MandateError::AlreadySigned {
            mandate_id: record.mandate_id.clone(),
            role,
        });
    }

    if record.is_expired_at(now) {
        return Err(MandateError::Expired {
            mandate_id: record.mandate_id.clone(),
            deadline: record.deadline.clone(),
        });
    }

    let expected = record.party_account(role)?;
    let signer_address = signer.address();
    if !same_address(&signer_address, &expected.address) {
        return Err(MandateError::SignerMismatch {
            role,
            signer: signer_address,
            expected: expected.address,
        });
    }

    let message = canonical_signing_bytes(record)?;
    let signature = signer.sign_message(&message)?;

    Ok(SignatureArtifact {
        alg: signer.algorithm().to_string(),
        signature: format!("0x{}", hex::encode(signature)),
        signer: signer_address,
    })
}

/// Outcome of verifying one party's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyVerification {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PartyVerification {
    fn ok() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

/// Verification of both slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub server: PartyVerification,
    pub client: PartyVerification,
}

impl VerifyReport {
    pub fn all_ok(&self) -> bool {
        self.server.ok && self.client.ok
    }
}

/// Verify both signatures independently against the recorded parties.
pub fn verify(record: &MandateRecord) -> VerifyReport {
    let message = canonical_signing_bytes(record);
    VerifyReport {
        server: verify_slot(record, SignerRole::Server, &message),
        client: verify_slot(record, SignerRole::Client, &message),
    }
}

fn verify_slot(
    record: &MandateRecord,
    role: SignerRole,
    message: &MandateResult<Vec<u8>>,
) -> PartyVerification {
    let artifact = match record.slot(role) {
        Some(a) => a,
        None => return PartyVerification::failed("missing"),
    };

    if artifact.alg != ALG_EIP191 {
        return PartyVerification::failed(format!("unsupported algorithm: {}", artifact.alg));
    }

    let message = match message {
        Ok(m) => m,
        Err(e) => return PartyVerification::failed(e.to_string()),
    };

    let expected = match record.party_account(role) {
        Ok(account) => account,
        Err(e) => return PartyVerification::failed(format!("invalid {} account: {}", role, e)),
    };

    let hex_sig = artifact
        .signature
        .strip_prefix("0x")
        .unwrap_or(&artifact.signature);
    let sig_bytes = match hex::decode(hex_sig) {
        Ok(b) => b,
        Err(e) => return PartyVerification::failed(format!("signature is not hex: {}", e)),
    };

    match recover_address(message, &sig_bytes) {
        Ok(recovered) if same_address(&recovered, &expected.address) => PartyVerification::ok(),
        Ok(recovered) => PartyVerification::failed(format!(
            "signature mismatch: recovered {}, expected {}",
            recovered, expected.address
        )),
        Err(e) => PartyVerification::failed(format!("signature mismatch: {}", e)),
    }
}

/// Current state of a record.
pub fn state_of(record: &MandateRecord) -> SignatureState {
    record.signature_state()
}
