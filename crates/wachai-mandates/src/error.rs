//! Error types for mandate operations.

use crate::mandate::SignerRole;

/// Mandate errors.
#[derive(Debug, thiserror::Error)]
pub enum MandateError {
    /// Registry index or schema document could not be fetched or parsed.
    #[error("registry unreachable: {url} - {message}")]
    RegistryUnreachable { url: String, message: String },

    /// Kind is not listed in the registry index.
    #[error("unknown primitive kind \"{kind}\". Available: {}", format_available(.available))]
    UnknownKind { kind: String, available: Vec<String> },

    /// Payload does not match the schema for its kind.
    #[error("payload does not match schema for {kind}:\n{}", .violations.join("\n"))]
    Validation {
        kind: String,
        violations: Vec<String>,
    },

    /// Signature slot is already populated.
    #[error("mandate {mandate_id} is already signed by the {role}")]
    AlreadySigned {
        mandate_id: String,
        role: SignerRole,
    },

    /// Client tried to sign before the server.
    #[error("mandate {mandate_id} must be signed by the server before the client")]
    OutOfOrderSignature { mandate_id: String },

    /// Deadline has passed; the mandate can no longer be signed.
    #[error("mandate {mandate_id} expired at {deadline}")]
    Expired {
        mandate_id: String,
        deadline: String,
    },

    /// Signer address does not match the party it signs for.
    #[error("signer {signer} is not the {role} of this mandate ({expected})")]
    SignerMismatch {
        role: SignerRole,
        signer: String,
        expected: String,
    },

    /// Mandate is not present in local storage.
    #[error("mandate not found: {mandate_id}")]
    StorageNotFound { mandate_id: String },

    /// Local storage failure.
    #[error("storage error: {message}")]
    Storage { message: String },

    /// Key material or signing failure.
    #[error("signer error: {message}")]
    Signer { message: String },

    /// Transport failure.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Caller supplied something unusable.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// JSON (de)serialization failure.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "(none)".to_string()
    } else {
        available.join(", ")
    }
}

impl MandateError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Caller errors
            Self::UnknownKind { .. } => 1,
            Self::Validation { .. } => 1,
            Self::InvalidInput { .. } => 1,
            Self::StorageNotFound { .. } => 1,

            // Illegal transitions
            Self::AlreadySigned { .. } => 3,
            Self::OutOfOrderSignature { .. } => 3,
            Self::Expired { .. } => 3,
            Self::SignerMismatch { .. } => 3,

            // Network/transient
            Self::RegistryUnreachable { .. } => 5,
            Self::Transport { .. } => 5,

            // Other
            Self::Storage { .. } => 6,
            Self::Signer { .. } => 6,
            Self::Serialization { .. } => 6,
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for MandateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for MandateError {
    fn from(err: reqwest::Error) -> Self {
        Self::RegistryUnreachable {
            url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for MandateError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

/// Result type for mandate operations.
pub type MandateResult<T> = Result<T, MandateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_lists_available() {
        let err = MandateError::UnknownKind {
            kind: "swap@9".to_string(),
            available: vec!["bridge@1".to_string(), "swap@1".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "unknown primitive kind \"swap@9\". Available: bridge@1, swap@1"
        );

        let empty = MandateError::UnknownKind {
            kind: "swap@1".to_string(),
            available: vec![],
        };
        assert!(empty.to_string().ends_with("(none)"));
    }

    #[test]
    fn test_validation_message_one_violation_per_line() {
        let err = MandateError::Validation {
            kind: "swap@1".to_string(),
            violations: vec![
                "<root>: \"minOut\" is a required property".to_string(),
                "<root>: unexpected property extra".to_string(),
            ],
        };
        let msg = err.to_string();
        assert_eq!(msg.lines().count(), 3);
        assert!(msg.contains("minOut"));
        assert!(msg.contains("unexpected property extra"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            MandateError::StorageNotFound {
                mandate_id: "x".to_string()
            }
            .exit_code(),
            1
        );
        assert_eq!(
            MandateError::OutOfOrderSignature {
                mandate_id: "x".to_string()
            }
            .exit_code(),
            3
        );
        assert_eq!(
            MandateError::RegistryUnreachable {
                url: "u".to_string(),
                message: "m".to_string()
            }
            .exit_code(),
            5
        );
    }
}
