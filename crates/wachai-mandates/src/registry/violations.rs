//! Schema compilation and violation formatting.

use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use serde_json::Value;

use crate::error::{MandateError, MandateResult};

/// Compile a payload schema fetched from `url`. Format keywords are
/// asserted, matching what registry authors expect from ajv with ajv-formats.
///
/// A schema that does not compile is a broken registry document, not a bad
/// payload, so it surfaces as `RegistryUnreachable`.
pub(crate) fn compile(kind: &str, schema: &Value, url: &str) -> MandateResult<Validator> {
    jsonschema::options()
        .should_validate_formats(true)
        .build(schema)
        .map_err(|e| MandateError::RegistryUnreachable {
            url: url.to_string(),
            message: format!("invalid payload schema for {}: {}", kind, e),
        })
}

/// Every violation of `instance`, one `<path>: <reason>` line each.
pub(crate) fn collect_violations(validator: &Validator, instance: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    for error in validator.iter_errors(instance) {
        let path = error.instance_path().to_string();
        let where_ = if path.is_empty() {
            "<root>".to_string()
        } else {
            path
        };

        match error.kind() {
            ValidationErrorKind::AdditionalProperties { unexpected }
            | ValidationErrorKind::UnevaluatedProperties { unexpected } => {
                for property in unexpected {
                    lines.push(format!("{}: unexpected property {}", where_, property));
                }
            }
            _ => lines.push(format!("{}: {}", where_, error)),
        }
    }
    lines
}
