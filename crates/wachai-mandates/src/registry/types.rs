//! Registry document types and client configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default primitives registry.
pub const DEFAULT_REGISTRY_BASE_URL: &str =
    "https://raw.githubusercontent.com/quillai-network/mandate-specs/main/spec";

/// Path of the index document below the base URL.
pub const REGISTRY_INDEX_PATH: &str = "primitives/registry.json";

/// Response from GET {base}/primitives/registry.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryIndex {
    /// Registry format version.
    pub spec_version: String,

    /// Known primitives.
    pub primitives: Vec<PrimitiveDescriptor>,
}

impl RegistryIndex {
    pub fn find(&self, kind: &str) -> Option<&PrimitiveDescriptor> {
        self.primitives.iter().find(|p| p.kind == kind)
    }

    /// Known kinds, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.primitives.iter().map(|p| p.kind.clone()).collect();
        kinds.sort();
        kinds
    }
}

/// One entry in the registry index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveDescriptor {
    /// Kind (e.g., "swap@1").
    pub kind: String,

    /// Human-readable name.
    pub name: String,

    /// Schema version.
    pub version: u32,

    /// Schema document path relative to the base URL.
    pub schema_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Schema document for one primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveSchema {
    pub kind: String,

    pub version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for `core.payload`.
    pub payload_schema: Value,
}

/// Registry client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Default base URL when callers do not pass one.
    #[serde(default = "default_registry_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl RegistryConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `WACHAI_REGISTRY_URL` | Registry base URL |
    /// | `WACHAI_REGISTRY_TIMEOUT` | Request timeout in seconds (default: 30) |
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("WACHAI_REGISTRY_URL").unwrap_or_else(|_| default_registry_url()),
            timeout_secs: std::env::var("WACHAI_REGISTRY_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
        }
    }

    /// Set the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
