//! Primitives registry client.
//!
//! Resolves a mandate kind to its payload schema and validates payloads.
//! Three independent caches live on the client instance, each keyed by what
//! actually varies:
//!
//! | Cache | Key |
//! |-------|-----|
//! | index | base URL |
//! | schema document | (base URL, schema path) |
//! | compiled validator | (base URL, kind, version) |
//!
//! Entries are never evicted. Concurrent population of the same key may
//! compute twice; the later insert wins and both values are equivalent.

use std::sync::Arc;
use std::time::Duration;

use jsonschema::Validator;
use moka::sync::Cache;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::error::{MandateError, MandateResult};

mod http;
pub mod types;
mod violations;

pub use types::{
    PrimitiveDescriptor, PrimitiveSchema, RegistryConfig, RegistryIndex,
    DEFAULT_REGISTRY_BASE_URL, REGISTRY_INDEX_PATH,
};

use http::{fetch_json, join_url};

const USER_AGENT_VALUE: &str = concat!("wachai-mandates/", env!("CARGO_PKG_VERSION"));

type SchemaKey = (String, String);
type ValidatorKey = (String, String, u32);

/// Registry client with per-instance caches.
#[derive(Clone)]
pub struct SchemaRegistry {
    client: reqwest::Client,
    config: RegistryConfig,
    indexes: Cache<String, Arc<RegistryIndex>>,
    schemas: Cache<SchemaKey, Arc<PrimitiveSchema>>,
    validators: Cache<ValidatorKey, Arc<Validator>>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("default_base_url", &self.config.url)
            .field("cached_indexes", &self.indexes.entry_count())
            .field("cached_schemas", &self.schemas.entry_count())
            .field("cached_validators", &self.validators.entry_count())
            .finish()
    }
}

impl SchemaRegistry {
    pub fn new(config: RegistryConfig) -> MandateResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| MandateError::RegistryUnreachable {
                url: config.url.clone(),
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            config,
            indexes: Cache::builder().build(),
            schemas: Cache::builder().build(),
            validators: Cache::builder().build(),
        })
    }

    pub fn from_env() -> MandateResult<Self> {
        Self::new(RegistryConfig::from_env())
    }

    /// Base URL used when callers pass none.
    pub fn default_base_url(&self) -> &str {
        &self.config.url
    }

    /// Fetch the registry index, once per base URL.
    pub async fn fetch_index(&self, base_url: &str) -> MandateResult<Arc<RegistryIndex>> {
        if let Some(index) = self.indexes.get(base_url) {
            debug!(base_url, "registry index cache hit");
            return Ok(index);
        }

        let url = join_url(base_url, REGISTRY_INDEX_PATH);
        let index: Arc<RegistryIndex> = Arc::new(fetch_json(&self.client, &url).await?);
        self.indexes.insert(base_url.to_string(), index.clone());
        debug!(base_url, primitives = index.primitives.len(), "registry index cached");
        Ok(index)
    }

    /// Look up a kind in the index.
    pub async fn resolve_kind(
        &self,
        kind: &str,
        base_url: &str,
    ) -> MandateResult<PrimitiveDescriptor> {
        let index = self.fetch_index(base_url).await?;
        index
            .find(kind)
            .cloned()
            .ok_or_else(|| MandateError::UnknownKind {
                kind: kind.to_string(),
                available: index.kinds(),
            })
    }

    /// Fetch the schema document for a kind, once per (base URL, schema path).
    pub async fn fetch_schema(
        &self,
        kind: &str,
        base_url: &str,
    ) -> MandateResult<Arc<PrimitiveSchema>> {
        let primitive = self.resolve_kind(kind, base_url).await?;
        let key = (base_url.to_string(), primitive.schema_path.clone());
        if let Some(schema) = self.schemas.get(&key) {
            debug!(kind, "schema cache hit");
            return Ok(schema);
        }

        let url = join_url(base_url, &primitive.schema_path);
        let schema: Arc<PrimitiveSchema> = Arc::new(fetch_json(&self.client, &url).await?);
        self.schemas.insert(key, schema.clone());
        debug!(kind, url = %url, "schema cached");
        Ok(schema)
    }

    /// Validate a payload against the schema for `kind`.
    ///
    /// All violations are collected into a single `Validation` error.
    pub async fn validate(&self, kind: &str, payload: &Value, base_url: &str) -> MandateResult<()> {
        let primitive = self.resolve_kind(kind, base_url).await?;
        let schema = self.fetch_schema(kind, base_url).await?;
        let url = join_url(base_url, &primitive.schema_path);
        let validator = self.validator_for(base_url, &schema, &url)?;

        let violations = violations::collect_violations(&validator, payload);
        if violations.is_empty() {
            return Ok(());
        }
        Err(MandateError::Validation {
            kind: schema.kind.clone(),
            violations,
        })
    }

    fn validator_for(
        &self,
        base_url: &str,
        schema: &PrimitiveSchema,
        url: &str,
    ) -> MandateResult<Arc<Validator>> {
        let key = (base_url.to_string(), schema.kind.clone(), schema.version);
        if let Some(validator) = self.validators.get(&key) {
            return Ok(validator);
        }

        let validator = Arc::new(violations::compile(&schema.kind, &schema.payload_schema, url)?);
        self.validators.insert(key, validator.clone());
        debug!(kind = %schema.kind, version = schema.version, "validator compiled");
        Ok(validator)
    }
}
