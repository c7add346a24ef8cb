//! `wachai create-mandate` - build, validate and server-sign a mandate.
//!
//! The signer (WACHAI_PRIVATE_KEY or the wallet file) becomes the server
//! party. The record is stored locally and printed to stdout.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{ArgGroup, Args};
use serde_json::Value;
use wachai_mandates::{
    resolve_signer, sign_as_server, BuildMode, MandateBuilder, MandateRequest, MandateStore,
    RegistryConfig, SchemaRegistry, Signer, DEFAULT_CHAIN_ID,
};

use super::mandate_store;
use crate::cli::args::GlobalArgs;
use crate::exit_codes::SUCCESS;

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["from_registry", "custom"])
))]
pub struct CreateMandateArgs {
    /// Registry-backed mandate: the payload is validated against the kind's schema
    #[arg(long)]
    pub from_registry: bool,

    /// Custom mandate: no registry lookup, any JSON object payload
    #[arg(long)]
    pub custom: bool,

    /// Client EVM address (recipient)
    #[arg(long)]
    pub client: String,

    /// Core kind, e.g. swap@1 (registry mode) or any label (custom mode)
    #[arg(long)]
    pub kind: String,

    /// EVM chain id
    #[arg(long, default_value_t = DEFAULT_CHAIN_ID, value_parser = clap::value_parser!(u64).range(1..))]
    pub chain_id: u64,

    /// Mandate deadline (RFC 3339). Default: now + 10 minutes
    #[arg(long)]
    pub deadline: Option<String>,

    /// Human readable intent (derived from the payload when omitted)
    #[arg(long)]
    pub intent: Option<String>,

    /// Primitives registry base URL
    #[arg(long, env = "WACHAI_REGISTRY_URL")]
    pub registry_base_url: Option<String>,

    /// JSON object payload, e.g. '{"tokenIn":"0x...","amountIn":"100"}'
    #[arg(long)]
    pub body: String,
}

pub async fn run(args: CreateMandateArgs, global: &GlobalArgs) -> anyhow::Result<i32> {
    let storage = global.storage()?;
    let signer = resolve_signer(&storage)?;

    let payload: Value = serde_json::from_str(&args.body).context("invalid JSON for --body")?;
    if !payload.is_object() {
        anyhow::bail!("--body must be a JSON object");
    }

    let mut request =
        MandateRequest::new(&args.kind, payload, args.chain_id, &signer.address(), &args.client)?;
    if let Some(deadline) = &args.deadline {
        request = request.with_deadline(parse_deadline(deadline)?);
    }
    if let Some(intent) = args.intent {
        request = request.with_intent(intent);
    }

    let (builder, mode) = if args.from_registry {
        let mut config = RegistryConfig::from_env();
        if let Some(url) = args.registry_base_url {
            config = config.with_url(url);
        }
        let base_url = config.url.clone();
        (
            MandateBuilder::new(SchemaRegistry::new(config)?),
            BuildMode::Registry { base_url },
        )
    } else {
        (MandateBuilder::custom_only(), BuildMode::Custom)
    };

    let built = builder.build(request, &mode).await?;
    if args.from_registry && !built.autofilled.is_empty() {
        let names: Vec<&str> = built.autofilled.iter().map(|f| f.as_str()).collect();
        eprintln!(
            "Note: --body was missing {}; defaulted for you before registry schema validation.",
            names.join(", ")
        );
    }

    let mut record = built.record;
    sign_as_server(&mut record, &signer)?;
    mandate_store(&storage).put(&record).await?;

    print!("{}", record.to_pretty_json()?);
    Ok(SUCCESS)
}

fn parse_deadline(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .with_context(|| format!("invalid --deadline {:?} (expected RFC 3339)", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deadline() {
        let parsed = parse_deadline("2030-01-01T10:00:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2030-01-01T08:00:00+00:00");
        assert!(parse_deadline("tomorrow").is_err());
    }
}
