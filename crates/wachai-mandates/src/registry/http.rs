//! HTTP layer: URL joining, status mapping, JSON decoding.
//!
//! This is the ONLY place for status code handling. Every failure becomes
//! `RegistryUnreachable`; nothing is retried here.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{MandateError, MandateResult};

/// Join a base URL and a relative path with exactly one slash between them.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// GET `url` and decode the 2xx JSON body as `T`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> MandateResult<T> {
    debug!(url = %url, "registry fetch");

    let response = client
        .get(url)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(unreachable(url, status_message(status)));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| unreachable(url, format!("failed to read response body: {}", e)))?;

    serde_json::from_slice(&body)
        .map_err(|e| unreachable(url, format!("unexpected response body: {}", e)))
}

fn status_message(status: StatusCode) -> String {
    format!("HTTP {}", status.as_u16())
}

fn unreachable(url: &str, message: String) -> MandateError {
    MandateError::RegistryUnreachable {
        url: url.to_string(),
        message,
    }
}
