//! Pooled reqwest client for provider calls

use crate::providers::{RelayError, WireRequest};
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

const USER_AGENT: &str = concat!("medley/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self, RelayError> {
        Self::with_config(Duration::from_secs(10), Duration::from_secs(120))
    }

    /// Create a client with custom connect and request timeouts
    pub fn with_config(
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, RelayError> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| {
                RelayError::ProviderUnavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// POST one wire request and return the raw response.
    ///
    /// The caller owns status handling and body consumption; the request id
    /// rides along as a correlation header and in logs, never in
    /// user-facing output.
    pub async fn post(
        &self,
        base_url: &str,
        wire: &WireRequest,
        timeout: Duration,
        request_id: Uuid,
    ) -> Result<reqwest::Response, RelayError> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), wire.endpoint);
        debug!(%url, %request_id, "sending provider request");

        let mut builder = self
            .client
            .post(&url)
            .timeout(timeout)
            .header("x-request-id", request_id.to_string())
            .json(&wire.body);
        for (name, value) in &wire.headers {
            builder = builder.header(name, value);
        }

        builder.send().await.map_err(RelayError::from)
    }
}
