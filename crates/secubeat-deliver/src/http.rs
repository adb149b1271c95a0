//! Authenticated HTTPS batch sink.

use crate::sink::{Sink, SinkError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use secubeat_types::DeliveryBatch;
use std::time::Duration;
use tracing::debug;

/// HTTP sink configuration.
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    /// Endpoint receiving batch envelopes.
    pub url: String,
    /// Optional bearer token.
    pub token: Option<String>,
    /// Verify TLS certificates.
    pub verify_tls: bool,
    /// Request timeout.
    pub timeout: Duration,
}

impl HttpSinkConfig {
    /// Config for the given endpoint with defaults elsewhere.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            verify_tls: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Sends whole batch envelopes as single JSON POSTs.
pub struct HttpSink {
    config: HttpSinkConfig,
    client: Client,
}

impl HttpSink {
    /// Build the sink and its HTTP client.
    pub fn new(config: HttpSinkConfig) -> Result<Self, SinkError> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(concat!("secubeat/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl Sink for HttpSink {
    fn name(&self) -> &str {
        "server"
    }

    async fn deliver(&self, batch: &DeliveryBatch) -> Result<(), SinkError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json")
            .json(batch);

        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(SinkError::Status {
                status: status.as_u16(),
            });
        }

        debug!(count = batch.count, "delivered batch");
        Ok(())
    }
}
