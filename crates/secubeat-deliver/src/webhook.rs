//! Signed webhook sink: one event per POST.

use crate::sink::{Sink, SinkError};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use secubeat_types::DeliveryBatch;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex HMAC-SHA256 of a body under the shared secret.
pub(crate) fn sign(secret: &str, body: &[u8]) -> Result<String, SinkError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SinkError::Signature(e.to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Posts each event individually, optionally carrying an HMAC signature
/// over the raw JSON body.
pub struct WebhookSink {
    url: String,
    secret: Option<String>,
    client: Client,
}

impl WebhookSink {
    /// Build a webhook sink.
    pub fn new(url: impl Into<String>, secret: Option<String>) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            url: url.into(),
            secret,
            client,
        })
    }
}

#[async_trait]
impl Sink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, batch: &DeliveryBatch) -> Result<(), SinkError> {
        for event in &batch.events {
            let body = serde_json::to_vec(event)?;

            let mut request = self
                .client
                .post(&self.url)
                .header("Content-Type", "application/json");
            if let Some(secret) = &self.secret {
                let signature = sign(secret, &body)?;
                request = request.header("X-Signature", format!("sha256={signature}"));
            }

            let response = request.body(body).send().await?;
            if response.status() != StatusCode::OK {
                return Err(SinkError::Status {
                    status: response.status().as_u16(),
                });
            }
        }
        Ok(())
    }
}
