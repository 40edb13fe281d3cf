use std::time::Instant;

use metrics::histogram;
use reqwest::Client;
use serde_json::Value;

use super::domain::TriggerDomain;
use super::error::RelayError;

/// Posts forward payloads to the external workflow webhooks.
///
/// No timeout and no retry: a failed call surfaces to the caller as-is.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: Client,
}

impl Default for WebhookClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// POST `payload` to `url` and return the parsed JSON response body.
    pub async fn forward(
        &self,
        domain: TriggerDomain,
        url: &str,
        payload: &Value,
    ) -> Result<Value, RelayError> {
        let label = domain.webhook_label();
        let started = Instant::now();

        let resp = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|source| RelayError::Network {
                label: label.clone(),
                source,
            })?;

        histogram!("webhook_latency_seconds", "domain" => domain.as_str())
            .record(started.elapsed().as_secs_f64());

        let status = resp.status();
        if !status.is_success() {
            let status_text = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string());
            tracing::warn!(domain = %domain, status = %status, "Webhook returned non-2xx");
            return Err(RelayError::Webhook { label, status_text });
        }

        let body = resp.bytes().await.map_err(|source| RelayError::Network {
            label: label.clone(),
            source,
        })?;

        serde_json::from_slice(&body).map_err(|e| RelayError::InvalidResponse {
            label,
            reason: e.to_string(),
        })
    }
}
