use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Failures that abort a relay invocation before anything is persisted.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0} not configured in server secrets")]
    NotConfigured(&'static str),

    #[error("invalid request body: {0}")]
    InvalidPayload(String),

    #[error("{label} webhook unreachable: {source}")]
    Network {
        label: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{label} webhook failed: {status_text}")]
    Webhook { label: String, status_text: String },

    #[error("{label} webhook returned an invalid body: {reason}")]
    InvalidResponse { label: String, reason: String },
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const KINDS: [&'static str; 5] = ["configuration", "payload", "network", "webhook", "response"];

    /// Short category used as a metrics label. One of [`Self::KINDS`].
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::NotConfigured(_) => "configuration",
            RelayError::InvalidPayload(_) => "payload",
            RelayError::Network { .. } => "network",
            RelayError::Webhook { .. } => "webhook",
            RelayError::InvalidResponse { .. } => "response",
        }
    }
}

#[derive(Serialize)]
struct FailureEnvelope {
    success: bool,
    error: String,
    timestamp: DateTime<Utc>,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(FailureEnvelope {
                success: false,
                error: self.to_string(),
                timestamp: Utc::now(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_message_names_the_variable() {
        let err = RelayError::NotConfigured("N8N_ANALYTICS_WEBHOOK_URL");
        assert_eq!(
            err.to_string(),
            "N8N_ANALYTICS_WEBHOOK_URL not configured in server secrets"
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_webhook_failure_message_carries_status_text() {
        let err = RelayError::Webhook {
            label: "N8N".into(),
            status_text: "Service Unavailable".into(),
        };
        assert_eq!(err.to_string(), "N8N webhook failed: Service Unavailable");
    }

    #[test]
    fn test_invalid_payload_is_client_error() {
        let err = RelayError::InvalidPayload("userId is required".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
