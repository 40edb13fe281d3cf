use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::relay::RelayError;

/// Errors of the HTTP surface. Relay failures keep their own envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("no rows")]
    NoRows,

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UnknownTable(_) | AppError::UnknownFunction(_) | AppError::NoRows => {
                StatusCode::NOT_FOUND
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Relay(e) => e.status(),
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Relay(e) => return e.into_response(),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                // Table reads surface the database message to the dashboard.
                e.to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.into())
    }
}
