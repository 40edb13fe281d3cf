use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use crate::errors::AppError;
use crate::relay::{self, TriggerDomain};
use crate::AppState;

/// POST /functions/:name: run one trigger relay.
///
/// The body is taken raw so a malformed payload is reported in the relay
/// envelope rather than by axum's extractor.
pub async fn invoke(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let domain =
        TriggerDomain::from_function_name(&name).ok_or(AppError::UnknownFunction(name))?;

    let success = relay::dispatch(&state, domain, &body).await?;
    Ok(success.into_response())
}
