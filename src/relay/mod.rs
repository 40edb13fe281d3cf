//! Trigger relay: forward a dashboard request to its external webhook,
//! persist the returned data, append an audit row and answer the caller.

pub mod domain;
pub mod domains;
pub mod error;
pub mod payload;
pub mod webhook;

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::trigger_log_repo::{self, NewTriggerLog};
use crate::db::{ReplaceOutcome, WriteOutcome};
use crate::relay::payload::Records;
use crate::realtime::{ChangeKind, Changefeed, Table};
use crate::AppState;

pub use domain::TriggerDomain;
pub use error::RelayError;

/// Per-domain behaviour plugged into [`run`].
#[async_trait]
pub trait DomainRelay: Send + Sync + 'static {
    const DOMAIN: TriggerDomain;

    /// Key of the webhook body holding the result; `None` means the whole
    /// body. The success envelope nests the result under the same key.
    const RESULT_KEY: Option<&'static str> = None;

    type Request: DeserializeOwned + Serialize + Send + Sync;
    type Result: DeserializeOwned + Serialize + Default + Send + Sync;

    fn user_id(req: &Self::Request) -> &str;

    /// Domain parameters sent to the webhook, before the common fields are added.
    fn forward_params(req: &Self::Request) -> Value {
        serde_json::to_value(req).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Request id to reuse instead of generating a fresh one.
    fn request_id(_req: &Self::Request) -> Option<Uuid> {
        None
    }

    /// `trigger_type` recorded in the audit log.
    fn log_type(_req: &Self::Request) -> String {
        Self::DOMAIN.as_str().to_string()
    }

    fn symbols(_req: &Self::Request) -> Option<Vec<String>> {
        None
    }

    /// Store the webhook result. Individual write failures go through
    /// `ctx` and never abort the relay.
    async fn persist(ctx: &PersistContext<'_>, req: &Self::Request, result: &Self::Result);
}

/// Write sink handed to [`DomainRelay::persist`]: logs and counts failed
/// writes and publishes a change event for every effective one.
pub struct PersistContext<'a> {
    pub db: &'a PgPool,
    changes: &'a Changefeed,
    domain: TriggerDomain,
    failures: AtomicU32,
}

impl<'a> PersistContext<'a> {
    pub fn new(db: &'a PgPool, changes: &'a Changefeed, domain: TriggerDomain) -> Self {
        Self {
            db,
            changes,
            domain,
            failures: AtomicU32::new(0),
        }
    }

    pub fn upserted(&self, table: Table, key: &str, res: anyhow::Result<WriteOutcome>) {
        match res {
            Ok(outcome) => {
                if let Some(kind) = outcome.change_kind() {
                    self.changes.publish(table, kind);
                }
            }
            Err(e) => self.record(table, key, e),
        }
    }

    pub fn replaced(&self, table: Table, key: &str, res: anyhow::Result<ReplaceOutcome>) {
        match res {
            Ok(outcome) => {
                if outcome.deleted > 0 {
                    self.changes.publish(table, ChangeKind::Delete);
                }
                if outcome.inserted > 0 {
                    self.changes.publish(table, ChangeKind::Insert);
                }
            }
            Err(e) => self.record(table, key, e),
        }
    }

    /// Result of an in-place `UPDATE`; `Ok(false)` means nothing matched.
    pub fn updated(&self, table: Table, key: &str, res: anyhow::Result<bool>) {
        match res {
            Ok(true) => self.changes.publish(table, ChangeKind::Update),
            Ok(false) => {}
            Err(e) => self.record(table, key, e),
        }
    }

    pub fn inserted<T>(&self, table: Table, key: &str, res: anyhow::Result<T>) {
        match res {
            Ok(_) => self.changes.publish(table, ChangeKind::Insert),
            Err(e) => self.record(table, key, e),
        }
    }

    /// Count a write that was skipped because the webhook sent unusable data.
    pub fn skipped(&self, table: Table, key: &str, reason: &str) {
        self.record(table, key, anyhow::anyhow!("{reason}"));
    }

    /// Count every element of a webhook list that did not parse.
    pub fn rejected<T>(&self, table: Table, records: &Records<T>) {
        for rejected in &records.rejected {
            self.skipped(table, &rejected.key, &rejected.reason);
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }

    fn record(&self, table: Table, key: &str, err: anyhow::Error) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        counter!("persistence_errors_total", "domain" => self.domain.as_str(), "table" => table.as_str())
            .increment(1);
        tracing::error!(
            domain = %self.domain,
            table = %table,
            key = %key,
            error = %err,
            "Failed to persist webhook result"
        );
    }
}

/// 200 envelope: `{success, message, data}`.
#[derive(Debug)]
pub struct RelaySuccess {
    pub message: String,
    pub data: Value,
}

impl IntoResponse for RelaySuccess {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": self.message,
                "data": self.data,
            })),
        )
            .into_response()
    }
}

/// Route a raw request body to the relay of `domain`.
pub async fn dispatch(
    state: &AppState,
    domain: TriggerDomain,
    body: &[u8],
) -> Result<RelaySuccess, RelayError> {
    use domains::*;

    match domain {
        TriggerDomain::Dashboard => run::<DashboardRelay>(state, body).await,
        TriggerDomain::Portfolio => run::<PortfolioRelay>(state, body).await,
        TriggerDomain::Predictions => run::<PredictionsRelay>(state, body).await,
        TriggerDomain::Alerts => run::<AlertsRelay>(state, body).await,
        TriggerDomain::Watchlist => run::<WatchlistRelay>(state, body).await,
        TriggerDomain::Search => run::<SearchRelay>(state, body).await,
        TriggerDomain::Settings => run::<SettingsRelay>(state, body).await,
        TriggerDomain::Analytics => run::<AnalyticsRelay>(state, body).await,
        TriggerDomain::Notification => run::<NotificationRelay>(state, body).await,
    }
}

pub async fn run<R: DomainRelay>(state: &AppState, body: &[u8]) -> Result<RelaySuccess, RelayError> {
    let domain = R::DOMAIN;
    counter!("trigger_requests_total", "domain" => domain.as_str()).increment(1);

    let res = relay::<R>(state, body).await;
    if let Err(e) = &res {
        counter!("trigger_failures_total", "domain" => domain.as_str(), "kind" => e.kind())
            .increment(1);
        tracing::error!(domain = %domain, kind = e.kind(), error = %e, "Trigger relay failed");
    }
    res
}

async fn relay<R: DomainRelay>(state: &AppState, body: &[u8]) -> Result<RelaySuccess, RelayError> {
    let domain = R::DOMAIN;

    // Step 1: webhook URL, checked before anything else touches the request
    let url = state
        .config
        .webhooks
        .get(domain)
        .ok_or(RelayError::NotConfigured(domain.env_var()))?;

    // Step 2: request body
    let req: R::Request =
        serde_json::from_slice(body).map_err(|e| RelayError::InvalidPayload(e.to_string()))?;
    let user_id = R::user_id(&req).to_string();
    if user_id.trim().is_empty() {
        return Err(RelayError::InvalidPayload("userId is required".into()));
    }

    // Step 3: forward payload
    let request_id = R::request_id(&req).unwrap_or_else(Uuid::new_v4);
    let forward = forward_payload(domain, R::forward_params(&req), &user_id, request_id);

    tracing::info!(domain = %domain, request_id = %request_id, user_id = %user_id, "Forwarding trigger");

    // Step 4: webhook call
    let raw = state.webhook.forward(domain, url, &forward).await?;
    let result: R::Result = extract_result(&raw, R::RESULT_KEY).map_err(|reason| {
        RelayError::InvalidResponse {
            label: domain.webhook_label(),
            reason,
        }
    })?;

    // Step 5: persistence
    let ctx = PersistContext::new(&state.db, &state.changes, domain);
    R::persist(&ctx, &req, &result).await;

    // Step 6: audit row
    let status = if ctx.failures() > 0 { "partial" } else { "success" };
    let symbols = R::symbols(&req);
    let trigger_type = R::log_type(&req);
    let log = NewTriggerLog {
        user_id: &user_id,
        trigger_type: &trigger_type,
        symbols: symbols.as_deref(),
        status,
        response_data: &raw,
    };
    ctx.inserted(
        Table::TriggerLogs,
        &request_id.to_string(),
        trigger_log_repo::insert_trigger_log(&state.db, &log).await,
    );

    tracing::info!(
        domain = %domain,
        request_id = %request_id,
        status,
        persistence_errors = ctx.failures(),
        "Trigger completed"
    );

    // Step 7: envelope
    let data = success_data(&result, R::RESULT_KEY, request_id);
    Ok(RelaySuccess {
        message: domain.success_message(),
        data,
    })
}

fn forward_payload(domain: TriggerDomain, params: Value, user_id: &str, request_id: Uuid) -> Value {
    let mut payload = match params {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("params".into(), other);
            map
        }
    };

    payload.insert("trigger".into(), Value::from(domain.trigger_tag()));
    payload.insert("userId".into(), Value::from(user_id));
    payload.insert("timestamp".into(), Value::from(Utc::now().to_rfc3339()));
    payload.insert("requestId".into(), Value::from(request_id.to_string()));
    Value::Object(payload)
}

/// Missing or `null` results become the type's default.
fn extract_result<T: DeserializeOwned + Default>(raw: &Value, key: Option<&str>) -> Result<T, String> {
    let value = match key {
        Some(key) => raw.get(key).cloned().unwrap_or(Value::Null),
        None => raw.clone(),
    };

    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn success_data<T: Serialize>(result: &T, key: Option<&str>, request_id: Uuid) -> Value {
    let value = serde_json::to_value(result).unwrap_or(Value::Null);

    let mut data = match (key, value) {
        (Some(key), value) => {
            let mut map = Map::new();
            map.insert(key.to_string(), value);
            map
        }
        (None, Value::Object(map)) => map,
        (None, Value::Null) => Map::new(),
        (None, other) => {
            let mut map = Map::new();
            map.insert("result".into(), other);
            map
        }
    };

    data.insert("triggeredAt".into(), Value::from(Utc::now().to_rfc3339()));
    data.insert("requestId".into(), Value::from(request_id.to_string()));
    Value::Object(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::payload::{DashboardResult, PortfolioResult};

    #[test]
    fn test_forward_payload_adds_common_fields() {
        let id = Uuid::new_v4();
        let payload = forward_payload(
            TriggerDomain::Dashboard,
            json!({ "symbols": ["AAPL"], "triggerType": "dashboard" }),
            "u1",
            id,
        );

        assert_eq!(payload["trigger"], "dashboardtrigger");
        assert_eq!(payload["userId"], "u1");
        assert_eq!(payload["symbols"][0], "AAPL");
        assert_eq!(payload["requestId"], id.to_string());
        assert!(payload["timestamp"].is_string());
    }

    #[test]
    fn test_extract_result_from_whole_body() {
        let raw = json!({ "stocks": [{ "symbol": "AAPL", "price": 190 }] });
        let result: DashboardResult = extract_result(&raw, None).unwrap();
        assert_eq!(result.stocks.len(), 1);
    }

    #[test]
    fn test_extract_result_missing_key_is_default() {
        let raw = json!({ "unrelated": true });
        let result: PortfolioResult = extract_result(&raw, Some("portfolio")).unwrap();
        assert!(result.holdings.is_empty());
        assert!(result.summary.is_none());
    }

    #[test]
    fn test_extract_result_rejects_wrong_shape() {
        let raw = json!({ "stocks": "not a list" });
        assert!(extract_result::<DashboardResult>(&raw, None).is_err());
    }

    #[test]
    fn test_success_data_nests_under_result_key() {
        let id = Uuid::new_v4();
        let data = success_data(&PortfolioResult::default(), Some("portfolio"), id);

        assert!(data["portfolio"]["holdings"].is_array());
        assert_eq!(data["requestId"], id.to_string());
        assert!(data["triggeredAt"].is_string());
    }

    #[test]
    fn test_success_data_flattens_object_results() {
        let data = success_data(&DashboardResult::default(), None, Uuid::new_v4());
        assert!(data["stocks"].is_array());
        assert!(data.get("result").is_none());
    }
}
