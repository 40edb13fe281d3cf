//! [`Backend`] over the stockdash server: reqwest for functions and table
//! reads, one tokio-tungstenite socket per change channel.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::{HeaderValue, Request};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::backend::{Backend, Channel, TableQuery};
use super::error::SyncError;
use crate::config::ClientConfig;
use crate::realtime::{ChangeEvent, ChangeKind, Table};

type WsRequest = Request<()>;

const CHANNEL_CAPACITY: usize = 64;
const PING_INTERVAL: Duration = Duration::from_secs(25);
const BASE_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    config: ClientConfig,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.config.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn read_request(&self, path: &str, query: &TableQuery) -> RequestBuilder {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(user_id) = &query.user_id {
            params.push(("user_id", user_id.clone()));
        }
        if let Some(portfolio_id) = &query.portfolio_id {
            params.push(("portfolio_id", portfolio_id.clone()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        self.authed(self.http.get(self.url(path)).query(&params))
    }

    fn realtime_url(&self, table: Table) -> String {
        let base = self.config.api_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws_base}/realtime/{table}")
    }
}

/// `error` field of a failure envelope, if the body has one.
fn envelope_error(body: &Value) -> Option<String> {
    body.get("error").and_then(Value::as_str).map(str::to_string)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn current_user(&self) -> Option<String> {
        self.config.user_id.clone()
    }

    async fn invoke(&self, function: &str, body: Value) -> Result<Value, SyncError> {
        let resp = self
            .authed(self.http.post(self.url(&format!("/functions/{function}"))))
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Relay(format!("Failed to reach {function}: {e}")))?;

        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        let succeeded = body.get("success").and_then(Value::as_bool).unwrap_or(false);

        if !status.is_success() || !succeeded {
            let message = envelope_error(&body)
                .unwrap_or_else(|| format!("Failed to trigger {function} ({status})"));
            return Err(SyncError::Relay(message));
        }

        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }

    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>, SyncError> {
        let resp = self
            .read_request(&format!("/rest/{}", query.table), query)
            .send()
            .await?;

        let status = resp.status();
        let body: Value = resp.json().await?;
        if !status.is_success() {
            return Err(SyncError::Query(
                envelope_error(&body).unwrap_or_else(|| status.to_string()),
            ));
        }

        match body.get("data") {
            Some(Value::Array(rows)) => Ok(rows.clone()),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(SyncError::Decode(format!("expected row list, got {other}"))),
        }
    }

    async fn select_latest(&self, query: &TableQuery) -> Result<Option<Value>, SyncError> {
        let resp = self
            .read_request(&format!("/rest/{}/latest", query.table), query)
            .send()
            .await?;

        let status = resp.status();
        let body: Value = resp.json().await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SyncError::Query(
                envelope_error(&body).unwrap_or_else(|| status.to_string()),
            ));
        }

        Ok(body.get("data").cloned().filter(|row| !row.is_null()))
    }

    async fn subscribe(&self, table: Table) -> Result<Channel, SyncError> {
        let url = self.realtime_url(table);
        let token = self.config.api_token.clone();
        // Fail fast on a bad URL or token instead of inside the feeder.
        build_ws_request(&url, token.as_deref())?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(run_channel(url, token, table, tx));
        Ok(Channel::new(table, rx, Some(task)))
    }
}

fn build_ws_request(url: &str, token: Option<&str>) -> Result<WsRequest, SyncError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| SyncError::Subscribe(e.to_string()))?;
    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| SyncError::Subscribe(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    Ok(request)
}

/// Feed one change channel until its receiver goes away, reconnecting with
/// capped exponential backoff. After a reconnect one synthetic `UPDATE` is
/// delivered so the owner re-reads whatever changed while disconnected.
async fn run_channel(
    url: String,
    token: Option<String>,
    table: Table,
    tx: mpsc::Sender<ChangeEvent>,
) {
    let mut attempt: u32 = 0;
    let mut connected_before = false;

    loop {
        let request = match build_ws_request(&url, token.as_deref()) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(table = %table, error = %e, "Invalid realtime request");
                return;
            }
        };

        match connect_async(request).await {
            Ok((ws_stream, _response)) => {
                tracing::debug!(table = %table, "Realtime channel connected");
                attempt = 0;

                if connected_before {
                    let resync = ChangeEvent { table, event: ChangeKind::Update };
                    if tx.send(resync).await.is_err() {
                        return;
                    }
                }
                connected_before = true;

                let (mut write, mut read) = ws_stream.split();
                let mut ping_timer = interval(PING_INTERVAL);
                ping_timer.tick().await;

                loop {
                    tokio::select! {
                        msg = read.next() => {
                            match msg {
                                Some(Ok(Message::Text(text))) => {
                                    match serde_json::from_str::<ChangeEvent>(text.as_str()) {
                                        Ok(event) if event.table == table => {
                                            if tx.send(event).await.is_err() {
                                                return;
                                            }
                                        }
                                        Ok(_) => {}
                                        Err(e) => {
                                            tracing::warn!(table = %table, error = %e, "Unparseable change event");
                                        }
                                    }
                                }
                                Some(Ok(Message::Ping(data))) => {
                                    if write.send(Message::Pong(data)).await.is_err() {
                                        break;
                                    }
                                }
                                Some(Ok(Message::Close(_))) | None => break,
                                Some(Ok(_)) => {}
                                Some(Err(e)) => {
                                    tracing::warn!(table = %table, error = %e, "Realtime read error");
                                    break;
                                }
                            }
                        }
                        _ = ping_timer.tick() => {
                            if write.send(Message::Ping(Vec::new().into())).await.is_err() {
                                break;
                            }
                        }
                        _ = tx.closed() => {
                            let _ = write.send(Message::Close(None)).await;
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "Realtime connection failed");
            }
        }

        if tx.is_closed() {
            return;
        }

        let delay = BASE_RECONNECT_DELAY * 2u32.saturating_pow(attempt);
        let delay = delay.min(MAX_RECONNECT_DELAY);
        attempt = attempt.saturating_add(1);
        tracing::debug!(table = %table, delay_secs = delay.as_secs(), attempt, "Reconnecting realtime channel");
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend(url: &str) -> HttpBackend {
        HttpBackend::new(ClientConfig {
            api_url: url.into(),
            api_token: None,
            user_id: Some("u1".into()),
        })
    }

    #[test]
    fn test_realtime_url_switches_scheme() {
        assert_eq!(
            backend("http://localhost:8080/").realtime_url(Table::Stocks),
            "ws://localhost:8080/realtime/stocks"
        );
        assert_eq!(
            backend("https://dash.example.com").realtime_url(Table::UserAlerts),
            "wss://dash.example.com/realtime/user_alerts"
        );
    }

    #[test]
    fn test_envelope_error_extraction() {
        let body = json!({ "success": false, "error": "N8N webhook failed: Bad Gateway" });
        assert_eq!(
            envelope_error(&body).as_deref(),
            Some("N8N webhook failed: Bad Gateway")
        );
        assert_eq!(envelope_error(&json!({ "success": true })), None);
    }

    #[test]
    fn test_read_request_encodes_scope_as_query() {
        let query = TableQuery::new(Table::PortfolioTransactions)
            .user("u 1")
            .portfolio("default")
            .limit(10);
        let request = backend("http://localhost:8080")
            .read_request("/rest/portfolio_transactions", &query)
            .build()
            .unwrap();

        assert_eq!(request.url().path(), "/rest/portfolio_transactions");
        assert_eq!(
            request.url().query(),
            Some("user_id=u+1&portfolio_id=default&limit=10")
        );
    }

    #[tokio::test]
    async fn test_current_user_comes_from_config() {
        assert_eq!(backend("http://x").current_user().await.as_deref(), Some("u1"));
    }
}
