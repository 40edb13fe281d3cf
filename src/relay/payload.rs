//! Request bodies accepted by the relay endpoints and the result shapes the
//! external webhook sends back. Both sides use camelCase keys.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::models::Direction;

pub const DEFAULT_DASHBOARD_SYMBOLS: [&str; 8] =
    ["AAPL", "GOOGL", "MSFT", "TSLA", "NVDA", "AMZN", "META", "NFLX"];
pub const DEFAULT_PREDICTION_SYMBOLS: [&str; 6] = ["AAPL", "GOOGL", "MSFT", "TSLA", "NVDA", "AMZN"];
pub const DEFAULT_PREDICTION_MODELS: [&str; 4] =
    ["neural_network", "random_forest", "lstm", "ensemble"];

fn default_true() -> bool {
    true
}

fn default_portfolio_id() -> String {
    "default".into()
}

fn default_trigger_type() -> String {
    "dashboard".into()
}

fn default_timeframe() -> String {
    "1w".into()
}

fn default_period() -> String {
    "6m".into()
}

fn default_search_limit() -> u32 {
    20
}

fn default_settings_action() -> String {
    "fetch".into()
}

/// Webhooks are not strict about `"1.2M"` vs `1200000`; accept both.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Record lists
// ---------------------------------------------------------------------------

/// A list from the webhook whose elements are parsed one by one, so a
/// malformed record is set aside instead of rejecting its siblings.
///
/// A missing or `null` list is empty; anything other than an array is still
/// an error.
#[derive(Debug, Clone)]
pub struct Records<T> {
    pub valid: Vec<T>,
    pub rejected: Vec<RejectedRecord>,
}

/// An element that did not parse, with whatever identifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub key: String,
    pub reason: String,
}

impl<T> Records<T> {
    pub fn len(&self) -> usize {
        self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.valid.iter()
    }
}

impl<T> Default for Records<T> {
    fn default() -> Self {
        Self {
            valid: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> From<Vec<T>> for Records<T> {
    fn from(valid: Vec<T>) -> Self {
        Self {
            valid,
            rejected: Vec::new(),
        }
    }
}

impl<T> IntoIterator for Records<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.valid.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Records<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.valid.iter()
    }
}

fn record_key(value: &Value, index: usize) -> String {
    ["symbol", "id", "model", "sector", "asset1"]
        .iter()
        .find_map(|field| match value.get(*field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| format!("#{index}"))
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Records<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
        let mut records = Records::default();

        for (index, value) in raw.into_iter().enumerate() {
            let key = record_key(&value, index);
            match serde_json::from_value::<T>(value) {
                Ok(record) => records.valid.push(record),
                Err(e) => records.rejected.push(RejectedRecord {
                    key,
                    reason: e.to_string(),
                }),
            }
        }
        Ok(records)
    }
}

impl<T: Serialize> Serialize for Records<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.valid)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRequest {
    pub user_id: String,
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    #[serde(default = "default_trigger_type")]
    pub trigger_type: String,
}

impl DashboardRequest {
    pub fn symbols_or_default(&self) -> Vec<String> {
        self.symbols
            .clone()
            .unwrap_or_else(|| owned(&DEFAULT_DASHBOARD_SYMBOLS))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioRequest {
    pub user_id: String,
    #[serde(default = "default_portfolio_id")]
    pub portfolio_id: String,
    #[serde(default = "default_true")]
    pub include_transactions: bool,
    #[serde(default = "default_true")]
    pub include_analytics: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionsRequest {
    pub user_id: String,
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    #[serde(default)]
    pub models: Option<Vec<String>>,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

impl PredictionsRequest {
    pub fn symbols_or_default(&self) -> Vec<String> {
        self.symbols
            .clone()
            .unwrap_or_else(|| owned(&DEFAULT_PREDICTION_SYMBOLS))
    }

    pub fn models_or_default(&self) -> Vec<String> {
        self.models
            .clone()
            .unwrap_or_else(|| owned(&DEFAULT_PREDICTION_MODELS))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRequest {
    pub user_id: String,
    #[serde(default = "default_portfolio_id")]
    pub portfolio_id: String,
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default = "default_true")]
    pub include_risk: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsRequest {
    pub user_id: String,
    #[serde(default = "default_true")]
    pub check_triggers: bool,
    #[serde(default = "default_true")]
    pub update_prices: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistRequest {
    pub user_id: String,
    #[serde(default = "default_true")]
    pub update_prices: bool,
    #[serde(default = "default_true")]
    pub include_metrics: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub user_id: String,
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: u32,
    #[serde(default = "default_true")]
    pub include_popular: bool,
    #[serde(default = "default_true")]
    pub include_trending: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub user_id: String,
    #[serde(default)]
    pub settings: Option<SettingsPayload>,
    #[serde(default = "default_settings_action")]
    pub action: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub request_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Webhook results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPayload {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub change: Decimal,
    #[serde(default)]
    pub change_percent: Decimal,
    #[serde(default, deserialize_with = "string_or_number")]
    pub volume: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub market_cap: String,
    #[serde(default)]
    pub sector: String,
    /// Kept raw so a bad prediction does not cost the stock snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Value>,
}

impl StockPayload {
    pub fn prediction(&self) -> Option<Result<PredictionPayload, String>> {
        self.prediction
            .clone()
            .map(|raw| serde_json::from_value(raw).map_err(|e| e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionPayload {
    /// Empty when embedded in a [`StockPayload`].
    #[serde(default)]
    pub symbol: String,
    pub direction: Direction,
    #[serde(default)]
    pub confidence: Decimal,
    #[serde(default)]
    pub target_price: Decimal,
    #[serde(default)]
    pub timeframe: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub factors: Vec<String>,
    #[serde(default)]
    pub accuracy: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPerformancePayload {
    pub model: String,
    #[serde(default)]
    pub accuracy: Decimal,
    #[serde(default)]
    pub predictions: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DashboardResult {
    #[serde(default)]
    pub stocks: Records<StockPayload>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionsResult {
    #[serde(default)]
    pub predictions: Records<PredictionPayload>,
    #[serde(default)]
    pub model_performance: Records<ModelPerformancePayload>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingPayload {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub shares: Decimal,
    #[serde(default)]
    pub avg_price: Decimal,
    #[serde(default)]
    pub current_price: Decimal,
    #[serde(default)]
    pub value: Decimal,
    #[serde(default)]
    pub gain_loss: Decimal,
    #[serde(default)]
    pub gain_loss_percent: Decimal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub symbol: String,
    #[serde(default)]
    pub shares: Decimal,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPayload {
    #[serde(default)]
    pub total_value: Decimal,
    #[serde(default)]
    pub total_cost: Decimal,
    #[serde(default)]
    pub total_gain_loss: Decimal,
    #[serde(default)]
    pub total_gain_loss_percent: Decimal,
    #[serde(default)]
    pub day_change: Decimal,
    #[serde(default)]
    pub day_change_percent: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PortfolioResult {
    #[serde(default)]
    pub holdings: Records<HoldingPayload>,
    #[serde(default)]
    pub transactions: Records<TransactionPayload>,
    #[serde(default)]
    pub summary: Option<SummaryPayload>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformancePayload {
    #[serde(default)]
    pub total_return: Decimal,
    #[serde(default)]
    pub annualized_return: Decimal,
    #[serde(default)]
    pub volatility: Decimal,
    #[serde(default)]
    pub sharpe_ratio: Decimal,
    #[serde(default)]
    pub beta: Decimal,
    #[serde(default)]
    pub alpha: Decimal,
    #[serde(default)]
    pub max_drawdown: Decimal,
    #[serde(default)]
    pub var95: Decimal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AllocationPayload {
    pub sector: String,
    #[serde(default)]
    pub percentage: Decimal,
    #[serde(default)]
    pub performance: Decimal,
    #[serde(default)]
    pub risk: Decimal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorrelationPayload {
    pub asset1: String,
    pub asset2: String,
    #[serde(default)]
    pub correlation: Decimal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RiskMetricPayload {
    pub metric: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub value: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResult {
    #[serde(default)]
    pub performance: Option<PerformancePayload>,
    #[serde(default)]
    pub allocation: Records<AllocationPayload>,
    #[serde(default)]
    pub correlation: Records<CorrelationPayload>,
    #[serde(default)]
    pub risk_metrics: Records<RiskMetricPayload>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertUpdatePayload {
    pub id: i64,
    #[serde(default)]
    pub current_value: Option<Decimal>,
    #[serde(default)]
    pub triggered: bool,
    #[serde(default)]
    pub triggered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AlertsResult {
    #[serde(default)]
    pub alerts: Records<AlertUpdatePayload>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WatchlistResult {
    #[serde(default)]
    pub stocks: Records<StockPayload>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHitPayload {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub change: Decimal,
    #[serde(default)]
    pub change_percent: Decimal,
    #[serde(default)]
    pub sector: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub market_cap: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularPayload {
    #[serde(flatten)]
    pub stock: SearchHitPayload,
    #[serde(default)]
    pub popularity_score: Decimal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingPayload {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub change: Decimal,
    #[serde(default)]
    pub change_percent: Decimal,
    #[serde(default, deserialize_with = "string_or_number")]
    pub volume: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub trend_score: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchResult {
    #[serde(default)]
    pub results: Records<SearchHitPayload>,
    #[serde(default)]
    pub popular: Records<PopularPayload>,
    #[serde(default)]
    pub trending: Records<TrendingPayload>,
}

/// Partial settings: absent fields keep their stored (or default) value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SettingsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSettingsPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotificationSettingsPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiSettingsPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecuritySettingsPatch>,
}

impl SettingsPayload {
    pub fn is_empty(&self) -> bool {
        self.user.is_none()
            && self.notifications.is_none()
            && self.api.is_none()
            && self.security.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettingsPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub timezone: Option<String>,
    pub currency: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettingsPatch {
    pub email_alerts: Option<bool>,
    pub push_notifications: Option<bool>,
    pub sms_alerts: Option<bool>,
    pub price_alerts: Option<bool>,
    pub news_alerts: Option<bool>,
    pub portfolio_updates: Option<bool>,
    pub market_open: Option<bool>,
    pub market_close: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSettingsPatch {
    pub webhook_url: Option<String>,
    pub api_key: Option<String>,
    pub rate_limit_enabled: Option<bool>,
    pub max_requests_per_minute: Option<i32>,
    pub enable_logging: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySettingsPatch {
    pub two_factor_enabled: Option<bool>,
    pub session_timeout: Option<i32>,
    pub login_notifications: Option<bool>,
    pub device_tracking: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SettingsResult {
    #[serde(default)]
    pub settings: Option<SettingsPayload>,
}
