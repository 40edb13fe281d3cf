use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database row for the predictions table. One row per symbol; the latest
/// trigger supersedes the previous call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Prediction {
    pub symbol: String,
    /// BUY, SELL or HOLD.
    pub direction: String,
    /// 0..=100
    pub confidence: Decimal,
    pub target_price: Decimal,
    pub timeframe: String,
    pub model: Option<String>,
    pub factors: Vec<String>,
    pub accuracy: Option<Decimal>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ModelPerformance {
    pub model_name: String,
    pub accuracy: Decimal,
    pub total_predictions: i32,
    pub last_updated: Option<DateTime<Utc>>,
}
