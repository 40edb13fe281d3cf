use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// `user_watchlist` row joined with the matching `stocks` snapshot, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WatchlistRow {
    pub user_id: String,
    pub symbol: String,
    pub added_at: DateTime<Utc>,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub change: Option<Decimal>,
    pub change_percent: Option<Decimal>,
    pub volume: Option<String>,
    pub market_cap: Option<String>,
}
