use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A position in a user's portfolio. The whole set for a (user, portfolio)
/// pair is replaced on every portfolio trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PortfolioHolding {
    pub id: Uuid,
    pub user_id: String,
    pub portfolio_id: String,
    pub symbol: String,
    pub name: String,
    pub shares: Decimal,
    pub avg_price: Decimal,
    pub current_price: Decimal,
    pub value: Decimal,
    pub gain_loss: Decimal,
    pub gain_loss_percent: Decimal,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PortfolioTransaction {
    pub id: i64,
    pub user_id: String,
    pub portfolio_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub symbol: String,
    pub shares: Decimal,
    pub price: Decimal,
    pub date: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PortfolioSummary {
    pub user_id: String,
    pub portfolio_id: String,
    pub total_value: Decimal,
    pub total_cost: Decimal,
    pub total_gain_loss: Decimal,
    pub total_gain_loss_percent: Decimal,
    pub day_change: Decimal,
    pub day_change_percent: Decimal,
    pub updated_at: Option<DateTime<Utc>>,
}
