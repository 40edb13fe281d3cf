use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Risk/return figures for one (user, portfolio, period).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PortfolioPerformance {
    pub user_id: String,
    pub portfolio_id: String,
    pub period: String,
    pub total_return: Decimal,
    pub annualized_return: Decimal,
    pub volatility: Decimal,
    pub sharpe_ratio: Decimal,
    pub beta: Decimal,
    pub alpha: Decimal,
    pub max_drawdown: Decimal,
    pub var_95: Decimal,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SectorAllocation {
    pub id: Uuid,
    pub user_id: String,
    pub portfolio_id: String,
    pub sector: String,
    pub percentage: Decimal,
    pub performance: Decimal,
    pub risk: Decimal,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AssetCorrelation {
    pub id: Uuid,
    pub user_id: String,
    pub portfolio_id: String,
    pub asset1: String,
    pub asset2: String,
    pub correlation: Decimal,
    pub created_at: Option<DateTime<Utc>>,
}
