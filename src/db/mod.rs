pub mod alert_repo;
pub mod analytics_repo;
pub mod notification_repo;
pub mod portfolio_repo;
pub mod prediction_repo;
pub mod settings_repo;
pub mod stock_repo;
pub mod trigger_log_repo;
pub mod watchlist_repo;

use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::realtime::{ChangeKind, Table};

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Result of a keyed upsert. Writing identical values is `Unchanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Updated,
    Unchanged,
}

impl WriteOutcome {
    /// Map the `RETURNING (xmax = 0)` flag of an upsert; no row means the
    /// `WHERE ... IS DISTINCT FROM` guard skipped the update.
    pub(crate) fn from_returning(row: Option<(bool,)>) -> Self {
        match row {
            Some((true,)) => WriteOutcome::Inserted,
            Some((false,)) => WriteOutcome::Updated,
            None => WriteOutcome::Unchanged,
        }
    }

    pub fn change_kind(&self) -> Option<ChangeKind> {
        match self {
            WriteOutcome::Inserted => Some(ChangeKind::Insert),
            WriteOutcome::Updated => Some(ChangeKind::Update),
            WriteOutcome::Unchanged => None,
        }
    }
}

/// Rows removed and added by a scoped delete-then-insert replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub deleted: u64,
    pub inserted: u64,
}

/// Row filter for the read API. `None` fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct ReadScope {
    pub user_id: Option<String>,
    pub portfolio_id: Option<String>,
    pub limit: Option<i64>,
}

impl ReadScope {
    /// Limit bound for SQL; `NULL` means no limit.
    pub(crate) fn sql_limit(&self) -> Option<i64> {
        self.limit.filter(|l| *l > 0)
    }
}

fn to_values<T: Serialize>(rows: Vec<T>) -> anyhow::Result<Vec<Value>> {
    rows.into_iter()
        .map(|row| serde_json::to_value(row).map_err(anyhow::Error::from))
        .collect()
}

/// Read any table as JSON rows, in that table's fixed order. Tables without
/// an owner column ignore `scope.user_id`.
pub async fn read_rows(pool: &PgPool, table: Table, scope: &ReadScope) -> anyhow::Result<Vec<Value>> {
    match table {
        Table::Stocks => to_values(stock_repo::list_stocks(pool, scope).await?),
        Table::PopularStocks => to_values(stock_repo::list_popular(pool, scope).await?),
        Table::TrendingStocks => to_values(stock_repo::list_trending(pool, scope).await?),
        Table::Predictions => to_values(prediction_repo::list_predictions(pool, scope).await?),
        Table::ModelPerformance => {
            to_values(prediction_repo::list_model_performance(pool, scope).await?)
        }
        Table::PortfolioHoldings => to_values(portfolio_repo::list_holdings(pool, scope).await?),
        Table::PortfolioTransactions => {
            to_values(portfolio_repo::list_transactions(pool, scope).await?)
        }
        Table::PortfolioSummary => to_values(portfolio_repo::list_summaries(pool, scope).await?),
        Table::PortfolioPerformance => {
            to_values(analytics_repo::list_performance(pool, scope).await?)
        }
        Table::SectorAllocation => {
            to_values(analytics_repo::list_sector_allocation(pool, scope).await?)
        }
        Table::AssetCorrelations => to_values(analytics_repo::list_correlations(pool, scope).await?),
        Table::UserAlerts => to_values(alert_repo::list_alerts(pool, scope).await?),
        Table::AlertSettings => to_values(alert_repo::list_alert_settings(pool, scope).await?),
        Table::UserWatchlist => to_values(watchlist_repo::list_watchlist(pool, scope).await?),
        Table::UserSettings => to_values(settings_repo::list_user_settings(pool, scope).await?),
        Table::NotificationSettings => {
            to_values(settings_repo::list_notification_settings(pool, scope).await?)
        }
        Table::ApiSettings => to_values(settings_repo::list_api_settings(pool, scope).await?),
        Table::SecuritySettings => {
            to_values(settings_repo::list_security_settings(pool, scope).await?)
        }
        Table::UserNotifications => {
            to_values(notification_repo::list_notifications(pool, scope).await?)
        }
        Table::TriggerLogs => to_values(trigger_log_repo::list_trigger_logs(pool, scope).await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_outcome_from_returning() {
        assert_eq!(WriteOutcome::from_returning(Some((true,))), WriteOutcome::Inserted);
        assert_eq!(WriteOutcome::from_returning(Some((false,))), WriteOutcome::Updated);
        assert_eq!(WriteOutcome::from_returning(None), WriteOutcome::Unchanged);
        assert_eq!(WriteOutcome::Unchanged.change_kind(), None);
    }

    #[test]
    fn test_read_scope_ignores_non_positive_limit() {
        let scope = ReadScope {
            limit: Some(0),
            ..ReadScope::default()
        };
        assert_eq!(scope.sql_limit(), None);
        assert_eq!(ReadScope { limit: Some(10), ..scope }.sql_limit(), Some(10));
    }
}
