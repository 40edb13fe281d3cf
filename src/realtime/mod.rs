//! Row-level change notifications.
//!
//! The persistence layer publishes a [`ChangeEvent`] for every effective
//! write into the in-process [`Changefeed`]; each `/realtime/{table}`
//! WebSocket forwards the events for its table to one client channel.

use std::fmt;
use std::str::FromStr;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Every table the dashboard reads or the relays write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Stocks,
    Predictions,
    ModelPerformance,
    PortfolioHoldings,
    PortfolioTransactions,
    PortfolioSummary,
    SectorAllocation,
    AssetCorrelations,
    PortfolioPerformance,
    UserAlerts,
    AlertSettings,
    UserWatchlist,
    UserSettings,
    NotificationSettings,
    ApiSettings,
    SecuritySettings,
    UserNotifications,
    TriggerLogs,
    PopularStocks,
    TrendingStocks,
}

impl Table {
    pub const ALL: [Table; 20] = [
        Table::Stocks,
        Table::Predictions,
        Table::ModelPerformance,
        Table::PortfolioHoldings,
        Table::PortfolioTransactions,
        Table::PortfolioSummary,
        Table::SectorAllocation,
        Table::AssetCorrelations,
        Table::PortfolioPerformance,
        Table::UserAlerts,
        Table::AlertSettings,
        Table::UserWatchlist,
        Table::UserSettings,
        Table::NotificationSettings,
        Table::ApiSettings,
        Table::SecuritySettings,
        Table::UserNotifications,
        Table::TriggerLogs,
        Table::PopularStocks,
        Table::TrendingStocks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Stocks => "stocks",
            Table::Predictions => "predictions",
            Table::ModelPerformance => "model_performance",
            Table::PortfolioHoldings => "portfolio_holdings",
            Table::PortfolioTransactions => "portfolio_transactions",
            Table::PortfolioSummary => "portfolio_summary",
            Table::SectorAllocation => "sector_allocation",
            Table::AssetCorrelations => "asset_correlations",
            Table::PortfolioPerformance => "portfolio_performance",
            Table::UserAlerts => "user_alerts",
            Table::AlertSettings => "alert_settings",
            Table::UserWatchlist => "user_watchlist",
            Table::UserSettings => "user_settings",
            Table::NotificationSettings => "notification_settings",
            Table::ApiSettings => "api_settings",
            Table::SecuritySettings => "security_settings",
            Table::UserNotifications => "user_notifications",
            Table::TriggerLogs => "trigger_logs",
            Table::PopularStocks => "popular_stocks",
            Table::TrendingStocks => "trending_stocks",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown table: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Wire message on a realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub event: ChangeKind,
}

/// Fan-out of change events to every open realtime channel.
#[derive(Debug, Clone)]
pub struct Changefeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Changefeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish one change. Having no listener is not an error.
    pub fn publish(&self, table: Table, event: ChangeKind) {
        counter!("change_events_total", "table" => table.as_str()).increment(1);
        let _ = self.tx.send(ChangeEvent { table, event });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_round_trip() {
        for table in Table::ALL {
            assert_eq!(table.as_str().parse::<Table>(), Ok(table));
        }
        assert!("pg_catalog".parse::<Table>().is_err());
    }

    #[test]
    fn test_change_event_wire_format() {
        let event = ChangeEvent {
            table: Table::PortfolioHoldings,
            event: ChangeKind::Delete,
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["table"], "portfolio_holdings");
        assert_eq!(json["event"], "DELETE");
    }

    #[tokio::test]
    async fn test_changefeed_delivers_to_subscribers() {
        let feed = Changefeed::new(8);
        let mut rx = feed.subscribe();
        feed.publish(Table::Stocks, ChangeKind::Update);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.table, Table::Stocks);
        assert_eq!(event.event, ChangeKind::Update);
    }

    #[test]
    fn test_publish_without_listeners_is_silent() {
        let feed = Changefeed::new(4);
        feed.publish(Table::TriggerLogs, ChangeKind::Insert);
    }
}
