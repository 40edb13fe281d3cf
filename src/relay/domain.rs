use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::realtime::Table;

/// One relay endpoint per dashboard domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerDomain {
    Dashboard,
    Portfolio,
    Predictions,
    Alerts,
    Watchlist,
    Search,
    Settings,
    Analytics,
    Notification,
}

impl TriggerDomain {
    pub const ALL: [TriggerDomain; 9] = [
        TriggerDomain::Dashboard,
        TriggerDomain::Portfolio,
        TriggerDomain::Predictions,
        TriggerDomain::Alerts,
        TriggerDomain::Watchlist,
        TriggerDomain::Search,
        TriggerDomain::Settings,
        TriggerDomain::Analytics,
        TriggerDomain::Notification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerDomain::Dashboard => "dashboard",
            TriggerDomain::Portfolio => "portfolio",
            TriggerDomain::Predictions => "predictions",
            TriggerDomain::Alerts => "alerts",
            TriggerDomain::Watchlist => "watchlist",
            TriggerDomain::Search => "search",
            TriggerDomain::Settings => "settings",
            TriggerDomain::Analytics => "analytics",
            TriggerDomain::Notification => "notification",
        }
    }

    /// Tables the relay writes to, in persistence order.
    pub fn tables(&self) -> &'static [Table] {
        match self {
            TriggerDomain::Dashboard | TriggerDomain::Watchlist => {
                &[Table::Stocks, Table::Predictions]
            }
            TriggerDomain::Portfolio => &[
                Table::PortfolioHoldings,
                Table::PortfolioTransactions,
                Table::PortfolioSummary,
            ],
            TriggerDomain::Predictions => &[Table::Predictions, Table::ModelPerformance],
            TriggerDomain::Alerts => &[Table::UserAlerts],
            TriggerDomain::Search => &[Table::PopularStocks, Table::TrendingStocks],
            TriggerDomain::Settings => &[
                Table::UserSettings,
                Table::NotificationSettings,
                Table::ApiSettings,
                Table::SecuritySettings,
            ],
            TriggerDomain::Analytics => &[
                Table::PortfolioPerformance,
                Table::SectorAllocation,
                Table::AssetCorrelations,
            ],
            TriggerDomain::Notification => &[Table::UserNotifications],
        }
    }

    /// Path segment under `/functions/`.
    pub fn function_name(&self) -> &'static str {
        match self {
            TriggerDomain::Dashboard => "dashboard-trigger",
            TriggerDomain::Portfolio => "portfolio-trigger",
            TriggerDomain::Predictions => "predictions-trigger",
            TriggerDomain::Alerts => "alerts-trigger",
            TriggerDomain::Watchlist => "watchlist-trigger",
            TriggerDomain::Search => "search-trigger",
            TriggerDomain::Settings => "settings-trigger",
            TriggerDomain::Analytics => "analytics-trigger",
            TriggerDomain::Notification => "notification-trigger",
        }
    }

    pub fn from_function_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.function_name() == name)
    }

    /// Environment variable holding the external webhook URL.
    pub fn env_var(&self) -> &'static str {
        match self {
            TriggerDomain::Dashboard => "N8N_WEBHOOK_URL",
            TriggerDomain::Portfolio => "N8N_PORTFOLIO_WEBHOOK_URL",
            TriggerDomain::Predictions => "N8N_PREDICTIONS_WEBHOOK_URL",
            TriggerDomain::Alerts => "N8N_ALERTS_WEBHOOK_URL",
            TriggerDomain::Watchlist => "N8N_WATCHLIST_WEBHOOK_URL",
            TriggerDomain::Search => "N8N_SEARCH_WEBHOOK_URL",
            TriggerDomain::Settings => "N8N_SETTINGS_WEBHOOK_URL",
            TriggerDomain::Analytics => "N8N_ANALYTICS_WEBHOOK_URL",
            TriggerDomain::Notification => "N8N_NOTIFICATION_WEBHOOK_URL",
        }
    }

    /// `trigger` tag added to the forwarded payload.
    pub fn trigger_tag(&self) -> &'static str {
        match self {
            TriggerDomain::Dashboard => "dashboardtrigger",
            TriggerDomain::Predictions => "prediction-trigger",
            _ => self.function_name(),
        }
    }

    /// Prefix of the relay error message when the webhook rejects a call.
    pub fn webhook_label(&self) -> String {
        match self {
            TriggerDomain::Dashboard => "N8N".into(),
            other => format!("N8N {}", other.as_str()),
        }
    }

    pub fn success_message(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        let title = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        format!("{title} trigger executed successfully")
    }
}

impl fmt::Display for TriggerDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("unknown trigger domain: {s}"))
    }
}
