pub mod alert;
pub mod analytics;
pub mod market;
pub mod notification;
pub mod portfolio;
pub mod prediction;
pub mod settings;
pub mod trigger_log;
pub mod watchlist;

pub use alert::{AlertSettings, UserAlert};
pub use analytics::{AssetCorrelation, PortfolioPerformance, SectorAllocation};
pub use market::{PopularStock, Stock, TrendingStock};
pub use notification::UserNotification;
pub use portfolio::{PortfolioHolding, PortfolioSummary, PortfolioTransaction};
pub use prediction::{ModelPerformance, Prediction};
pub use settings::{ApiSettings, NotificationSettings, SecuritySettings, UserSettings};
pub use trigger_log::TriggerLog;
pub use watchlist::WatchlistRow;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity used when no user is signed in.
pub const ANONYMOUS_USER: &str = "anonymous";

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Some(Direction::Buy),
            "SELL" => Some(Direction::Sell),
            "HOLD" => Some(Direction::Hold),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
            Direction::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parsing_is_case_insensitive() {
        assert_eq!(Direction::from_api_str("buy"), Some(Direction::Buy));
        assert_eq!(Direction::from_api_str(" Hold "), Some(Direction::Hold));
        assert_eq!(Direction::from_api_str("STRONG_BUY"), None);
    }

    #[test]
    fn test_direction_serializes_uppercase() {
        let json = serde_json::to_string(&Direction::Sell).unwrap();
        assert_eq!(json, "\"SELL\"");
    }
}
