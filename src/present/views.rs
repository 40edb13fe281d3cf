//! View models handed to the dashboard surfaces. Built from synced rows;
//! nothing here touches the network or storage.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};
use rust_decimal::Decimal;

use super::format::{self, Trend};
use crate::models::{Direction, Prediction, Stock, WatchlistRow};

#[derive(Debug, Clone, PartialEq)]
pub struct StockRow {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
}

impl StockRow {
    pub fn trend(&self) -> Trend {
        Trend::of_change(self.change)
    }

    /// `$875.32  +5.07%`
    pub fn price_line(&self) -> String {
        format!(
            "{}  {}",
            format::price(self.price),
            format::signed_percent(self.change_percent)
        )
    }
}

impl From<&Stock> for StockRow {
    fn from(s: &Stock) -> Self {
        Self {
            symbol: s.symbol.clone(),
            name: s.name.clone(),
            price: s.price,
            change: s.change,
            change_percent: s.change_percent,
        }
    }
}

impl From<&WatchlistRow> for StockRow {
    /// Symbols without a market snapshot show as zero.
    fn from(w: &WatchlistRow) -> Self {
        Self {
            symbol: w.symbol.clone(),
            name: w.name.clone().unwrap_or_else(|| w.symbol.clone()),
            price: w.price.unwrap_or_default(),
            change: w.change.unwrap_or_default(),
            change_percent: w.change_percent.unwrap_or_default(),
        }
    }
}

fn by_percent_desc(a: &StockRow, b: &StockRow) -> Ordering {
    b.change_percent
        .cmp(&a.change_percent)
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Rising stocks, biggest percentage move first.
pub fn top_gainers(rows: &[StockRow], n: usize) -> Vec<StockRow> {
    let mut gainers: Vec<StockRow> = rows
        .iter()
        .filter(|r| r.change_percent > Decimal::ZERO)
        .cloned()
        .collect();
    gainers.sort_by(by_percent_desc);
    gainers.truncate(n);
    gainers
}

/// Falling stocks, biggest percentage drop first.
pub fn top_losers(rows: &[StockRow], n: usize) -> Vec<StockRow> {
    let mut losers: Vec<StockRow> = rows
        .iter()
        .filter(|r| r.change_percent < Decimal::ZERO)
        .cloned()
        .collect();
    losers.sort_by(|a, b| by_percent_desc(b, a));
    losers.truncate(n);
    losers
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionView {
    pub symbol: String,
    pub direction: Direction,
    /// 0..=100
    pub confidence: Decimal,
    pub target_price: Decimal,
    pub current_price: Decimal,
}

impl PredictionView {
    /// `(target - current) / current * 100`; `None` without a current price.
    pub fn potential_gain(&self) -> Option<Decimal> {
        if self.current_price.is_zero() {
            return None;
        }
        Some((self.target_price - self.current_price) / self.current_price * Decimal::ONE_HUNDRED)
    }

    pub fn potential_label(&self) -> String {
        match self.potential_gain() {
            Some(gain) => format::signed_percent(gain),
            None => "n/a".into(),
        }
    }

    pub fn direction_class(&self) -> &'static str {
        match self.direction {
            Direction::Buy => "text-success",
            Direction::Sell => "text-destructive",
            Direction::Hold => "text-warning",
        }
    }
}

/// Pair stored predictions with the latest price of their symbol. Rows with
/// an unknown direction are skipped.
pub fn prediction_views(predictions: &[Prediction], stocks: &[Stock]) -> Vec<PredictionView> {
    let prices: HashMap<&str, Decimal> = stocks
        .iter()
        .map(|s| (s.symbol.as_str(), s.price))
        .collect();

    predictions
        .iter()
        .filter_map(|p| {
            Some(PredictionView {
                symbol: p.symbol.clone(),
                direction: Direction::from_api_str(&p.direction)?,
                confidence: p.confidence,
                target_price: p.target_price,
                current_price: prices.get(p.symbol.as_str()).copied().unwrap_or_default(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioMetrics {
    pub total_value: Decimal,
    pub daily_change: Decimal,
    pub daily_change_percent: Decimal,
    pub weekly_change: Decimal,
    pub weekly_change_percent: Decimal,
    pub total_gain: Decimal,
    pub total_gain_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub date: String,
    pub price: Decimal,
    pub prediction: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    pub time: String,
    pub source: String,
}

/// Badge of the live-data indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
    Updating,
    Live,
    Offline,
}

impl LiveStatus {
    /// Loading wins over connectivity.
    pub fn from_state(loading: bool, connected: bool) -> Self {
        match (loading, connected) {
            (true, _) => LiveStatus::Updating,
            (false, true) => LiveStatus::Live,
            (false, false) => LiveStatus::Offline,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LiveStatus::Updating => "Updating...",
            LiveStatus::Live => "Live",
            LiveStatus::Offline => "Offline",
        }
    }
}

/// `Live 14:02:11`, local time of the last update.
pub fn live_indicator(status: LiveStatus, last_updated: Option<DateTime<Utc>>) -> String {
    match last_updated {
        Some(at) => format!(
            "{} {}",
            status.label(),
            at.with_timezone(&Local).format("%H:%M:%S")
        ),
        None => status.label().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn row(symbol: &str, pct: &str) -> StockRow {
        StockRow {
            symbol: symbol.into(),
            name: symbol.into(),
            price: d("100"),
            change: d(pct),
            change_percent: d(pct),
        }
    }

    #[test]
    fn test_gainers_and_losers_ordering() {
        let rows = vec![
            row("NVDA", "5.07"),
            row("META", "-5.26"),
            row("TSLA", "8.16"),
            row("FLAT", "0"),
            row("INTC", "-3.27"),
        ];

        let gainers: Vec<_> = top_gainers(&rows, 5).into_iter().map(|r| r.symbol).collect();
        assert_eq!(gainers, vec!["TSLA", "NVDA"]);

        let losers: Vec<_> = top_losers(&rows, 1).into_iter().map(|r| r.symbol).collect();
        assert_eq!(losers, vec!["META"]);
    }

    #[test]
    fn test_potential_gain() {
        let view = PredictionView {
            symbol: "TSLA".into(),
            direction: Direction::Sell,
            confidence: d("68"),
            target_price: d("235.00"),
            current_price: d("250.00"),
        };
        assert_eq!(view.potential_gain(), Some(d("-6")));
        assert_eq!(view.potential_label(), "-6.00%");

        let unpriced = PredictionView {
            current_price: Decimal::ZERO,
            ..view
        };
        assert_eq!(unpriced.potential_gain(), None);
    }

    #[test]
    fn test_prediction_views_join_prices() {
        let stock = Stock {
            symbol: "AAPL".into(),
            name: "Apple Inc.".into(),
            price: d("189.95"),
            change: d("-7.85"),
            change_percent: d("-3.97"),
            volume: "45.2M".into(),
            market_cap: "2.8T".into(),
            sector: "Technology".into(),
            updated_at: None,
        };
        let prediction = Prediction {
            symbol: "AAPL".into(),
            direction: "BUY".into(),
            confidence: d("85"),
            target_price: d("195.50"),
            timeframe: "1w".into(),
            model: None,
            factors: vec![],
            accuracy: None,
            created_at: None,
            updated_at: None,
        };
        let bogus = Prediction {
            direction: "MAYBE".into(),
            ..prediction.clone()
        };

        let views = prediction_views(&[prediction, bogus], &[stock]);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].current_price, d("189.95"));
        assert_eq!(views[0].direction_class(), "text-success");
    }

    #[test]
    fn test_live_status() {
        assert_eq!(LiveStatus::from_state(true, false), LiveStatus::Updating);
        assert_eq!(LiveStatus::from_state(false, true), LiveStatus::Live);
        assert_eq!(LiveStatus::from_state(false, false).label(), "Offline");
        assert_eq!(live_indicator(LiveStatus::Live, None), "Live");
    }
}
