//! Static datasets shown until live data arrives, or when it never does.

use rust_decimal::Decimal;

use super::views::{ChartPoint, NewsItem, PortfolioMetrics, PredictionView, StockRow};
use crate::models::Direction;

/// Live data wins wholesale when present; the two are never merged.
pub fn prefer_live<T>(live: Option<Vec<T>>, fallback: impl FnOnce() -> Vec<T>) -> Vec<T> {
    match live {
        Some(rows) if !rows.is_empty() => rows,
        _ => fallback(),
    }
}

fn cents(v: i64) -> Decimal {
    Decimal::new(v, 2)
}

fn stock(symbol: &str, name: &str, price: i64, change: i64, pct: i64) -> StockRow {
    StockRow {
        symbol: symbol.into(),
        name: name.into(),
        price: cents(price),
        change: cents(change),
        change_percent: cents(pct),
    }
}

pub fn portfolio_metrics() -> PortfolioMetrics {
    PortfolioMetrics {
        total_value: cents(12_543_218),
        daily_change: cents(243_150),
        daily_change_percent: cents(197),
        weekly_change: cents(823_420),
        weekly_change_percent: cents(702),
        total_gain: cents(3_215_678),
        total_gain_percent: cents(3448),
    }
}

pub fn chart_series() -> Vec<ChartPoint> {
    const POINTS: [(i64, i64); 15] = [
        (15025, 14850),
        (15210, 15120),
        (14875, 14980),
        (15130, 15210),
        (15520, 15450),
        (15890, 15730),
        (15640, 15920),
        (16215, 16180),
        (16530, 16490),
        (16875, 16740),
        (17120, 17050),
        (16985, 17230),
        (17450, 17380),
        (17790, 17620),
        (18025, 17950),
    ];

    POINTS
        .iter()
        .enumerate()
        .map(|(i, &(price, prediction))| ChartPoint {
            date: format!("Jan {}", i + 1),
            price: cents(price),
            prediction: cents(prediction),
        })
        .collect()
}

pub fn top_gainers() -> Vec<StockRow> {
    vec![
        stock("NVDA", "NVIDIA Corporation", 87_532, 4_215, 507),
        stock("TSLA", "Tesla Inc", 24_850, 1_875, 816),
        stock("AMZN", "Amazon.com Inc", 17_825, 1_240, 748),
        stock("GOOGL", "Alphabet Inc", 14_580, 895, 654),
        stock("MSFT", "Microsoft Corporation", 42_815, 1_530, 370),
    ]
}

pub fn top_losers() -> Vec<StockRow> {
    vec![
        stock("META", "Meta Platforms Inc", 51_275, -2_845, -526),
        stock("NFLX", "Netflix Inc", 48_520, -2_230, -439),
        stock("AAPL", "Apple Inc", 18_995, -785, -397),
        stock("AMD", "Advanced Micro Devices", 13_840, -520, -362),
        stock("INTC", "Intel Corporation", 4_285, -145, -327),
    ]
}

pub fn watchlist() -> Vec<StockRow> {
    vec![
        stock("SPY", "SPDR S&P 500 ETF", 48_520, 215, 44),
        stock("QQQ", "Invesco QQQ Trust", 39_875, -180, -45),
        stock("VTI", "Vanguard Total Stock Market", 24_530, 125, 51),
        stock("BTC-USD", "Bitcoin USD", 6_784_025, 124_580, 187),
    ]
}

pub fn predictions() -> Vec<PredictionView> {
    let card = |symbol: &str, direction: Direction, confidence: i64, target: i64, current: i64| PredictionView {
        symbol: symbol.into(),
        direction,
        confidence: Decimal::from(confidence),
        target_price: cents(target),
        current_price: cents(current),
    };

    vec![
        card("AAPL", Direction::Buy, 85, 19_550, 18_995),
        card("GOOGL", Direction::Hold, 72, 14_820, 14_580),
        card("MSFT", Direction::Buy, 78, 44_500, 42_815),
        card("TSLA", Direction::Sell, 68, 23_500, 24_850),
        card("NVDA", Direction::Hold, 81, 89_000, 87_532),
    ]
}

pub fn market_news() -> Vec<NewsItem> {
    let item = |title: &str, summary: &str, time: &str, source: &str| NewsItem {
        title: title.into(),
        summary: summary.into(),
        time: time.into(),
        source: source.into(),
    };

    vec![
        item(
            "AI Stocks Rally as Tech Giants Report Strong Quarterly Earnings",
            "Major technology companies exceeded expectations in their latest earnings reports, driving significant gains in AI-related stocks.",
            "2 hours ago",
            "MarketWatch",
        ),
        item(
            "Federal Reserve Hints at Potential Interest Rate Cuts",
            "Recent statements from Fed officials suggest a more dovish approach to monetary policy in the coming months.",
            "4 hours ago",
            "Reuters",
        ),
        item(
            "Electric Vehicle Sales Surge Despite Market Volatility",
            "EV manufacturers report record sales figures, showing resilience in the face of broader market uncertainty.",
            "6 hours ago",
            "Bloomberg",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::present::format;

    #[test]
    fn test_live_rows_replace_fallback_wholesale() {
        let live = vec![stock("ONLY", "Only", 100, 1, 1)];
        let shown = prefer_live(Some(live.clone()), top_gainers);
        assert_eq!(shown, live);
    }

    #[test]
    fn test_empty_or_missing_live_uses_fallback() {
        assert_eq!(prefer_live(Some(Vec::new()), watchlist).len(), 4);
        assert_eq!(prefer_live(None, top_losers)[0].symbol, "META");
    }

    #[test]
    fn test_fallback_metrics_render() {
        let m = portfolio_metrics();
        assert_eq!(format::currency(m.total_value), "$125,432.18");
        assert_eq!(format::signed_currency(m.daily_change), "+$2,431.50");
        assert_eq!(format::signed_percent(m.total_gain_percent), "+34.48%");
    }

    #[test]
    fn test_chart_series_dates() {
        let series = chart_series();
        assert_eq!(series.len(), 15);
        assert_eq!(series[0].date, "Jan 1");
        assert_eq!(series[14].price, cents(18025));
    }
}
