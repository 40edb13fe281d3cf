//! The eight dashboard surfaces: what each triggers, reads and watches.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use super::backend::{select_as, select_latest_as, Backend, TableQuery};
use super::error::SyncError;
use super::hook::{SyncDomain, SyncHook};
use crate::models::{
    AlertSettings, ApiSettings, AssetCorrelation, ModelPerformance, NotificationSettings,
    PopularStock, PortfolioHolding, PortfolioPerformance, PortfolioSummary, PortfolioTransaction,
    Prediction, SectorAllocation, SecuritySettings, Stock, TrendingStock, UserAlert, UserSettings,
    WatchlistRow,
};
use crate::realtime::Table;
use crate::relay::payload::{
    PopularPayload, SearchHitPayload, SearchResult, SettingsPayload, TrendingPayload,
};
use crate::relay::TriggerDomain;

pub type DashboardHook = SyncHook<Dashboard>;
pub type PortfolioHook = SyncHook<Portfolio>;
pub type PredictionsHook = SyncHook<Predictions>;
pub type AlertsHook = SyncHook<Alerts>;
pub type WatchlistHook = SyncHook<Watchlist>;
pub type SearchHook = SyncHook<Search>;
pub type SettingsHook = SyncHook<Settings>;
pub type AnalyticsHook = SyncHook<Analytics>;

const DEFAULT_PORTFOLIO: &str = "default";
const RECENT_TRANSACTIONS: i64 = 10;
const POPULAR_LIMIT: i64 = 10;
const TRENDING_LIMIT: i64 = 10;
const SEARCH_LIMIT: u32 = 20;

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

pub struct Dashboard;

#[derive(Debug, Clone, Default)]
pub struct DashboardParams {
    /// `None` lets the relay use its default ticker list.
    pub symbols: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    pub stocks: Vec<Stock>,
    pub predictions: Vec<Prediction>,
}

#[async_trait]
impl SyncDomain for Dashboard {
    type Data = DashboardData;
    type Params = DashboardParams;

    const DOMAIN: TriggerDomain = TriggerDomain::Dashboard;
    const WATCHED: &'static [Table] = &[Table::Stocks, Table::Predictions];
    const AUTO_TRIGGER: bool = true;

    fn trigger_body(identity: &str, params: &DashboardParams) -> Value {
        json!({
            "userId": identity,
            "symbols": params.symbols,
            "triggerType": "dashboard",
        })
    }

    async fn fetch(
        backend: &dyn Backend,
        _identity: &str,
        _params: &DashboardParams,
    ) -> Result<DashboardData, SyncError> {
        Ok(DashboardData {
            stocks: select_as(backend, &TableQuery::new(Table::Stocks)).await?,
            predictions: select_as(backend, &TableQuery::new(Table::Predictions)).await?,
        })
    }
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

pub struct Portfolio;

#[derive(Debug, Clone)]
pub struct PortfolioParams {
    pub portfolio_id: String,
}

impl Default for PortfolioParams {
    fn default() -> Self {
        Self {
            portfolio_id: DEFAULT_PORTFOLIO.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioData {
    pub holdings: Vec<PortfolioHolding>,
    /// Most recent first, at most ten.
    pub transactions: Vec<PortfolioTransaction>,
    pub summary: Option<PortfolioSummary>,
}

#[async_trait]
impl SyncDomain for Portfolio {
    type Data = PortfolioData;
    type Params = PortfolioParams;

    const DOMAIN: TriggerDomain = TriggerDomain::Portfolio;
    const WATCHED: &'static [Table] = &[Table::PortfolioHoldings, Table::PortfolioTransactions];

    fn trigger_body(identity: &str, params: &PortfolioParams) -> Value {
        json!({
            "userId": identity,
            "portfolioId": params.portfolio_id,
            "includeTransactions": true,
            "includeAnalytics": true,
        })
    }

    async fn fetch(
        backend: &dyn Backend,
        identity: &str,
        params: &PortfolioParams,
    ) -> Result<PortfolioData, SyncError> {
        let scoped = |table| {
            TableQuery::new(table)
                .user(identity)
                .portfolio(params.portfolio_id.as_str())
        };

        Ok(PortfolioData {
            holdings: select_as(backend, &scoped(Table::PortfolioHoldings)).await?,
            transactions: select_as(
                backend,
                &scoped(Table::PortfolioTransactions).limit(RECENT_TRANSACTIONS),
            )
            .await?,
            summary: select_latest_as(backend, &scoped(Table::PortfolioSummary)).await?,
        })
    }
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

pub struct Predictions;

#[derive(Debug, Clone)]
pub struct PredictionsParams {
    pub symbols: Option<Vec<String>>,
    pub timeframe: String,
}

impl Default for PredictionsParams {
    fn default() -> Self {
        Self {
            symbols: None,
            timeframe: "1w".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionsData {
    pub predictions: Vec<Prediction>,
    pub model_performance: Vec<ModelPerformance>,
}

#[async_trait]
impl SyncDomain for Predictions {
    type Data = PredictionsData;
    type Params = PredictionsParams;

    const DOMAIN: TriggerDomain = TriggerDomain::Predictions;
    const WATCHED: &'static [Table] = &[Table::Predictions, Table::ModelPerformance];

    fn trigger_body(identity: &str, params: &PredictionsParams) -> Value {
        json!({
            "userId": identity,
            "symbols": params.symbols,
            "timeframe": params.timeframe,
        })
    }

    async fn fetch(
        backend: &dyn Backend,
        _identity: &str,
        _params: &PredictionsParams,
    ) -> Result<PredictionsData, SyncError> {
        Ok(PredictionsData {
            predictions: select_as(backend, &TableQuery::new(Table::Predictions)).await?,
            model_performance: select_as(backend, &TableQuery::new(Table::ModelPerformance))
                .await?,
        })
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

pub struct Alerts;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertsData {
    pub alerts: Vec<UserAlert>,
    pub settings: Option<AlertSettings>,
}

impl AlertsData {
    pub fn triggered(&self) -> impl Iterator<Item = &UserAlert> {
        self.alerts.iter().filter(|a| a.triggered)
    }
}

#[async_trait]
impl SyncDomain for Alerts {
    type Data = AlertsData;
    type Params = ();

    const DOMAIN: TriggerDomain = TriggerDomain::Alerts;
    const WATCHED: &'static [Table] = &[Table::UserAlerts];

    fn trigger_body(identity: &str, _params: &()) -> Value {
        json!({
            "userId": identity,
            "checkTriggers": true,
            "updatePrices": true,
        })
    }

    async fn fetch(backend: &dyn Backend, identity: &str, _params: &()) -> Result<AlertsData, SyncError> {
        Ok(AlertsData {
            alerts: select_as(backend, &TableQuery::new(Table::UserAlerts).user(identity)).await?,
            settings: select_latest_as(backend, &TableQuery::new(Table::AlertSettings).user(identity))
                .await?,
        })
    }
}

// ---------------------------------------------------------------------------
// Watchlist
// ---------------------------------------------------------------------------

pub struct Watchlist;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchlistData {
    /// Newest addition first.
    pub items: Vec<WatchlistRow>,
}

#[async_trait]
impl SyncDomain for Watchlist {
    type Data = WatchlistData;
    type Params = ();

    const DOMAIN: TriggerDomain = TriggerDomain::Watchlist;
    const WATCHED: &'static [Table] = &[Table::UserWatchlist, Table::Stocks];

    fn trigger_body(identity: &str, _params: &()) -> Value {
        json!({
            "userId": identity,
            "updatePrices": true,
            "includeMetrics": true,
        })
    }

    async fn fetch(
        backend: &dyn Backend,
        identity: &str,
        _params: &(),
    ) -> Result<WatchlistData, SyncError> {
        Ok(WatchlistData {
            items: select_as(backend, &TableQuery::new(Table::UserWatchlist).user(identity)).await?,
        })
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

pub struct Search;

#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub query: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchData {
    pub results: Vec<SearchHit>,
    pub popular: Vec<PopularStock>,
    pub trending: Vec<TrendingStock>,
}

/// One hit of a free-text search. Hits are never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub sector: String,
    pub market_cap: String,
}

impl From<SearchHitPayload> for SearchHit {
    fn from(p: SearchHitPayload) -> Self {
        Self {
            symbol: p.symbol,
            name: p.name,
            price: p.price,
            change: p.change,
            change_percent: p.change_percent,
            sector: p.sector,
            market_cap: p.market_cap,
        }
    }
}

impl From<PopularPayload> for PopularStock {
    fn from(p: PopularPayload) -> Self {
        Self {
            symbol: p.stock.symbol,
            name: p.stock.name,
            price: p.stock.price,
            change: p.stock.change,
            change_percent: p.stock.change_percent,
            sector: p.stock.sector,
            market_cap: p.stock.market_cap,
            popularity_score: p.popularity_score,
            updated_at: None,
        }
    }
}

impl From<TrendingPayload> for TrendingStock {
    fn from(p: TrendingPayload) -> Self {
        Self {
            symbol: p.symbol,
            name: p.name,
            price: p.price,
            change: p.change,
            change_percent: p.change_percent,
            volume: p.volume,
            reason: p.reason,
            trend_score: p.trend_score,
            updated_at: None,
        }
    }
}

#[async_trait]
impl SyncDomain for Search {
    type Data = SearchData;
    type Params = SearchParams;

    const DOMAIN: TriggerDomain = TriggerDomain::Search;
    const WATCHED: &'static [Table] = &[Table::PopularStocks, Table::TrendingStocks];

    fn trigger_body(identity: &str, params: &SearchParams) -> Value {
        json!({
            "userId": identity,
            "query": params.query,
            "limit": SEARCH_LIMIT,
            "includePopular": true,
            "includeTrending": true,
        })
    }

    /// Popular and trending only; search results come from triggers.
    async fn fetch(
        backend: &dyn Backend,
        _identity: &str,
        _params: &SearchParams,
    ) -> Result<SearchData, SyncError> {
        Ok(SearchData {
            results: Vec::new(),
            popular: select_as(backend, &TableQuery::new(Table::PopularStocks).limit(POPULAR_LIMIT))
                .await?,
            trending: select_as(
                backend,
                &TableQuery::new(Table::TrendingStocks).limit(TRENDING_LIMIT),
            )
            .await?,
        })
    }

    fn merge_fetched(previous: Option<&SearchData>, fetched: SearchData) -> SearchData {
        SearchData {
            results: previous.map(|p| p.results.clone()).unwrap_or_default(),
            ..fetched
        }
    }

    fn from_trigger_response(response: &Value) -> Option<Result<SearchData, SyncError>> {
        let parsed = serde_json::from_value::<SearchResult>(response.clone())
            .map(|r| SearchData {
                results: r.results.into_iter().map(SearchHit::from).collect(),
                popular: r.popular.into_iter().map(PopularStock::from).collect(),
                trending: r.trending.into_iter().map(TrendingStock::from).collect(),
            })
            .map_err(SyncError::from);
        Some(parsed)
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub struct Settings;

#[derive(Debug, Clone, Default)]
pub struct SettingsParams {
    /// A patch turns the trigger into an update; `None` just refreshes.
    pub patch: Option<SettingsPayload>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsData {
    pub user: UserSettings,
    pub notifications: NotificationSettings,
    pub api: ApiSettings,
    pub security: SecuritySettings,
}

impl SettingsData {
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user: UserSettings::defaults_for(user_id),
            notifications: NotificationSettings::defaults_for(user_id),
            api: ApiSettings::defaults_for(user_id),
            security: SecuritySettings::defaults_for(user_id),
        }
    }
}

#[async_trait]
impl SyncDomain for Settings {
    type Data = SettingsData;
    type Params = SettingsParams;

    const DOMAIN: TriggerDomain = TriggerDomain::Settings;
    const WATCHED: &'static [Table] = &[Table::UserSettings];

    fn trigger_body(identity: &str, params: &SettingsParams) -> Value {
        let patch = params.patch.as_ref().filter(|p| !p.is_empty());
        let action = if patch.is_some() { "update" } else { "fetch" };
        json!({
            "userId": identity,
            "settings": patch,
            "action": action,
        })
    }

    /// A patch is applied once; later triggers only fetch.
    fn after_trigger(params: &mut SettingsParams) {
        params.patch = None;
    }

    async fn fetch(
        backend: &dyn Backend,
        identity: &str,
        _params: &SettingsParams,
    ) -> Result<SettingsData, SyncError> {
        let q = |table| TableQuery::new(table).user(identity);

        Ok(SettingsData {
            user: select_latest_as(backend, &q(Table::UserSettings))
                .await?
                .unwrap_or_else(|| UserSettings::defaults_for(identity)),
            notifications: select_latest_as(backend, &q(Table::NotificationSettings))
                .await?
                .unwrap_or_else(|| NotificationSettings::defaults_for(identity)),
            api: select_latest_as(backend, &q(Table::ApiSettings))
                .await?
                .unwrap_or_else(|| ApiSettings::defaults_for(identity)),
            security: select_latest_as(backend, &q(Table::SecuritySettings))
                .await?
                .unwrap_or_else(|| SecuritySettings::defaults_for(identity)),
        })
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

pub struct Analytics;

#[derive(Debug, Clone)]
pub struct AnalyticsParams {
    pub portfolio_id: String,
    /// 1m, 3m, 6m, 1y, ...
    pub period: String,
}

impl Default for AnalyticsParams {
    fn default() -> Self {
        Self {
            portfolio_id: DEFAULT_PORTFOLIO.into(),
            period: "6m".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsData {
    pub performance: Option<PortfolioPerformance>,
    pub allocation: Vec<SectorAllocation>,
    pub correlations: Vec<AssetCorrelation>,
}

#[async_trait]
impl SyncDomain for Analytics {
    type Data = AnalyticsData;
    type Params = AnalyticsParams;

    const DOMAIN: TriggerDomain = TriggerDomain::Analytics;
    const WATCHED: &'static [Table] = &[
        Table::PortfolioPerformance,
        Table::SectorAllocation,
        Table::AssetCorrelations,
    ];

    fn trigger_body(identity: &str, params: &AnalyticsParams) -> Value {
        json!({
            "userId": identity,
            "portfolioId": params.portfolio_id,
            "period": params.period,
            "includeRisk": true,
        })
    }

    async fn fetch(
        backend: &dyn Backend,
        identity: &str,
        params: &AnalyticsParams,
    ) -> Result<AnalyticsData, SyncError> {
        let scoped = |table| {
            TableQuery::new(table)
                .user(identity)
                .portfolio(params.portfolio_id.as_str())
        };

        Ok(AnalyticsData {
            performance: select_latest_as(backend, &scoped(Table::PortfolioPerformance)).await?,
            allocation: select_as(backend, &scoped(Table::SectorAllocation)).await?,
            correlations: select_as(backend, &scoped(Table::AssetCorrelations)).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::payload::{
        AnalyticsRequest, DashboardRequest, PortfolioRequest, SearchRequest, SettingsRequest,
        UserSettingsPatch,
    };

    #[test]
    fn test_trigger_bodies_parse_as_relay_requests() {
        let body = Dashboard::trigger_body("u1", &DashboardParams::default());
        let req: DashboardRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.user_id, "u1");
        assert!(req.symbols.is_none());

        let body = Portfolio::trigger_body("u1", &PortfolioParams::default());
        let req: PortfolioRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.portfolio_id, "default");

        let body = Analytics::trigger_body("u1", &AnalyticsParams::default());
        let req: AnalyticsRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.period, "6m");

        let body = Search::trigger_body("u1", &SearchParams { query: "apple".into() });
        let req: SearchRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.query, "apple");
        assert_eq!(req.limit, 20);
    }

    #[test]
    fn test_settings_action_follows_patch() {
        let body = Settings::trigger_body("u1", &SettingsParams::default());
        let req: SettingsRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.action, "fetch");
        assert!(req.settings.is_none());

        let patch = SettingsPayload {
            user: Some(UserSettingsPatch {
                timezone: Some("Europe/Paris".into()),
                ..UserSettingsPatch::default()
            }),
            ..SettingsPayload::default()
        };
        let body = Settings::trigger_body("u1", &SettingsParams { patch: Some(patch.clone()) });
        let req: SettingsRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.action, "update");
        assert_eq!(req.settings, Some(patch.clone()));

        // An empty patch is a plain fetch
        let body = Settings::trigger_body(
            "u1",
            &SettingsParams { patch: Some(SettingsPayload::default()) },
        );
        assert_eq!(body["action"], "fetch");

        let mut params = SettingsParams { patch: Some(patch) };
        Settings::after_trigger(&mut params);
        assert!(params.patch.is_none());
    }

    #[test]
    fn test_search_trigger_response_is_applied_directly() {
        let response = json!({
            "results": [{ "symbol": "AAPL", "name": "Apple Inc.", "price": 175.43, "marketCap": "2.8T" }],
            "popular": [{ "symbol": "MSFT", "name": "Microsoft", "popularityScore": 91 }],
            "trending": [],
            "triggeredAt": "2026-01-01T00:00:00Z",
        });

        let data = Search::from_trigger_response(&response).unwrap().unwrap();
        assert_eq!(data.results.len(), 1);
        assert_eq!(data.results[0].market_cap, "2.8T");
        assert_eq!(data.popular[0].symbol, "MSFT");
        assert!(data.trending.is_empty());
    }

    #[test]
    fn test_search_refresh_keeps_previous_results() {
        let previous = SearchData {
            results: vec![SearchHit {
                symbol: "NVDA".into(),
                name: "NVIDIA".into(),
                price: Default::default(),
                change: Default::default(),
                change_percent: Default::default(),
                sector: "Technology".into(),
                market_cap: "1.2T".into(),
            }],
            ..SearchData::default()
        };

        let merged = Search::merge_fetched(Some(&previous), SearchData::default());
        assert_eq!(merged.results, previous.results);
        assert_eq!(Search::merge_fetched(None, SearchData::default()).results, vec![]);
    }

    #[test]
    fn test_settings_defaults_are_owned_by_identity() {
        let data = SettingsData::defaults_for("anonymous");
        assert_eq!(data.user.user_id, "anonymous");
        assert_eq!(data.user.currency, "USD");
        assert_eq!(data.security.session_timeout, 30);
    }
}
