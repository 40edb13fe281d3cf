//! One [`DomainRelay`] per trigger endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use super::payload::*;
use super::{DomainRelay, PersistContext, TriggerDomain};
use crate::db::{
    alert_repo, analytics_repo, notification_repo, portfolio_repo, prediction_repo, settings_repo,
    stock_repo,
};
use crate::realtime::Table;

/// Upsert ticker snapshots and any embedded prediction. Records that do not
/// parse are counted and the rest are still written.
async fn persist_stocks(ctx: &PersistContext<'_>, stocks: &Records<StockPayload>) {
    ctx.rejected(Table::Stocks, stocks);

    for stock in stocks {
        if stock.symbol.trim().is_empty() {
            ctx.skipped(Table::Stocks, "", "stock without symbol");
            continue;
        }
        ctx.upserted(
            Table::Stocks,
            &stock.symbol,
            stock_repo::upsert_stock(ctx.db, stock).await,
        );

        match stock.prediction() {
            Some(Ok(prediction)) => ctx.upserted(
                Table::Predictions,
                &stock.symbol,
                prediction_repo::upsert_prediction(ctx.db, &stock.symbol, &prediction).await,
            ),
            Some(Err(reason)) => ctx.skipped(Table::Predictions, &stock.symbol, &reason),
            None => {}
        }
    }
}

pub struct DashboardRelay;

#[async_trait]
impl DomainRelay for DashboardRelay {
    const DOMAIN: TriggerDomain = TriggerDomain::Dashboard;

    type Request = DashboardRequest;
    type Result = DashboardResult;

    fn user_id(req: &DashboardRequest) -> &str {
        &req.user_id
    }

    fn forward_params(req: &DashboardRequest) -> Value {
        json!({
            "symbols": req.symbols_or_default(),
            "triggerType": req.trigger_type,
        })
    }

    fn log_type(req: &DashboardRequest) -> String {
        req.trigger_type.clone()
    }

    fn symbols(req: &DashboardRequest) -> Option<Vec<String>> {
        Some(req.symbols_or_default())
    }

    async fn persist(ctx: &PersistContext<'_>, _req: &DashboardRequest, result: &DashboardResult) {
        persist_stocks(ctx, &result.stocks).await;
    }
}

pub struct WatchlistRelay;

#[async_trait]
impl DomainRelay for WatchlistRelay {
    const DOMAIN: TriggerDomain = TriggerDomain::Watchlist;

    type Request = WatchlistRequest;
    type Result = WatchlistResult;

    fn user_id(req: &WatchlistRequest) -> &str {
        &req.user_id
    }

    async fn persist(ctx: &PersistContext<'_>, _req: &WatchlistRequest, result: &WatchlistResult) {
        persist_stocks(ctx, &result.stocks).await;
    }
}

pub struct PredictionsRelay;

#[async_trait]
impl DomainRelay for PredictionsRelay {
    const DOMAIN: TriggerDomain = TriggerDomain::Predictions;

    type Request = PredictionsRequest;
    type Result = PredictionsResult;

    fn user_id(req: &PredictionsRequest) -> &str {
        &req.user_id
    }

    fn forward_params(req: &PredictionsRequest) -> Value {
        json!({
            "symbols": req.symbols_or_default(),
            "models": req.models_or_default(),
            "timeframe": req.timeframe,
        })
    }

    fn symbols(req: &PredictionsRequest) -> Option<Vec<String>> {
        Some(req.symbols_or_default())
    }

    async fn persist(ctx: &PersistContext<'_>, _req: &PredictionsRequest, result: &PredictionsResult) {
        ctx.rejected(Table::Predictions, &result.predictions);
        ctx.rejected(Table::ModelPerformance, &result.model_performance);

        for prediction in &result.predictions {
            if prediction.symbol.is_empty() {
                ctx.skipped(Table::Predictions, "", "prediction without symbol");
                continue;
            }
            ctx.upserted(
                Table::Predictions,
                &prediction.symbol,
                prediction_repo::upsert_prediction(ctx.db, &prediction.symbol, prediction).await,
            );
        }

        for model in &result.model_performance {
            ctx.upserted(
                Table::ModelPerformance,
                &model.model,
                prediction_repo::upsert_model_performance(ctx.db, model).await,
            );
        }
    }
}

pub struct PortfolioRelay;

#[async_trait]
impl DomainRelay for PortfolioRelay {
    const DOMAIN: TriggerDomain = TriggerDomain::Portfolio;
    const RESULT_KEY: Option<&'static str> = Some("portfolio");

    type Request = PortfolioRequest;
    type Result = PortfolioResult;

    fn user_id(req: &PortfolioRequest) -> &str {
        &req.user_id
    }

    async fn persist(ctx: &PersistContext<'_>, req: &PortfolioRequest, result: &PortfolioResult) {
        let owner = format!("{}/{}", req.user_id, req.portfolio_id);
        ctx.rejected(Table::PortfolioHoldings, &result.holdings);
        ctx.rejected(Table::PortfolioTransactions, &result.transactions);

        // An empty list means "nothing reported", not "sold everything".
        if !result.holdings.is_empty() {
            ctx.replaced(
                Table::PortfolioHoldings,
                &owner,
                portfolio_repo::replace_holdings(
                    ctx.db,
                    &req.user_id,
                    &req.portfolio_id,
                    &result.holdings.valid,
                )
                .await,
            );
        }

        for tx in &result.transactions {
            ctx.upserted(
                Table::PortfolioTransactions,
                &tx.id.to_string(),
                portfolio_repo::upsert_transaction(ctx.db, &req.user_id, &req.portfolio_id, tx).await,
            );
        }

        if let Some(summary) = &result.summary {
            ctx.upserted(
                Table::PortfolioSummary,
                &owner,
                portfolio_repo::upsert_summary(ctx.db, &req.user_id, &req.portfolio_id, summary).await,
            );
        }
    }
}

pub struct AnalyticsRelay;

#[async_trait]
impl DomainRelay for AnalyticsRelay {
    const DOMAIN: TriggerDomain = TriggerDomain::Analytics;
    const RESULT_KEY: Option<&'static str> = Some("analytics");

    type Request = AnalyticsRequest;
    type Result = AnalyticsResult;

    fn user_id(req: &AnalyticsRequest) -> &str {
        &req.user_id
    }

    async fn persist(ctx: &PersistContext<'_>, req: &AnalyticsRequest, result: &AnalyticsResult) {
        let owner = format!("{}/{}", req.user_id, req.portfolio_id);
        ctx.rejected(Table::SectorAllocation, &result.allocation);
        ctx.rejected(Table::AssetCorrelations, &result.correlation);

        if let Some(performance) = &result.performance {
            ctx.upserted(
                Table::PortfolioPerformance,
                &format!("{owner}/{}", req.period),
                analytics_repo::upsert_performance(
                    ctx.db,
                    &req.user_id,
                    &req.portfolio_id,
                    &req.period,
                    performance,
                )
                .await,
            );
        }

        if !result.allocation.is_empty() {
            ctx.replaced(
                Table::SectorAllocation,
                &owner,
                analytics_repo::replace_sector_allocation(
                    ctx.db,
                    &req.user_id,
                    &req.portfolio_id,
                    &result.allocation.valid,
                )
                .await,
            );
        }

        if !result.correlation.is_empty() {
            ctx.replaced(
                Table::AssetCorrelations,
                &owner,
                analytics_repo::replace_correlations(
                    ctx.db,
                    &req.user_id,
                    &req.portfolio_id,
                    &result.correlation.valid,
                )
                .await,
            );
        }
    }
}

pub struct AlertsRelay;

#[async_trait]
impl DomainRelay for AlertsRelay {
    const DOMAIN: TriggerDomain = TriggerDomain::Alerts;

    type Request = AlertsRequest;
    type Result = AlertsResult;

    fn user_id(req: &AlertsRequest) -> &str {
        &req.user_id
    }

    async fn persist(ctx: &PersistContext<'_>, req: &AlertsRequest, result: &AlertsResult) {
        ctx.rejected(Table::UserAlerts, &result.alerts);

        for update in &result.alerts {
            ctx.updated(
                Table::UserAlerts,
                &update.id.to_string(),
                alert_repo::apply_alert_update(ctx.db, &req.user_id, update).await,
            );
        }
    }
}

pub struct SearchRelay;

#[async_trait]
impl DomainRelay for SearchRelay {
    const DOMAIN: TriggerDomain = TriggerDomain::Search;

    type Request = SearchRequest;
    type Result = SearchResult;

    fn user_id(req: &SearchRequest) -> &str {
        &req.user_id
    }

    async fn persist(ctx: &PersistContext<'_>, _req: &SearchRequest, result: &SearchResult) {
        ctx.rejected(Table::PopularStocks, &result.popular);
        ctx.rejected(Table::TrendingStocks, &result.trending);

        for popular in &result.popular {
            ctx.upserted(
                Table::PopularStocks,
                &popular.stock.symbol,
                stock_repo::upsert_popular(ctx.db, popular).await,
            );
        }

        for trending in &result.trending {
            ctx.upserted(
                Table::TrendingStocks,
                &trending.symbol,
                stock_repo::upsert_trending(ctx.db, trending).await,
            );
        }
    }
}

pub struct SettingsRelay;

#[async_trait]
impl DomainRelay for SettingsRelay {
    const DOMAIN: TriggerDomain = TriggerDomain::Settings;

    type Request = SettingsRequest;
    type Result = SettingsResult;

    fn user_id(req: &SettingsRequest) -> &str {
        &req.user_id
    }

    async fn persist(ctx: &PersistContext<'_>, req: &SettingsRequest, result: &SettingsResult) {
        // The webhook's copy wins; an update it did not echo is stored as requested.
        let settings = match (&result.settings, req.action.as_str()) {
            (Some(settings), _) => settings,
            (None, "update") => match &req.settings {
                Some(settings) => settings,
                None => return,
            },
            (None, _) => return,
        };
        let user = req.user_id.as_str();

        if let Some(patch) = &settings.user {
            ctx.upserted(
                Table::UserSettings,
                user,
                settings_repo::upsert_user_settings(ctx.db, user, patch).await,
            );
        }
        if let Some(patch) = &settings.notifications {
            ctx.upserted(
                Table::NotificationSettings,
                user,
                settings_repo::upsert_notification_settings(ctx.db, user, patch).await,
            );
        }
        if let Some(patch) = &settings.api {
            ctx.upserted(
                Table::ApiSettings,
                user,
                settings_repo::upsert_api_settings(ctx.db, user, patch).await,
            );
        }
        if let Some(patch) = &settings.security {
            ctx.upserted(
                Table::SecuritySettings,
                user,
                settings_repo::upsert_security_settings(ctx.db, user, patch).await,
            );
        }
    }
}

pub struct NotificationRelay;

#[async_trait]
impl DomainRelay for NotificationRelay {
    const DOMAIN: TriggerDomain = TriggerDomain::Notification;

    type Request = NotificationRequest;
    /// The notification webhook's answer is passed through untouched.
    type Result = Value;

    fn user_id(req: &NotificationRequest) -> &str {
        &req.user_id
    }

    fn forward_params(req: &NotificationRequest) -> Value {
        json!({
            "notification": {
                "title": req.title,
                "message": req.message,
                "type": req.kind,
                "timestamp": req.timestamp,
            }
        })
    }

    fn request_id(req: &NotificationRequest) -> Option<Uuid> {
        req.request_id
    }

    async fn persist(ctx: &PersistContext<'_>, req: &NotificationRequest, _result: &Value) {
        ctx.inserted(
            Table::UserNotifications,
            &req.user_id,
            notification_repo::insert_notification(
                ctx.db,
                &req.user_id,
                &req.title,
                &req.message,
                &req.kind,
                req.timestamp,
            )
            .await,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_forward_params_apply_defaults() {
        let req: DashboardRequest = serde_json::from_value(json!({ "userId": "u" })).unwrap();
        let params = DashboardRelay::forward_params(&req);

        assert_eq!(params["symbols"].as_array().unwrap().len(), 8);
        assert_eq!(params["triggerType"], "dashboard");
        assert_eq!(DashboardRelay::log_type(&req), "dashboard");
    }

    #[test]
    fn test_dashboard_log_type_follows_trigger_type() {
        let req: DashboardRequest =
            serde_json::from_value(json!({ "userId": "u", "triggerType": "manual" })).unwrap();
        assert_eq!(DashboardRelay::log_type(&req), "manual");
    }

    #[test]
    fn test_portfolio_forward_params_keep_request_fields() {
        let req: PortfolioRequest =
            serde_json::from_value(json!({ "userId": "u", "portfolioId": "retirement" })).unwrap();
        let params = PortfolioRelay::forward_params(&req);

        assert_eq!(params["portfolioId"], "retirement");
        assert_eq!(params["includeTransactions"], true);
        assert_eq!(PortfolioRelay::log_type(&req), "portfolio");
        assert!(PortfolioRelay::symbols(&req).is_none());
    }

    #[test]
    fn test_notification_reuses_client_request_id() {
        let id = Uuid::new_v4();
        let req: NotificationRequest = serde_json::from_value(json!({
            "userId": "u",
            "title": "Price alert",
            "message": "AAPL crossed 200",
            "type": "warning",
            "requestId": id,
        }))
        .unwrap();

        assert_eq!(NotificationRelay::request_id(&req), Some(id));
        let params = NotificationRelay::forward_params(&req);
        assert_eq!(params["notification"]["type"], "warning");
    }
}
