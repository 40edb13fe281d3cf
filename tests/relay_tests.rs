mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use stockdash::config::WebhookUrls;
use stockdash::models::{
    PortfolioHolding, PortfolioTransaction, SectorAllocation, Stock, TriggerLog,
};
use stockdash::realtime::{ChangeKind, Table};
use stockdash::relay::TriggerDomain;

use common::{build_test_app, clear_symbols, unique_user, FakeWebhook};

fn trigger(function: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/functions/{function}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn logs_for(pool: &sqlx::PgPool, user_id: &str) -> Vec<TriggerLog> {
    sqlx::query_as::<_, TriggerLog>("SELECT * FROM trigger_logs WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await
        .unwrap()
}

fn stock_json(symbol: &str, name: &str, price: f64, change: f64, pct: f64) -> Value {
    json!({
        "symbol": symbol,
        "name": name,
        "price": price,
        "change": change,
        "changePercent": pct,
        "volume": "45.2M",
        "marketCap": "2.8T",
        "sector": "Technology",
    })
}

#[tokio::test]
async fn test_dashboard_trigger_persists_stocks_and_logs() {
    let hook = FakeWebhook::start(
        StatusCode::OK,
        json!({
            "stocks": [
                stock_json("AAPL", "Apple Inc.", 175.43, 2.15, 1.24),
                stock_json("TSLA", "Tesla Inc", 248.5, -3.2, -1.27),
            ]
        }),
    )
    .await;
    let webhooks = WebhookUrls::default().with(TriggerDomain::Dashboard, hook.url.clone());
    let (app, pool, state) = build_test_app(webhooks, None).await;
    clear_symbols(&pool, &["AAPL", "TSLA"]).await;
    let mut changes = state.changes.subscribe();

    let user = unique_user("dash");
    let resp = app
        .oneshot(trigger(
            "dashboard-trigger",
            json!({ "userId": user, "symbols": ["AAPL", "TSLA"] }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Dashboard trigger executed successfully");
    assert_eq!(body["data"]["stocks"].as_array().unwrap().len(), 2);
    assert!(body["data"]["requestId"].is_string());
    assert!(body["data"]["triggeredAt"].is_string());

    // Forward payload carries the trigger tag, identity and a fresh request id
    let forwarded = hook.received();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0]["trigger"], "dashboardtrigger");
    assert_eq!(forwarded[0]["userId"], user.as_str());
    assert_eq!(forwarded[0]["symbols"], json!(["AAPL", "TSLA"]));
    assert_eq!(forwarded[0]["requestId"], body["data"]["requestId"]);

    let stocks = sqlx::query_as::<_, Stock>(
        "SELECT * FROM stocks WHERE symbol = ANY($1) ORDER BY symbol",
    )
    .bind(vec!["AAPL".to_string(), "TSLA".to_string()])
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(stocks.len(), 2);
    assert_eq!(stocks[0].symbol, "AAPL");
    assert_eq!(stocks[0].price, rust_decimal::Decimal::new(17543, 2));
    assert_eq!(stocks[1].change_percent, rust_decimal::Decimal::new(-127, 2));

    let logs = logs_for(&pool, &user).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].trigger_type, "dashboard");
    assert_eq!(logs[0].status, "success");
    assert_eq!(
        logs[0].symbols.as_deref(),
        Some(&["AAPL".to_string(), "TSLA".to_string()][..])
    );
    assert_eq!(logs[0].response_data["stocks"][1]["symbol"], "TSLA");

    // Both upserts and the audit row were announced
    let mut seen = Vec::new();
    while let Ok(event) = changes.try_recv() {
        seen.push((event.table, event.event));
    }
    assert!(seen.contains(&(Table::Stocks, ChangeKind::Insert)));
    assert!(seen.contains(&(Table::TriggerLogs, ChangeKind::Insert)));
}

#[tokio::test]
async fn test_missing_webhook_url_fails_without_writes() {
    let (app, pool, _state) = build_test_app(WebhookUrls::default(), None).await;
    let user = unique_user("noconf");

    let resp = app
        .oneshot(trigger("analytics-trigger", json!({ "userId": user })))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("N8N_ANALYTICS_WEBHOOK_URL not configured"));
    assert!(body["timestamp"].is_string());

    assert!(logs_for(&pool, &user).await.is_empty());
    let perf: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM portfolio_performance WHERE user_id = $1")
        .bind(&user)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(perf, 0);
}

#[tokio::test]
async fn test_webhook_failure_is_surfaced_and_not_logged() {
    let hook = FakeWebhook::start(StatusCode::SERVICE_UNAVAILABLE, json!({})).await;
    let webhooks = WebhookUrls::default().with(TriggerDomain::Portfolio, hook.url.clone());
    let (app, pool, _state) = build_test_app(webhooks, None).await;
    let user = unique_user("down");

    let resp = app
        .oneshot(trigger("portfolio-trigger", json!({ "userId": user })))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "N8N portfolio webhook failed: Service Unavailable");

    // Exactly one attempt, no retry
    assert_eq!(hook.received().len(), 1);
    assert!(logs_for(&pool, &user).await.is_empty());
}

#[tokio::test]
async fn test_missing_user_id_is_rejected() {
    let hook = FakeWebhook::start(StatusCode::OK, json!({})).await;
    let webhooks = WebhookUrls::default().with(TriggerDomain::Alerts, hook.url.clone());
    let (app, _pool, _state) = build_test_app(webhooks, None).await;

    let resp = app
        .oneshot(trigger("alerts-trigger", json!({ "checkTriggers": true })))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(hook.received().is_empty());
}

#[tokio::test]
async fn test_repeated_identical_trigger_is_idempotent() {
    let hook = FakeWebhook::start(
        StatusCode::OK,
        json!({ "stocks": [stock_json("IDMP", "Idempotent Corp", 42.0, 0.5, 1.2)] }),
    )
    .await;
    let webhooks = WebhookUrls::default().with(TriggerDomain::Dashboard, hook.url.clone());
    let (app, pool, state) = build_test_app(webhooks, None).await;
    clear_symbols(&pool, &["IDMP"]).await;
    let user = unique_user("idem");
    let body = json!({ "userId": user, "symbols": ["IDMP"] });

    let resp = app.clone().oneshot(trigger("dashboard-trigger", body.clone())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let first = sqlx::query_as::<_, Stock>("SELECT * FROM stocks WHERE symbol = 'IDMP'")
        .fetch_one(&pool)
        .await
        .unwrap();

    let mut changes = state.changes.subscribe();
    let resp = app.oneshot(trigger("dashboard-trigger", body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let second = sqlx::query_as::<_, Stock>("SELECT * FROM stocks WHERE symbol = 'IDMP'")
        .fetch_one(&pool)
        .await
        .unwrap();

    // Same row, same values, untouched timestamp
    assert_eq!(first, second);

    // The second run wrote nothing to stocks; only its audit row
    let mut seen = Vec::new();
    while let Ok(event) = changes.try_recv() {
        seen.push(event.table);
    }
    assert!(!seen.contains(&Table::Stocks));
    assert_eq!(logs_for(&pool, &user).await.len(), 2);
}

#[tokio::test]
async fn test_shrinking_holdings_leave_no_stale_members() {
    let holding = |symbol: &str, value: f64| {
        json!({
            "symbol": symbol,
            "name": symbol,
            "shares": 10,
            "avgPrice": 100.0,
            "currentPrice": value / 10.0,
            "value": value,
            "gainLoss": value - 1000.0,
            "gainLossPercent": (value - 1000.0) / 10.0,
        })
    };
    let hook = FakeWebhook::start(
        StatusCode::OK,
        json!({ "portfolio": { "holdings": [holding("AAPL", 1900.0), holding("MSFT", 4200.0), holding("NVDA", 8700.0)] } }),
    )
    .await;
    let webhooks = WebhookUrls::default().with(TriggerDomain::Portfolio, hook.url.clone());
    let (app, pool, _state) = build_test_app(webhooks, None).await;
    let user = unique_user("shrink");

    let resp = app
        .clone()
        .oneshot(trigger("portfolio-trigger", json!({ "userId": user })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    hook.respond_with(
        StatusCode::OK,
        json!({ "portfolio": { "holdings": [holding("TSLA", 2500.0)] } }),
    );
    let resp = app
        .oneshot(trigger("portfolio-trigger", json!({ "userId": user })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["portfolio"]["holdings"][0]["symbol"], "TSLA");

    let holdings = sqlx::query_as::<_, PortfolioHolding>(
        "SELECT * FROM portfolio_holdings WHERE user_id = $1 AND portfolio_id = 'default'",
    )
    .bind(&user)
    .fetch_all(&pool)
    .await
    .unwrap();
    let symbols: Vec<_> = holdings.iter().map(|h| h.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["TSLA"]);
}

#[tokio::test]
async fn test_analytics_replaces_allocation_and_upserts_performance() {
    let analytics = |sectors: Value| {
        json!({
            "analytics": {
                "performance": {
                    "totalReturn": 12.5, "annualizedReturn": 18.2, "volatility": 15.3,
                    "sharpeRatio": 1.2, "beta": 1.05, "alpha": 2.3,
                    "maxDrawdown": -8.5, "var95": -2.1
                },
                "allocation": sectors,
                "correlation": [{ "asset1": "AAPL", "asset2": "MSFT", "correlation": 0.72 }]
            }
        })
    };
    let hook = FakeWebhook::start(
        StatusCode::OK,
        analytics(json!([
            { "sector": "Technology", "percentage": 60, "performance": 12, "risk": 3 },
            { "sector": "Healthcare", "percentage": 40, "performance": 4, "risk": 2 }
        ])),
    )
    .await;
    let webhooks = WebhookUrls::default().with(TriggerDomain::Analytics, hook.url.clone());
    let (app, pool, _state) = build_test_app(webhooks, None).await;
    let user = unique_user("analytics");
    let request = json!({ "userId": user, "period": "1y" });

    let resp = app.clone().oneshot(trigger("analytics-trigger", request.clone())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    hook.respond_with(
        StatusCode::OK,
        analytics(json!([{ "sector": "Energy", "percentage": 100, "performance": 1, "risk": 4 }])),
    );
    let resp = app.oneshot(trigger("analytics-trigger", request)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let sectors = sqlx::query_as::<_, SectorAllocation>(
        "SELECT * FROM sector_allocation WHERE user_id = $1",
    )
    .bind(&user)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(sectors.len(), 1);
    assert_eq!(sectors[0].sector, "Energy");

    let periods: Vec<String> = sqlx::query_scalar(
        "SELECT period FROM portfolio_performance WHERE user_id = $1",
    )
    .bind(&user)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(periods, vec!["1y".to_string()]);

    let correlations: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM asset_correlations WHERE user_id = $1")
            .bind(&user)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(correlations, 1);
}

#[tokio::test]
async fn test_partial_persistence_is_logged_as_partial() {
    // Predictions need a symbol; the second one cannot be stored.
    let hook = FakeWebhook::start(
        StatusCode::OK,
        json!({
            "predictions": [
                { "symbol": "PRTL", "direction": "BUY", "confidence": 80, "targetPrice": 10, "timeframe": "1w" },
                { "symbol": "", "direction": "SELL", "confidence": 50, "targetPrice": 5, "timeframe": "1w" }
            ]
        }),
    )
    .await;
    let webhooks = WebhookUrls::default().with(TriggerDomain::Predictions, hook.url.clone());
    let (app, pool, _state) = build_test_app(webhooks, None).await;
    clear_symbols(&pool, &["PRTL"]).await;
    let user = unique_user("partial");

    let resp = app
        .oneshot(trigger("predictions-trigger", json!({ "userId": user, "symbols": ["PRTL"] })))
        .await
        .unwrap();

    // Persistence problems never fail the request
    assert_eq!(resp.status(), StatusCode::OK);
    let logs = logs_for(&pool, &user).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].trigger_type, "predictions");
    assert_eq!(logs[0].status, "partial");

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM predictions WHERE symbol = 'PRTL'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, 1);
}

#[tokio::test]
async fn test_malformed_stock_does_not_cost_the_batch() {
    let hook = FakeWebhook::start(
        StatusCode::OK,
        json!({
            "stocks": [
                stock_json("LNT1", "Lenient One", 10.0, 0.5, 5.0),
                { "name": "no symbol" }
            ]
        }),
    )
    .await;
    let webhooks = WebhookUrls::default().with(TriggerDomain::Dashboard, hook.url.clone());
    let (app, pool, _state) = build_test_app(webhooks, None).await;
    clear_symbols(&pool, &["LNT1"]).await;
    let user = unique_user("lenient");

    let resp = app
        .oneshot(trigger("dashboard-trigger", json!({ "userId": user })))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);

    let stored = sqlx::query_as::<_, Stock>("SELECT * FROM stocks WHERE symbol = 'LNT1'")
        .fetch_optional(&pool)
        .await
        .unwrap();
    assert_eq!(stored.map(|s| s.name), Some("Lenient One".to_string()));

    let logs = logs_for(&pool, &user).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "partial");
}

#[tokio::test]
async fn test_transaction_id_cannot_move_between_users() {
    let tx_id = (uuid::Uuid::new_v4().as_u128() % 1_000_000_000) as i64 * 100 + 7;
    let transaction = |shares: i64| {
        json!({
            "portfolio": {
                "transactions": [{
                    "id": tx_id, "type": "buy", "symbol": "OWNR",
                    "shares": shares, "price": 10, "date": "2026-03-01", "total": shares * 10
                }]
            }
        })
    };
    let hook = FakeWebhook::start(StatusCode::OK, transaction(5)).await;
    let webhooks = WebhookUrls::default().with(TriggerDomain::Portfolio, hook.url.clone());
    let (app, pool, _state) = build_test_app(webhooks, None).await;
    let owner = unique_user("tx-owner");
    let intruder = unique_user("tx-intruder");

    let resp = app
        .clone()
        .oneshot(trigger("portfolio-trigger", json!({ "userId": owner })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    hook.respond_with(StatusCode::OK, transaction(99));
    let resp = app
        .oneshot(trigger("portfolio-trigger", json!({ "userId": intruder })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let row = sqlx::query_as::<_, PortfolioTransaction>(
        "SELECT * FROM portfolio_transactions WHERE id = $1",
    )
    .bind(tx_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row.user_id, owner);
    assert_eq!(row.shares, rust_decimal::Decimal::from(5));

    let logs = logs_for(&pool, &intruder).await;
    assert_eq!(logs[0].status, "partial");
}

#[tokio::test]
async fn test_notification_trigger_stores_notification() {
    let hook = FakeWebhook::start(StatusCode::OK, json!({ "delivered": true })).await;
    let webhooks = WebhookUrls::default().with(TriggerDomain::Notification, hook.url.clone());
    let (app, pool, _state) = build_test_app(webhooks, None).await;
    let user = unique_user("notify");
    let request_id = uuid::Uuid::new_v4();

    let resp = app
        .oneshot(trigger(
            "notification-trigger",
            json!({
                "userId": user,
                "title": "Price Alert",
                "message": "AAPL has reached your target price of $190",
                "type": "info",
                "requestId": request_id,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["requestId"], request_id.to_string());
    assert_eq!(hook.received()[0]["requestId"], request_id.to_string());

    let titles: Vec<String> =
        sqlx::query_scalar("SELECT title FROM user_notifications WHERE user_id = $1")
            .bind(&user)
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(titles, vec!["Price Alert".to_string()]);
}

#[tokio::test]
async fn test_unknown_function_is_not_found() {
    let (app, _pool, _state) = build_test_app(WebhookUrls::default(), None).await;

    let resp = app
        .oneshot(trigger("launch-missiles", json!({ "userId": "u" })))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_preflight_gets_permissive_cors_headers() {
    let (app, _pool, _state) = build_test_app(WebhookUrls::default(), Some("secret")).await;

    let req = Request::builder()
        .method("OPTIONS")
        .uri("/functions/dashboard-trigger")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "authorization, content-type")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();

    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
