use sqlx::PgPool;

use super::{ReadScope, WriteOutcome};
use crate::models::{PopularStock, Stock, TrendingStock};
use crate::relay::payload::{PopularPayload, StockPayload, TrendingPayload};

/// Insert or refresh one ticker snapshot, keyed by symbol.
pub async fn upsert_stock(pool: &PgPool, stock: &StockPayload) -> anyhow::Result<WriteOutcome> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO stocks (symbol, name, price, change, change_percent, volume, market_cap, sector, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        ON CONFLICT (symbol) DO UPDATE
            SET name = EXCLUDED.name,
                price = EXCLUDED.price,
                change = EXCLUDED.change,
                change_percent = EXCLUDED.change_percent,
                volume = EXCLUDED.volume,
                market_cap = EXCLUDED.market_cap,
                sector = EXCLUDED.sector,
                updated_at = NOW()
            WHERE (stocks.name, stocks.price, stocks.change, stocks.change_percent,
                   stocks.volume, stocks.market_cap, stocks.sector)
                IS DISTINCT FROM
                  (EXCLUDED.name, EXCLUDED.price, EXCLUDED.change, EXCLUDED.change_percent,
                   EXCLUDED.volume, EXCLUDED.market_cap, EXCLUDED.sector)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(&stock.symbol)
    .bind(&stock.name)
    .bind(stock.price)
    .bind(stock.change)
    .bind(stock.change_percent)
    .bind(&stock.volume)
    .bind(&stock.market_cap)
    .bind(&stock.sector)
    .fetch_optional(pool)
    .await?;

    Ok(WriteOutcome::from_returning(row))
}

/// All snapshots, most recently updated first.
pub async fn list_stocks(pool: &PgPool, scope: &ReadScope) -> anyhow::Result<Vec<Stock>> {
    let stocks = sqlx::query_as::<_, Stock>(
        "SELECT * FROM stocks ORDER BY updated_at DESC NULLS LAST, symbol LIMIT $1",
    )
    .bind(scope.sql_limit())
    .fetch_all(pool)
    .await?;

    Ok(stocks)
}

pub async fn upsert_popular(pool: &PgPool, stock: &PopularPayload) -> anyhow::Result<WriteOutcome> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO popular_stocks
            (symbol, name, price, change, change_percent, sector, market_cap, popularity_score, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        ON CONFLICT (symbol) DO UPDATE
            SET name = EXCLUDED.name,
                price = EXCLUDED.price,
                change = EXCLUDED.change,
                change_percent = EXCLUDED.change_percent,
                sector = EXCLUDED.sector,
                market_cap = EXCLUDED.market_cap,
                popularity_score = EXCLUDED.popularity_score,
                updated_at = NOW()
            WHERE (popular_stocks.name, popular_stocks.price, popular_stocks.change,
                   popular_stocks.change_percent, popular_stocks.sector,
                   popular_stocks.market_cap, popular_stocks.popularity_score)
                IS DISTINCT FROM
                  (EXCLUDED.name, EXCLUDED.price, EXCLUDED.change, EXCLUDED.change_percent,
                   EXCLUDED.sector, EXCLUDED.market_cap, EXCLUDED.popularity_score)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(&stock.stock.symbol)
    .bind(&stock.stock.name)
    .bind(stock.stock.price)
    .bind(stock.stock.change)
    .bind(stock.stock.change_percent)
    .bind(&stock.stock.sector)
    .bind(&stock.stock.market_cap)
    .bind(stock.popularity_score)
    .fetch_optional(pool)
    .await?;

    Ok(WriteOutcome::from_returning(row))
}

pub async fn list_popular(pool: &PgPool, scope: &ReadScope) -> anyhow::Result<Vec<PopularStock>> {
    let rows = sqlx::query_as::<_, PopularStock>(
        "SELECT * FROM popular_stocks ORDER BY popularity_score DESC, symbol LIMIT $1",
    )
    .bind(scope.sql_limit())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn upsert_trending(pool: &PgPool, stock: &TrendingPayload) -> anyhow::Result<WriteOutcome> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO trending_stocks
            (symbol, name, price, change, change_percent, volume, reason, trend_score, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        ON CONFLICT (symbol) DO UPDATE
            SET name = EXCLUDED.name,
                price = EXCLUDED.price,
                change = EXCLUDED.change,
                change_percent = EXCLUDED.change_percent,
                volume = EXCLUDED.volume,
                reason = EXCLUDED.reason,
                trend_score = EXCLUDED.trend_score,
                updated_at = NOW()
            WHERE (trending_stocks.name, trending_stocks.price, trending_stocks.change,
                   trending_stocks.change_percent, trending_stocks.volume,
                   trending_stocks.reason, trending_stocks.trend_score)
                IS DISTINCT FROM
                  (EXCLUDED.name, EXCLUDED.price, EXCLUDED.change, EXCLUDED.change_percent,
                   EXCLUDED.volume, EXCLUDED.reason, EXCLUDED.trend_score)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(&stock.symbol)
    .bind(&stock.name)
    .bind(stock.price)
    .bind(stock.change)
    .bind(stock.change_percent)
    .bind(&stock.volume)
    .bind(&stock.reason)
    .bind(stock.trend_score)
    .fetch_optional(pool)
    .await?;

    Ok(WriteOutcome::from_returning(row))
}

pub async fn list_trending(pool: &PgPool, scope: &ReadScope) -> anyhow::Result<Vec<TrendingStock>> {
    let rows = sqlx::query_as::<_, TrendingStock>(
        "SELECT * FROM trending_stocks ORDER BY trend_score DESC, symbol LIMIT $1",
    )
    .bind(scope.sql_limit())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
