use sqlx::PgPool;

use super::{ReadScope, ReplaceOutcome, WriteOutcome};
use crate::models::{AssetCorrelation, PortfolioPerformance, SectorAllocation};
use crate::relay::payload::{AllocationPayload, CorrelationPayload, PerformancePayload};

pub async fn upsert_performance(
    pool: &PgPool,
    user_id: &str,
    portfolio_id: &str,
    period: &str,
    perf: &PerformancePayload,
) -> anyhow::Result<WriteOutcome> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO portfolio_performance
            (user_id, portfolio_id, period, total_return, annualized_return, volatility,
             sharpe_ratio, beta, alpha, max_drawdown, var_95, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
        ON CONFLICT (user_id, portfolio_id, period) DO UPDATE
            SET total_return = EXCLUDED.total_return,
                annualized_return = EXCLUDED.annualized_return,
                volatility = EXCLUDED.volatility,
                sharpe_ratio = EXCLUDED.sharpe_ratio,
                beta = EXCLUDED.beta,
                alpha = EXCLUDED.alpha,
                max_drawdown = EXCLUDED.max_drawdown,
                var_95 = EXCLUDED.var_95,
                updated_at = NOW()
            WHERE (portfolio_performance.total_return, portfolio_performance.annualized_return,
                   portfolio_performance.volatility, portfolio_performance.sharpe_ratio,
                   portfolio_performance.beta, portfolio_performance.alpha,
                   portfolio_performance.max_drawdown, portfolio_performance.var_95)
                IS DISTINCT FROM
                  (EXCLUDED.total_return, EXCLUDED.annualized_return, EXCLUDED.volatility,
                   EXCLUDED.sharpe_ratio, EXCLUDED.beta, EXCLUDED.alpha,
                   EXCLUDED.max_drawdown, EXCLUDED.var_95)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(user_id)
    .bind(portfolio_id)
    .bind(period)
    .bind(perf.total_return)
    .bind(perf.annualized_return)
    .bind(perf.volatility)
    .bind(perf.sharpe_ratio)
    .bind(perf.beta)
    .bind(perf.alpha)
    .bind(perf.max_drawdown)
    .bind(perf.var95)
    .fetch_optional(pool)
    .await?;

    Ok(WriteOutcome::from_returning(row))
}

pub async fn list_performance(
    pool: &PgPool,
    scope: &ReadScope,
) -> anyhow::Result<Vec<PortfolioPerformance>> {
    let rows = sqlx::query_as::<_, PortfolioPerformance>(
        r#"
        SELECT * FROM portfolio_performance
        WHERE ($1::text IS NULL OR user_id = $1)
          AND ($2::text IS NULL OR portfolio_id = $2)
        ORDER BY updated_at DESC NULLS LAST
        LIMIT $3
        "#,
    )
    .bind(&scope.user_id)
    .bind(&scope.portfolio_id)
    .bind(scope.sql_limit())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Swap the sector breakdown of (user, portfolio) in one transaction.
pub async fn replace_sector_allocation(
    pool: &PgPool,
    user_id: &str,
    portfolio_id: &str,
    allocation: &[AllocationPayload],
) -> anyhow::Result<ReplaceOutcome> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query(
        "DELETE FROM sector_allocation WHERE user_id = $1 AND portfolio_id = $2",
    )
    .bind(user_id)
    .bind(portfolio_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    for row in allocation {
        sqlx::query(
            r#"
            INSERT INTO sector_allocation
                (user_id, portfolio_id, sector, percentage, performance, risk, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            "#,
        )
        .bind(user_id)
        .bind(portfolio_id)
        .bind(&row.sector)
        .bind(row.percentage)
        .bind(row.performance)
        .bind(row.risk)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(ReplaceOutcome {
        deleted,
        inserted: allocation.len() as u64,
    })
}

pub async fn list_sector_allocation(
    pool: &PgPool,
    scope: &ReadScope,
) -> anyhow::Result<Vec<SectorAllocation>> {
    let rows = sqlx::query_as::<_, SectorAllocation>(
        r#"
        SELECT * FROM sector_allocation
        WHERE ($1::text IS NULL OR user_id = $1)
          AND ($2::text IS NULL OR portfolio_id = $2)
        ORDER BY percentage DESC, sector
        LIMIT $3
        "#,
    )
    .bind(&scope.user_id)
    .bind(&scope.portfolio_id)
    .bind(scope.sql_limit())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Swap the pairwise correlations of (user, portfolio) in one transaction.
pub async fn replace_correlations(
    pool: &PgPool,
    user_id: &str,
    portfolio_id: &str,
    correlations: &[CorrelationPayload],
) -> anyhow::Result<ReplaceOutcome> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query(
        "DELETE FROM asset_correlations WHERE user_id = $1 AND portfolio_id = $2",
    )
    .bind(user_id)
    .bind(portfolio_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    for pair in correlations {
        sqlx::query(
            r#"
            INSERT INTO asset_correlations
                (user_id, portfolio_id, asset1, asset2, correlation, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#,
        )
        .bind(user_id)
        .bind(portfolio_id)
        .bind(&pair.asset1)
        .bind(&pair.asset2)
        .bind(pair.correlation)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(ReplaceOutcome {
        deleted,
        inserted: correlations.len() as u64,
    })
}

pub async fn list_correlations(
    pool: &PgPool,
    scope: &ReadScope,
) -> anyhow::Result<Vec<AssetCorrelation>> {
    let rows = sqlx::query_as::<_, AssetCorrelation>(
        r#"
        SELECT * FROM asset_correlations
        WHERE ($1::text IS NULL OR user_id = $1)
          AND ($2::text IS NULL OR portfolio_id = $2)
        ORDER BY correlation DESC, asset1, asset2
        LIMIT $3
        "#,
    )
    .bind(&scope.user_id)
    .bind(&scope.portfolio_id)
    .bind(scope.sql_limit())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
