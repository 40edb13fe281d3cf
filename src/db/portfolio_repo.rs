use sqlx::PgPool;

use super::{ReadScope, ReplaceOutcome, WriteOutcome};
use crate::models::{PortfolioHolding, PortfolioSummary, PortfolioTransaction};
use crate::relay::payload::{HoldingPayload, SummaryPayload, TransactionPayload};

/// Replace every holding of (user, portfolio) with `holdings` in one
/// transaction, so readers never see a partially emptied portfolio.
pub async fn replace_holdings(
    pool: &PgPool,
    user_id: &str,
    portfolio_id: &str,
    holdings: &[HoldingPayload],
) -> anyhow::Result<ReplaceOutcome> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query(
        "DELETE FROM portfolio_holdings WHERE user_id = $1 AND portfolio_id = $2",
    )
    .bind(user_id)
    .bind(portfolio_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    for holding in holdings {
        sqlx::query(
            r#"
            INSERT INTO portfolio_holdings
                (user_id, portfolio_id, symbol, name, shares, avg_price, current_price,
                 value, gain_loss, gain_loss_percent, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            "#,
        )
        .bind(user_id)
        .bind(portfolio_id)
        .bind(&holding.symbol)
        .bind(&holding.name)
        .bind(holding.shares)
        .bind(holding.avg_price)
        .bind(holding.current_price)
        .bind(holding.value)
        .bind(holding.gain_loss)
        .bind(holding.gain_loss_percent)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(ReplaceOutcome {
        deleted,
        inserted: holdings.len() as u64,
    })
}

/// Largest positions first.
pub async fn list_holdings(pool: &PgPool, scope: &ReadScope) -> anyhow::Result<Vec<PortfolioHolding>> {
    let rows = sqlx::query_as::<_, PortfolioHolding>(
        r#"
        SELECT * FROM portfolio_holdings
        WHERE ($1::text IS NULL OR user_id = $1)
          AND ($2::text IS NULL OR portfolio_id = $2)
        ORDER BY value DESC, symbol
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

/// Transactions are keyed by the webhook-assigned id. A row owned by another
/// (user, portfolio) is never taken over; that conflict is reported as an error.
pub async fn upsert_transaction(
    pool: &PgPool,
    user_id: &str,
    portfolio_id: &str,
    transaction: &TransactionPayload,
) -> anyhow::Result<WriteOutcome> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO portfolio_transactions
            (id, user_id, portfolio_id, type, symbol, shares, price, date, total)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO UPDATE
            SET type = EXCLUDED.type,
                symbol = EXCLUDED.symbol,
                shares = EXCLUDED.shares,
                price = EXCLUDED.price,
                date = EXCLUDED.date,
                total = EXCLUDED.total
            WHERE portfolio_transactions.user_id = EXCLUDED.user_id
              AND portfolio_transactions.portfolio_id = EXCLUDED.portfolio_id
              AND (portfolio_transactions.type, portfolio_transactions.symbol,
                   portfolio_transactions.shares, portfolio_transactions.price,
                   portfolio_transactions.date, portfolio_transactions.total)
                IS DISTINCT FROM
                  (EXCLUDED.type, EXCLUDED.symbol, EXCLUDED.shares, EXCLUDED.price,
                   EXCLUDED.date, EXCLUDED.total)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(transaction.id)
    .bind(user_id)
    .bind(portfolio_id)
    .bind(&transaction.kind)
    .bind(&transaction.symbol)
    .bind(transaction.shares)
    .bind(transaction.price)
    .bind(&transaction.date)
    .bind(transaction.total)
    .fetch_optional(pool)
    .await?;

    if row.is_none() {
        let (owner, portfolio): (String, String) = sqlx::query_as(
            "SELECT user_id, portfolio_id FROM portfolio_transactions WHERE id = $1",
        )
        .bind(transaction.id)
        .fetch_one(pool)
        .await?;
        if owner != user_id || portfolio != portfolio_id {
            anyhow::bail!("transaction {} belongs to another portfolio", transaction.id);
        }
    }

    Ok(WriteOutcome::from_returning(row))
}

/// Most recent transactions first.
pub async fn list_transactions(
    pool: &PgPool,
    scope: &ReadScope,
) -> anyhow::Result<Vec<PortfolioTransaction>> {
    let rows = sqlx::query_as::<_, PortfolioTransaction>(
        r#"
        SELECT * FROM portfolio_transactions
        WHERE ($1::text IS NULL OR user_id = $1)
          AND ($2::text IS NULL OR portfolio_id = $2)
        ORDER BY date DESC, id DESC
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

pub async fn upsert_summary(
    pool: &PgPool,
    user_id: &str,
    portfolio_id: &str,
    summary: &SummaryPayload,
) -> anyhow::Result<WriteOutcome> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO portfolio_summary
            (user_id, portfolio_id, total_value, total_cost, total_gain_loss,
             total_gain_loss_percent, day_change, day_change_percent, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        ON CONFLICT (user_id, portfolio_id) DO UPDATE
            SET total_value = EXCLUDED.total_value,
                total_cost = EXCLUDED.total_cost,
                total_gain_loss = EXCLUDED.total_gain_loss,
                total_gain_loss_percent = EXCLUDED.total_gain_loss_percent,
                day_change = EXCLUDED.day_change,
                day_change_percent = EXCLUDED.day_change_percent,
                updated_at = NOW()
            WHERE (portfolio_summary.total_value, portfolio_summary.total_cost,
                   portfolio_summary.total_gain_loss, portfolio_summary.total_gain_loss_percent,
                   portfolio_summary.day_change, portfolio_summary.day_change_percent)
                IS DISTINCT FROM
                  (EXCLUDED.total_value, EXCLUDED.total_cost, EXCLUDED.total_gain_loss,
                   EXCLUDED.total_gain_loss_percent, EXCLUDED.day_change, EXCLUDED.day_change_percent)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(user_id)
    .bind(portfolio_id)
    .bind(summary.total_value)
    .bind(summary.total_cost)
    .bind(summary.total_gain_loss)
    .bind(summary.total_gain_loss_percent)
    .bind(summary.day_change)
    .bind(summary.day_change_percent)
    .fetch_optional(pool)
    .await?;

    Ok(WriteOutcome::from_returning(row))
}

pub async fn list_summaries(pool: &PgPool, scope: &ReadScope) -> anyhow::Result<Vec<PortfolioSummary>> {
    let rows = sqlx::query_as::<_, PortfolioSummary>(
        r#"
        SELECT * FROM portfolio_summary
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
