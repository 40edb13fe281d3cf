use sqlx::PgPool;

use super::ReadScope;
use crate::models::WatchlistRow;

/// Watched symbols, newest first, each joined with its latest `stocks`
/// snapshot. Symbols without a snapshot keep `None` market fields.
pub async fn list_watchlist(pool: &PgPool, scope: &ReadScope) -> anyhow::Result<Vec<WatchlistRow>> {
    let rows = sqlx::query_as::<_, WatchlistRow>(
        r#"
        SELECT w.user_id, w.symbol, w.added_at,
               s.name, s.price, s.change, s.change_percent, s.volume, s.market_cap
        FROM user_watchlist w
        LEFT JOIN stocks s ON s.symbol = w.symbol
        WHERE ($1::text IS NULL OR w.user_id = $1)
        ORDER BY w.added_at DESC, w.symbol
        LIMIT $2
        "#,
    )
    .bind(&scope.user_id)
    .bind(scope.sql_limit())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Add a symbol to a user's watchlist; adding it twice is a no-op.
pub async fn add_symbol(pool: &PgPool, user_id: &str, symbol: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "INSERT INTO user_watchlist (user_id, symbol) VALUES ($1, $2) ON CONFLICT (user_id, symbol) DO NOTHING",
    )
    .bind(user_id)
    .bind(symbol)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
