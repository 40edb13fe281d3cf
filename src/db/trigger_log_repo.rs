use sqlx::PgPool;

use super::ReadScope;
use crate::models::TriggerLog;

/// One audit row per successful relay invocation.
pub struct NewTriggerLog<'a> {
    pub user_id: &'a str,
    pub trigger_type: &'a str,
    pub symbols: Option<&'a [String]>,
    pub status: &'a str,
    pub response_data: &'a serde_json::Value,
}

pub async fn insert_trigger_log(pool: &PgPool, log: &NewTriggerLog<'_>) -> anyhow::Result<TriggerLog> {
    let row = sqlx::query_as::<_, TriggerLog>(
        r#"
        INSERT INTO trigger_logs (user_id, trigger_type, symbols, status, response_data, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        RETURNING *
        "#,
    )
    .bind(log.user_id)
    .bind(log.trigger_type)
    .bind(log.symbols)
    .bind(log.status)
    .bind(log.response_data)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn list_trigger_logs(pool: &PgPool, scope: &ReadScope) -> anyhow::Result<Vec<TriggerLog>> {
    let rows = sqlx::query_as::<_, TriggerLog>(
        r#"
        SELECT * FROM trigger_logs
        WHERE ($1::text IS NULL OR user_id = $1)
        ORDER BY created_at DESC NULLS LAST
        LIMIT $2
        "#,
    )
    .bind(&scope.user_id)
    .bind(scope.sql_limit())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
