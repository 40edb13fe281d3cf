use sqlx::PgPool;

use super::ReadScope;
use crate::models::{AlertSettings, UserAlert};
use crate::relay::payload::AlertUpdatePayload;

/// Refresh the evaluation state of one alert owned by `user_id`.
///
/// Returns `false` when no row matched or nothing changed. A triggered alert
/// moves to status `triggered`; `triggered_at` falls back to now.
pub async fn apply_alert_update(
    pool: &PgPool,
    user_id: &str,
    update: &AlertUpdatePayload,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE user_alerts
        SET current_value = COALESCE($3, current_value),
            triggered = $4,
            status = CASE WHEN $4 THEN 'triggered' ELSE status END,
            triggered_at = CASE
                WHEN $4 THEN COALESCE($5, triggered_at, NOW())
                ELSE triggered_at
            END
        WHERE id = $1 AND user_id = $2
          AND (current_value, triggered) IS DISTINCT FROM (COALESCE($3, current_value), $4)
        "#,
    )
    .bind(update.id)
    .bind(user_id)
    .bind(update.current_value)
    .bind(update.triggered)
    .bind(update.triggered_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Newest alerts first.
pub async fn list_alerts(pool: &PgPool, scope: &ReadScope) -> anyhow::Result<Vec<UserAlert>> {
    let rows = sqlx::query_as::<_, UserAlert>(
        r#"
        SELECT * FROM user_alerts
        WHERE ($1::text IS NULL OR user_id = $1)
        ORDER BY created_at DESC NULLS LAST, id DESC
        LIMIT $2
        "#,
    )
    .bind(&scope.user_id)
    .bind(scope.sql_limit())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn list_alert_settings(
    pool: &PgPool,
    scope: &ReadScope,
) -> anyhow::Result<Vec<AlertSettings>> {
    let rows = sqlx::query_as::<_, AlertSettings>(
        r#"
        SELECT * FROM alert_settings
        WHERE ($1::text IS NULL OR user_id = $1)
        ORDER BY updated_at DESC NULLS LAST
        LIMIT $2
        "#,
    )
    .bind(&scope.user_id)
    .bind(scope.sql_limit())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
