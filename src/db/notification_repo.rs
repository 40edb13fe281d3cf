use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::ReadScope;
use crate::models::UserNotification;

pub async fn insert_notification(
    pool: &PgPool,
    user_id: &str,
    title: &str,
    message: &str,
    kind: &str,
    created_at: Option<DateTime<Utc>>,
) -> anyhow::Result<UserNotification> {
    let row = sqlx::query_as::<_, UserNotification>(
        r#"
        INSERT INTO user_notifications (user_id, title, message, type, read, created_at)
        VALUES ($1, $2, $3, $4, FALSE, COALESCE($5, NOW()))
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(kind)
    .bind(created_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn list_notifications(
    pool: &PgPool,
    scope: &ReadScope,
) -> anyhow::Result<Vec<UserNotification>> {
    let rows = sqlx::query_as::<_, UserNotification>(
        r#"
        SELECT * FROM user_notifications
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
