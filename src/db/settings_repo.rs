//! The four per-user settings tables. Writes are partial patches: a `None`
//! field keeps the stored value, or the column default for a new user.

use sqlx::PgPool;

use super::{ReadScope, WriteOutcome};
use crate::models::{ApiSettings, NotificationSettings, SecuritySettings, UserSettings};
use crate::relay::payload::{
    ApiSettingsPatch, NotificationSettingsPatch, SecuritySettingsPatch, UserSettingsPatch,
};

pub async fn upsert_user_settings(
    pool: &PgPool,
    user_id: &str,
    patch: &UserSettingsPatch,
) -> anyhow::Result<WriteOutcome> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO user_settings (user_id, name, email, timezone, currency, language, updated_at)
        VALUES ($1, COALESCE($2, ''), COALESCE($3, ''), COALESCE($4, 'UTC'),
                COALESCE($5, 'USD'), COALESCE($6, 'en'), NOW())
        ON CONFLICT (user_id) DO UPDATE
            SET name = COALESCE($2, user_settings.name),
                email = COALESCE($3, user_settings.email),
                timezone = COALESCE($4, user_settings.timezone),
                currency = COALESCE($5, user_settings.currency),
                language = COALESCE($6, user_settings.language),
                updated_at = NOW()
            WHERE (user_settings.name, user_settings.email, user_settings.timezone,
                   user_settings.currency, user_settings.language)
                IS DISTINCT FROM
                  (COALESCE($2, user_settings.name), COALESCE($3, user_settings.email),
                   COALESCE($4, user_settings.timezone), COALESCE($5, user_settings.currency),
                   COALESCE($6, user_settings.language))
        RETURNING (xmax = 0)
        "#,
    )
    .bind(user_id)
    .bind(&patch.name)
    .bind(&patch.email)
    .bind(&patch.timezone)
    .bind(&patch.currency)
    .bind(&patch.language)
    .fetch_optional(pool)
    .await?;

    Ok(WriteOutcome::from_returning(row))
}

pub async fn upsert_notification_settings(
    pool: &PgPool,
    user_id: &str,
    patch: &NotificationSettingsPatch,
) -> anyhow::Result<WriteOutcome> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO notification_settings
            (user_id, email_alerts, push_notifications, sms_alerts, price_alerts,
             news_alerts, portfolio_updates, market_open, market_close, updated_at)
        VALUES ($1, COALESCE($2, TRUE), COALESCE($3, TRUE), COALESCE($4, FALSE),
                COALESCE($5, TRUE), COALESCE($6, FALSE), COALESCE($7, TRUE),
                COALESCE($8, FALSE), COALESCE($9, FALSE), NOW())
        ON CONFLICT (user_id) DO UPDATE
            SET email_alerts = COALESCE($2, notification_settings.email_alerts),
                push_notifications = COALESCE($3, notification_settings.push_notifications),
                sms_alerts = COALESCE($4, notification_settings.sms_alerts),
                price_alerts = COALESCE($5, notification_settings.price_alerts),
                news_alerts = COALESCE($6, notification_settings.news_alerts),
                portfolio_updates = COALESCE($7, notification_settings.portfolio_updates),
                market_open = COALESCE($8, notification_settings.market_open),
                market_close = COALESCE($9, notification_settings.market_close),
                updated_at = NOW()
            WHERE (notification_settings.email_alerts, notification_settings.push_notifications,
                   notification_settings.sms_alerts, notification_settings.price_alerts,
                   notification_settings.news_alerts, notification_settings.portfolio_updates,
                   notification_settings.market_open, notification_settings.market_close)
                IS DISTINCT FROM
                  (COALESCE($2, notification_settings.email_alerts),
                   COALESCE($3, notification_settings.push_notifications),
                   COALESCE($4, notification_settings.sms_alerts),
                   COALESCE($5, notification_settings.price_alerts),
                   COALESCE($6, notification_settings.news_alerts),
                   COALESCE($7, notification_settings.portfolio_updates),
                   COALESCE($8, notification_settings.market_open),
                   COALESCE($9, notification_settings.market_close))
        RETURNING (xmax = 0)
        "#,
    )
    .bind(user_id)
    .bind(patch.email_alerts)
    .bind(patch.push_notifications)
    .bind(patch.sms_alerts)
    .bind(patch.price_alerts)
    .bind(patch.news_alerts)
    .bind(patch.portfolio_updates)
    .bind(patch.market_open)
    .bind(patch.market_close)
    .fetch_optional(pool)
    .await?;

    Ok(WriteOutcome::from_returning(row))
}

pub async fn upsert_api_settings(
    pool: &PgPool,
    user_id: &str,
    patch: &ApiSettingsPatch,
) -> anyhow::Result<WriteOutcome> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO api_settings
            (user_id, webhook_url, api_key, rate_limit_enabled, max_requests_per_minute,
             enable_logging, updated_at)
        VALUES ($1, COALESCE($2, ''), COALESCE($3, ''), COALESCE($4, TRUE),
                COALESCE($5, 60), COALESCE($6, TRUE), NOW())
        ON CONFLICT (user_id) DO UPDATE
            SET webhook_url = COALESCE($2, api_settings.webhook_url),
                api_key = COALESCE($3, api_settings.api_key),
                rate_limit_enabled = COALESCE($4, api_settings.rate_limit_enabled),
                max_requests_per_minute = COALESCE($5, api_settings.max_requests_per_minute),
                enable_logging = COALESCE($6, api_settings.enable_logging),
                updated_at = NOW()
            WHERE (api_settings.webhook_url, api_settings.api_key,
                   api_settings.rate_limit_enabled, api_settings.max_requests_per_minute,
                   api_settings.enable_logging)
                IS DISTINCT FROM
                  (COALESCE($2, api_settings.webhook_url), COALESCE($3, api_settings.api_key),
                   COALESCE($4, api_settings.rate_limit_enabled),
                   COALESCE($5, api_settings.max_requests_per_minute),
                   COALESCE($6, api_settings.enable_logging))
        RETURNING (xmax = 0)
        "#,
    )
    .bind(user_id)
    .bind(&patch.webhook_url)
    .bind(&patch.api_key)
    .bind(patch.rate_limit_enabled)
    .bind(patch.max_requests_per_minute)
    .bind(patch.enable_logging)
    .fetch_optional(pool)
    .await?;

    Ok(WriteOutcome::from_returning(row))
}

pub async fn upsert_security_settings(
    pool: &PgPool,
    user_id: &str,
    patch: &SecuritySettingsPatch,
) -> anyhow::Result<WriteOutcome> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO security_settings
            (user_id, two_factor_enabled, session_timeout, login_notifications,
             device_tracking, updated_at)
        VALUES ($1, COALESCE($2, FALSE), COALESCE($3, 30), COALESCE($4, TRUE),
                COALESCE($5, FALSE), NOW())
        ON CONFLICT (user_id) DO UPDATE
            SET two_factor_enabled = COALESCE($2, security_settings.two_factor_enabled),
                session_timeout = COALESCE($3, security_settings.session_timeout),
                login_notifications = COALESCE($4, security_settings.login_notifications),
                device_tracking = COALESCE($5, security_settings.device_tracking),
                updated_at = NOW()
            WHERE (security_settings.two_factor_enabled, security_settings.session_timeout,
                   security_settings.login_notifications, security_settings.device_tracking)
                IS DISTINCT FROM
                  (COALESCE($2, security_settings.two_factor_enabled),
                   COALESCE($3, security_settings.session_timeout),
                   COALESCE($4, security_settings.login_notifications),
                   COALESCE($5, security_settings.device_tracking))
        RETURNING (xmax = 0)
        "#,
    )
    .bind(user_id)
    .bind(patch.two_factor_enabled)
    .bind(patch.session_timeout)
    .bind(patch.login_notifications)
    .bind(patch.device_tracking)
    .fetch_optional(pool)
    .await?;

    Ok(WriteOutcome::from_returning(row))
}

pub async fn list_user_settings(pool: &PgPool, scope: &ReadScope) -> anyhow::Result<Vec<UserSettings>> {
    let rows = sqlx::query_as::<_, UserSettings>(
        r#"
        SELECT * FROM user_settings
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

pub async fn list_notification_settings(
    pool: &PgPool,
    scope: &ReadScope,
) -> anyhow::Result<Vec<NotificationSettings>> {
    let rows = sqlx::query_as::<_, NotificationSettings>(
        r#"
        SELECT * FROM notification_settings
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

pub async fn list_api_settings(pool: &PgPool, scope: &ReadScope) -> anyhow::Result<Vec<ApiSettings>> {
    let rows = sqlx::query_as::<_, ApiSettings>(
        r#"
        SELECT * FROM api_settings
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

pub async fn list_security_settings(
    pool: &PgPool,
    scope: &ReadScope,
) -> anyhow::Result<Vec<SecuritySettings>> {
    let rows = sqlx::query_as::<_, SecuritySettings>(
        r#"
        SELECT * FROM security_settings
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
