use sqlx::PgPool;

use super::{ReadScope, WriteOutcome};
use crate::models::{ModelPerformance, Prediction};
use crate::relay::payload::{ModelPerformancePayload, PredictionPayload};

/// Upsert the latest call for `symbol`. A changed call restamps `created_at`,
/// so "newest first" orders by when the call was last revised.
pub async fn upsert_prediction(
    pool: &PgPool,
    symbol: &str,
    prediction: &PredictionPayload,
) -> anyhow::Result<WriteOutcome> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO predictions
            (symbol, direction, confidence, target_price, timeframe, model, factors, accuracy, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
        ON CONFLICT (symbol) DO UPDATE
            SET direction = EXCLUDED.direction,
                confidence = EXCLUDED.confidence,
                target_price = EXCLUDED.target_price,
                timeframe = EXCLUDED.timeframe,
                model = EXCLUDED.model,
                factors = EXCLUDED.factors,
                accuracy = EXCLUDED.accuracy,
                created_at = NOW(),
                updated_at = NOW()
            WHERE (predictions.direction, predictions.confidence, predictions.target_price,
                   predictions.timeframe, predictions.model, predictions.factors, predictions.accuracy)
                IS DISTINCT FROM
                  (EXCLUDED.direction, EXCLUDED.confidence, EXCLUDED.target_price,
                   EXCLUDED.timeframe, EXCLUDED.model, EXCLUDED.factors, EXCLUDED.accuracy)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(symbol)
    .bind(prediction.direction.as_str())
    .bind(prediction.confidence)
    .bind(prediction.target_price)
    .bind(&prediction.timeframe)
    .bind(&prediction.model)
    .bind(&prediction.factors)
    .bind(prediction.accuracy)
    .fetch_optional(pool)
    .await?;

    Ok(WriteOutcome::from_returning(row))
}

/// Newest predictions first.
pub async fn list_predictions(pool: &PgPool, scope: &ReadScope) -> anyhow::Result<Vec<Prediction>> {
    let rows = sqlx::query_as::<_, Prediction>(
        "SELECT * FROM predictions ORDER BY created_at DESC NULLS LAST, symbol LIMIT $1",
    )
    .bind(scope.sql_limit())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn upsert_model_performance(
    pool: &PgPool,
    model: &ModelPerformancePayload,
) -> anyhow::Result<WriteOutcome> {
    let row: Option<(bool,)> = sqlx::query_as(
        r#"
        INSERT INTO model_performance (model_name, accuracy, total_predictions, last_updated)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (model_name) DO UPDATE
            SET accuracy = EXCLUDED.accuracy,
                total_predictions = EXCLUDED.total_predictions,
                last_updated = NOW()
            WHERE (model_performance.accuracy, model_performance.total_predictions)
                IS DISTINCT FROM (EXCLUDED.accuracy, EXCLUDED.total_predictions)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(&model.model)
    .bind(model.accuracy)
    .bind(model.predictions)
    .fetch_optional(pool)
    .await?;

    Ok(WriteOutcome::from_returning(row))
}

/// Most accurate model first.
pub async fn list_model_performance(
    pool: &PgPool,
    scope: &ReadScope,
) -> anyhow::Result<Vec<ModelPerformance>> {
    let rows = sqlx::query_as::<_, ModelPerformance>(
        "SELECT * FROM model_performance ORDER BY accuracy DESC, model_name LIMIT $1",
    )
    .bind(scope.sql_limit())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
