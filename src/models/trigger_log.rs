use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Append-only audit record of one relay invocation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TriggerLog {
    pub id: Uuid,
    pub user_id: String,
    pub trigger_type: String,
    pub symbols: Option<Vec<String>>,
    pub status: String,
    pub response_data: serde_json::Value,
    pub created_at: Option<DateTime<Utc>>,
}
