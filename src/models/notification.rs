use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserNotification {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub message: String,
    /// info, success, warning or error
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub read: bool,
    pub created_at: Option<DateTime<Utc>>,
}
