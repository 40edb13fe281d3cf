use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user-defined watch condition. Created by the user elsewhere; the alerts
/// relay only refreshes `current_value` / `triggered`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserAlert {
    pub id: i64,
    pub user_id: String,
    pub symbol: String,
    /// price, volume or change
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub alert_type: String,
    /// above or below
    pub condition: String,
    pub value: Decimal,
    pub current_value: Option<Decimal>,
    pub status: String,
    pub triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AlertSettings {
    pub user_id: String,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub sms_notifications: bool,
    pub sound_enabled: bool,
    pub quiet_hours_enabled: bool,
    pub quiet_hours_start: String,
    pub quiet_hours_end: String,
    pub updated_at: Option<DateTime<Utc>>,
}
