use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserSettings {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub timezone: String,
    pub currency: String,
    pub language: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserSettings {
    /// Settings shown for a user that has no stored row yet.
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: String::new(),
            email: String::new(),
            timezone: "UTC".into(),
            currency: "USD".into(),
            language: "en".into(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NotificationSettings {
    pub user_id: String,
    pub email_alerts: bool,
    pub push_notifications: bool,
    pub sms_alerts: bool,
    pub price_alerts: bool,
    pub news_alerts: bool,
    pub portfolio_updates: bool,
    pub market_open: bool,
    pub market_close: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NotificationSettings {
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            email_alerts: true,
            push_notifications: true,
            sms_alerts: false,
            price_alerts: true,
            news_alerts: false,
            portfolio_updates: true,
            market_open: false,
            market_close: false,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ApiSettings {
    pub user_id: String,
    pub webhook_url: String,
    pub api_key: String,
    pub rate_limit_enabled: bool,
    pub max_requests_per_minute: i32,
    pub enable_logging: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ApiSettings {
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            webhook_url: String::new(),
            api_key: String::new(),
            rate_limit_enabled: true,
            max_requests_per_minute: 60,
            enable_logging: true,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SecuritySettings {
    pub user_id: String,
    pub two_factor_enabled: bool,
    /// Minutes.
    pub session_timeout: i32,
    pub login_notifications: bool,
    pub device_tracking: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SecuritySettings {
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            two_factor_enabled: false,
            session_timeout: 30,
            login_notifications: true,
            device_tracking: false,
            updated_at: None,
        }
    }
}
