use std::collections::HashMap;
use std::env;

use crate::relay::domain::TriggerDomain;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// External webhook URL per relay domain. A missing entry only disables
/// that domain's endpoint.
#[derive(Debug, Clone, Default)]
pub struct WebhookUrls {
    urls: HashMap<TriggerDomain, String>,
}

impl WebhookUrls {
    pub fn from_env() -> Self {
        let urls = TriggerDomain::ALL
            .into_iter()
            .filter_map(|domain| {
                env::var(domain.env_var())
                    .ok()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .map(|v| (domain, v))
            })
            .collect();
        Self { urls }
    }

    pub fn with(mut self, domain: TriggerDomain, url: impl Into<String>) -> Self {
        self.urls.insert(domain, url.into());
        self
    }

    pub fn get(&self, domain: TriggerDomain) -> Option<&str> {
        self.urls.get(&domain).map(String::as_str)
    }

    pub fn configured(&self) -> Vec<TriggerDomain> {
        TriggerDomain::ALL
            .into_iter()
            .filter(|d| self.urls.contains_key(d))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    /// Bearer token for `/functions`, `/rest` and `/realtime`. Empty = auth disabled.
    pub api_token: Option<String>,

    pub webhooks: WebhookUrls,
    pub changefeed_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            api_token: env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),
            webhooks: WebhookUrls::from_env(),
            changefeed_capacity: env::var("CHANGEFEED_CAPACITY")
                .unwrap_or_else(|_| "256".into())
                .parse()
                .unwrap_or(256),
        })
    }
}

/// Settings for the sync client side.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    /// Signed-in identity; `None` means anonymous.
    pub user_id: Option<String>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: env::var("STOCKDASH_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_API_URL.into()),
            api_token: env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),
            user_id: env::var("STOCKDASH_USER_ID").ok().filter(|u| !u.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_urls_lookup() {
        let urls = WebhookUrls::default()
            .with(TriggerDomain::Dashboard, "http://hooks.local/dashboard");

        assert_eq!(
            urls.get(TriggerDomain::Dashboard),
            Some("http://hooks.local/dashboard")
        );
        assert_eq!(urls.get(TriggerDomain::Analytics), None);
        assert_eq!(urls.configured(), vec![TriggerDomain::Dashboard]);
    }
}
