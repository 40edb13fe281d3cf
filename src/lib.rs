pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod present;
pub mod realtime;
pub mod relay;
pub mod sync;

use crate::config::AppConfig;
use crate::realtime::Changefeed;
use crate::relay::webhook::WebhookClient;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: AppConfig,
    pub webhook: WebhookClient,
    pub changes: Changefeed,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl AppState {
    pub fn new(
        db: sqlx::PgPool,
        config: AppConfig,
        metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    ) -> Self {
        let changes = Changefeed::new(config.changefeed_capacity);
        Self {
            db,
            config,
            webhook: WebhookClient::new(),
            changes,
            metrics_handle,
        }
    }
}
