use stockdash::api::router::create_router;
use stockdash::config::AppConfig;
use stockdash::{db, metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Connecting to database...");
    let db = db::init_pool(&config.database_url).await?;
    db::run_migrations(&db).await?;
    tracing::info!("Database connected, migrations applied");

    let configured = config.webhooks.configured();
    if configured.is_empty() {
        tracing::warn!("No webhook URL configured; every trigger endpoint will answer 500");
    } else {
        tracing::info!(domains = ?configured, "Trigger webhooks configured");
    }
    if config.api_token.is_none() {
        tracing::warn!("API_TOKEN not set; authentication disabled");
    }

    let metrics_handle = metrics::init_metrics();
    let state = AppState::new(db, config, metrics_handle);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();
}
