//! Terminal dashboard: mounts the dashboard hook against a running
//! stockdash server and prints the market overview whenever it changes.

use std::sync::Arc;

use tokio::time::{interval, Duration};

use stockdash::config::ClientConfig;
use stockdash::present::views::{self, live_indicator, prediction_views, StockRow};
use stockdash::present::{fallback, format, LiveStatus};
use stockdash::sync::domains::{DashboardData, DashboardHook};
use stockdash::sync::{AppSettingsStore, Backend, HookState, HttpBackend};

const TOP_N: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = ClientConfig::from_env();
    let settings = AppSettingsStore::open_default();
    let refresh_secs = settings.settings().refresh_interval.max(1);
    tracing::info!(
        api_url = %config.api_url,
        user = config.user_id.as_deref().unwrap_or("anonymous"),
        refresh_secs,
        "Starting dashboard watch"
    );

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(config));
    let mut hook = DashboardHook::new(backend);
    let mut changes = hook.watch();

    if let Err(e) = hook.mount().await {
        tracing::warn!(error = %e, "Initial dashboard sync failed, showing fallback data");
    }
    render(&hook.state(), &settings);

    let mut ticker = interval(Duration::from_secs(refresh_secs));
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = hook.refetch().await {
                    tracing::warn!(error = %e, "Periodic refresh failed");
                }
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = changes.borrow_and_update().clone();
                render(&state, &settings);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    hook.unmount();
    Ok(())
}

fn render(state: &HookState<DashboardData>, settings: &AppSettingsStore) {
    // Still loading: leave the last frame on screen.
    if state.loading {
        return;
    }

    let live = state.data.as_ref().map(|s| &s.data);
    let status = LiveStatus::from_state(state.loading, live.is_some() && state.error.is_none());
    let last_updated = state.data.as_ref().map(|s| s.last_updated);

    let rows: Option<Vec<StockRow>> = live.map(|d| d.stocks.iter().map(StockRow::from).collect());
    let gainers = fallback::prefer_live(
        rows.as_ref().map(|r| views::top_gainers(r, TOP_N)),
        fallback::top_gainers,
    );
    let losers = fallback::prefer_live(
        rows.as_ref().map(|r| views::top_losers(r, TOP_N)),
        fallback::top_losers,
    );
    let predictions = fallback::prefer_live(
        live.map(|d| prediction_views(&d.predictions, &d.stocks)),
        fallback::predictions,
    );

    println!();
    println!("== Market overview  [{}] ==", live_indicator(status, last_updated));
    if let Some(at) = last_updated {
        println!("as of {}", settings.format_date(&at));
    }
    if let Some(error) = &state.error {
        println!("! {error}");
    }

    println!("-- Top gainers");
    for (i, row) in gainers.iter().enumerate() {
        println!("{:>2}. {:<8} {:<28} {}", i + 1, row.symbol, row.name, row.price_line());
    }
    println!("-- Top losers");
    for (i, row) in losers.iter().enumerate() {
        println!("{:>2}. {:<8} {:<28} {}", i + 1, row.symbol, row.name, row.price_line());
    }

    println!("-- AI predictions");
    for p in &predictions {
        println!(
            "{:<8} {:<4} {:>5}%  target {}  current {}  potential {}",
            p.symbol,
            p.direction.as_str(),
            p.confidence.round_dp(0).to_string(),
            format::price(p.target_price),
            format::price(p.current_price),
            p.potential_label(),
        );
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
