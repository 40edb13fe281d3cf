use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes: no authentication required
    let public = Router::new()
        .route("/health", get(handlers::system::health_check))
        .route("/metrics", get(handlers::system::render_metrics));

    // Protected routes: require Bearer token when API_TOKEN is set
    let protected = Router::new()
        // Trigger relays
        .route("/functions/:name", post(handlers::functions::invoke))
        // Table reads
        .route("/rest/:table", get(handlers::rest::list))
        .route("/rest/:table/latest", get(handlers::rest::latest))
        // Change channels
        .route("/realtime/:table", get(handlers::realtime::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Browser dashboards call the relays cross-origin; preflights are
    // answered here, before auth.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
