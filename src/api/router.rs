use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes, no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::scrape));

    // Protected API routes, Bearer token required when API_TOKEN is set
    let protected = Router::new()
        // Whales
        .route("/api/whales", get(handlers::whales::list))
        .route("/api/whales/:address", get(handlers::whales::detail))
        .route("/api/whales/:address/transactions", get(handlers::whales::transactions))
        // Transactions
        .route("/api/transactions/recent", get(handlers::transactions::recent))
        // Stats
        .route("/api/stats/activity", get(handlers::stats::activity))
        .route("/api/stats/metrics", get(handlers::stats::metrics))
        // Alerts
        .route("/api/alerts", get(handlers::alerts::list).post(handlers::alerts::create))
        .route("/api/alerts/:id", get(handlers::alerts::detail).put(handlers::alerts::update))
        .route("/api/alerts/:id/triggers", get(handlers::alerts::triggers))
        // WebSocket
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

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
