use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: browsing resources and their
/// comment threads, counting views and likes, and filing reports.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /resources?offset=..&limit=..
        // Paginated listing ordered by title.
        .route("/resources", get(handlers::list_resources))
        // GET /resources/{id}
        // Resource detail together with its comment forest.
        .route("/resources/{id}", get(handlers::get_resource))
        .route("/resources/{id}/comments", get(handlers::get_resource_comments))
        // POST /resources/{id}/views, /likes
        // One increment per call, no deduplication.
        .route("/resources/{id}/views", post(handlers::record_resource_view))
        .route("/resources/{id}/likes", post(handlers::record_resource_like))
        // POST /reports
        .route("/reports", post(handlers::submit_report))
}
