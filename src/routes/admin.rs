use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, put},
};

/// Admin Router Module
///
/// Moderation endpoints, nested under `/admin`. The router sits behind the
/// auth layer; each handler additionally rejects callers without the `ADMIN`
/// role with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/dashboard
        // Per-status counts, totals and the ten most recent resources and users.
        .route("/dashboard", get(handlers::get_admin_dashboard))
        // PUT /admin/resources/{id}/status
        // The review workflow: any of PENDING, IN-REVIEW, REJECTED, APPROVED.
        .route("/resources/{id}/status", put(handlers::update_resource_status))
        .route("/resources/{id}", delete(handlers::delete_resource))
        // --- Reports ---
        .route("/reports", get(handlers::list_reports))
        .route(
            "/reports/{id}",
            get(handlers::get_report)
                .put(handlers::update_report)
                .delete(handlers::delete_report),
        )
}
