use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Everything a signed-in user can do. The router is wrapped in the auth
/// layer by `create_router`, so every handler here receives a resolved
/// `AuthUser`. Owner checks (comment edit/delete, bookmarks) happen in the
/// handlers and the repository.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Profile ---
        .route("/me", get(handlers::get_me))
        .route("/me/resources", get(handlers::get_my_resources))
        .route("/me/resources/count", get(handlers::count_my_resources))
        // Bookmarks other users placed on my resources.
        .route("/me/bookmarks/count", get(handlers::count_my_received_bookmarks))
        // --- Submission ---
        // POST /uploads/presigned
        // Short-lived URL for uploading the attachment straight to object storage.
        .route("/uploads/presigned", post(handlers::get_presigned_url))
        // POST /resources
        // New submissions start PENDING.
        .route("/resources", post(handlers::create_resource))
        // --- Comments ---
        .route("/resources/{id}/comments", post(handlers::add_comment))
        .route(
            "/comments/{id}",
            put(handlers::update_comment).delete(handlers::delete_comment),
        )
        // --- Bookmarks ---
        .route(
            "/bookmarks",
            post(handlers::create_bookmark).get(handlers::list_bookmarks),
        )
        .route(
            "/bookmarks/{id}",
            get(handlers::get_bookmark).delete(handlers::delete_bookmark),
        )
}
