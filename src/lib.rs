use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core: comment threads and the review workflow.
pub mod comment_tree;
pub mod workflow;

// Services and plumbing around the core.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod repository;
pub mod storage;

// Routing segregated by access level (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockAttachmentStorage, S3AttachmentStorage, StorageState};

/// ApiDoc
///
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_resources, handlers::get_resource, handlers::get_resource_comments,
        handlers::record_resource_view, handlers::record_resource_like, handlers::submit_report,
        handlers::get_me, handlers::get_my_resources, handlers::count_my_resources,
        handlers::count_my_received_bookmarks, handlers::create_resource,
        handlers::get_presigned_url, handlers::add_comment, handlers::update_comment,
        handlers::delete_comment, handlers::create_bookmark, handlers::list_bookmarks,
        handlers::get_bookmark, handlers::delete_bookmark, handlers::get_admin_dashboard,
        handlers::update_resource_status, handlers::delete_resource, handlers::list_reports,
        handlers::get_report, handlers::update_report, handlers::delete_report
    ),
    components(
        schemas(
            models::Role, models::User, models::Resource, models::CreateResourceRequest,
            models::StatusUpdateRequest, models::ResourcePage, models::ResourceDetail,
            models::Comment, models::CommentNode, models::CreateCommentRequest,
            models::UpdateCommentRequest, models::Bookmark, models::CreateBookmarkRequest,
            models::Report, models::ReportRequest, models::DashboardCounts,
            models::AdminDashboard, models::CountResponse, models::StatusMessage,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
            workflow::ResourceStatus, error::ErrorBody, error::ValidationErrors,
        )
    ),
    tags(
        (name = "resource-hub", description = "Community Resource Hub API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container of services and configuration, cloned into
/// every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Attachment storage (S3/MinIO, or the mock in tests).
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless `AuthUser` resolves.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routers, the auth layer and the observability layers, and
/// binds the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, correlated by the generated `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
