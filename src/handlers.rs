use crate::{
    AppState,
    auth::AuthUser,
    comment_tree::build_comment_tree,
    error::{AppError, ErrorBody, RepoError, ValidationErrors},
    models::{
        AdminDashboard, Bookmark, Comment, CommentNode, CountResponse, CreateBookmarkRequest,
        CreateCommentRequest, CreateResourceRequest, Pagination, PresignedUrlRequest,
        PresignedUrlResponse, Report, ReportRequest, Resource, ResourceDetail, ResourcePage,
        StatusMessage, StatusUpdateRequest, UpdateCommentRequest, User,
    },
    storage,
    workflow,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn require_body(body: &str) -> Result<String, AppError> {
    let body = body.trim();
    if body.is_empty() {
        let mut errors = ValidationErrors::default();
        errors.add("body", "Comment body is required.");
        return Err(errors.into());
    }
    Ok(body.to_string())
}

// --- Public ---

/// list_resources
///
/// [Public Route] One page of resources ordered by title.
#[utoipa::path(
    get,
    path = "/resources",
    params(Pagination),
    responses(
        (status = 200, description = "Resource page", body = ResourcePage),
        (status = 422, description = "Invalid offset or limit", body = ErrorBody)
    )
)]
pub async fn list_resources(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<ResourcePage>, AppError> {
    page.validate()?;
    let (resources, total) = state.repo.list_resources(page.offset, page.limit).await?;
    Ok(Json(ResourcePage {
        total_found: resources.len(),
        resources,
        total_number_of_data: total,
        current_page: page.current_page(),
        per_page: page.limit,
    }))
}

/// get_resource
///
/// [Public Route] A resource with its comment threads.
#[utoipa::path(
    get,
    path = "/resources/{id}",
    params(("id" = i64, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Found", body = ResourceDetail),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ResourceDetail>, AppError> {
    let resource = state.repo.get_resource(id).await?;
    let comments = state.repo.fetch_comments_for_resource(id).await?;
    Ok(Json(ResourceDetail {
        resource,
        comments: build_comment_tree(comments),
    }))
}

/// get_resource_comments
///
/// [Public Route] The comment forest of a resource, replies nested under
/// their parents in creation order.
#[utoipa::path(
    get,
    path = "/resources/{id}/comments",
    params(("id" = i64, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Comment threads", body = [CommentNode]),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_resource_comments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CommentNode>>, AppError> {
    // Distinguishes "no comments" from "no such resource".
    state.repo.get_resource(id).await?;
    let comments = state.repo.fetch_comments_for_resource(id).await?;
    Ok(Json(build_comment_tree(comments)))
}

/// record_resource_view
///
/// [Public Route] Counts one view. Every call counts; there is no deduplication.
#[utoipa::path(
    post,
    path = "/resources/{id}/views",
    params(("id" = i64, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Counted", body = StatusMessage),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn record_resource_view(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StatusMessage>, AppError> {
    workflow::record_view(state.repo.as_ref(), id).await?;
    Ok(Json(StatusMessage::success("View recorded")))
}

/// record_resource_like
///
/// [Public Route] Counts one like.
#[utoipa::path(
    post,
    path = "/resources/{id}/likes",
    params(("id" = i64, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Counted", body = StatusMessage),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn record_resource_like(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StatusMessage>, AppError> {
    workflow::record_like(state.repo.as_ref(), id).await?;
    Ok(Json(StatusMessage::success("Like recorded")))
}

/// submit_report
///
/// [Public Route] Files a problem report about a resource. No account needed.
#[utoipa::path(
    post,
    path = "/reports",
    request_body = ReportRequest,
    responses(
        (status = 201, description = "Filed", body = Report),
        (status = 404, description = "Resource not found", body = ErrorBody),
        (status = 422, description = "Missing fields", body = ErrorBody)
    )
)]
pub async fn submit_report(
    State(state): State<AppState>,
    Json(payload): Json<ReportRequest>,
) -> Result<(StatusCode, Json<Report>), AppError> {
    payload.validate()?;
    state.repo.get_resource(payload.resource_id).await?;
    let report = state.repo.create_report(&payload).await?;
    tracing::info!(report_id = report.id, resource_id = report.resource_id, "report filed");
    Ok((StatusCode::CREATED, Json(report)))
}

// --- Authenticated ---

/// get_me
///
/// [Authenticated Route] The caller's account.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.repo.get_user(id).await?))
}

/// get_my_resources
///
/// [Authenticated Route] Everything the caller submitted, whatever its review state.
#[utoipa::path(
    get,
    path = "/me/resources",
    responses((status = 200, description = "My resources", body = [Resource]))
)]
pub async fn get_my_resources(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Resource>>, AppError> {
    Ok(Json(state.repo.get_user_resources(id).await?))
}

#[utoipa::path(
    get,
    path = "/me/resources/count",
    responses((status = 200, description = "Number of my resources", body = CountResponse))
)]
pub async fn count_my_resources(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CountResponse>, AppError> {
    let total = state.repo.count_user_resources(id).await?;
    Ok(Json(CountResponse { total }))
}

/// count_my_received_bookmarks
///
/// [Authenticated Route] How many times the caller's resources were bookmarked.
#[utoipa::path(
    get,
    path = "/me/bookmarks/count",
    responses((status = 200, description = "Bookmarks on my resources", body = CountResponse))
)]
pub async fn count_my_received_bookmarks(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CountResponse>, AppError> {
    let total = state.repo.count_bookmarks_on_user_resources(id).await?;
    Ok(Json(CountResponse { total }))
}

/// create_resource
///
/// [Authenticated Route] Submits a resource for review. It always starts
/// `PENDING`; the submitter is taken from the session.
#[utoipa::path(
    post,
    path = "/resources",
    request_body = CreateResourceRequest,
    responses(
        (status = 201, description = "Created", body = Resource),
        (status = 422, description = "Validation failed", body = ErrorBody)
    )
)]
pub async fn create_resource(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<Resource>), AppError> {
    payload.validate()?;
    let resource = state.repo.create_resource(id, &payload).await?;
    tracing::info!(resource_id = resource.id, user_id = id, "resource submitted");
    Ok((StatusCode::CREATED, Json(resource)))
}

/// get_presigned_url
///
/// [Authenticated Route] Hands out a short-lived upload URL for a resource
/// attachment. Only PDF, DOCX and CSV files are accepted; the object key is a
/// fresh UUID and never contains the client filename.
#[utoipa::path(
    post,
    path = "/uploads/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 422, description = "File type not allowed", body = ErrorBody),
        (status = 502, description = "Storage unavailable", body = ErrorBody)
    )
)]
pub async fn get_presigned_url(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    let mut errors = ValidationErrors::default();
    if payload.file_type.trim().is_empty() {
        errors.add("file_type", "File type is required.");
    }
    let key = match storage::attachment_key_for(&payload.filename) {
        Some(key) => key,
        None => {
            errors.add("filename", "Only PDF, DOCX and CSV files are allowed.");
            String::new()
        }
    };
    errors.into_result()?;

    let upload_url = state
        .storage
        .presign_upload(&key, payload.file_type.trim())
        .await
        .map_err(AppError::Storage)?;

    tracing::debug!(user_id, key = %key, "issued attachment upload url");
    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: key,
    }))
}

/// add_comment
///
/// [Authenticated Route] Comments on a resource, or replies when `parent_id`
/// is set. The parent must be a comment of the same resource.
#[utoipa::path(
    post,
    path = "/resources/{id}/comments",
    params(("id" = i64, Path, description = "Resource ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment Added", body = Comment),
        (status = 404, description = "Resource not found", body = ErrorBody),
        (status = 422, description = "Empty body or foreign parent", body = ErrorBody)
    )
)]
pub async fn add_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(resource_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let body = require_body(&payload.body)?;
    state.repo.get_resource(resource_id).await?;

    if let Some(parent_id) = payload.parent_id {
        let same_resource = match state.repo.get_comment(parent_id).await {
            Ok(parent) => parent.resource_id == resource_id,
            Err(RepoError::NotFound) => false,
            Err(e) => return Err(e.into()),
        };
        if !same_resource {
            let mut errors = ValidationErrors::default();
            errors.add("parent_id", "Parent comment does not belong to this resource.");
            return Err(errors.into());
        }
    }

    let comment = state
        .repo
        .add_comment(resource_id, user_id, payload.parent_id, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// update_comment
///
/// [Authenticated Route] Edits the body of the caller's own comment.
#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let body = require_body(&payload.body)?;
    let existing = state.repo.get_comment(id).await?;
    if existing.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(Json(state.repo.update_comment(id, user_id, &body).await?))
}

/// delete_comment
///
/// [Authenticated Route] Deletes the caller's own comment. Its replies stay
/// and are shown as top-level comments afterwards.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let existing = state.repo.get_comment(id).await?;
    if existing.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    state.repo.delete_comment(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// create_bookmark
///
/// [Authenticated Route] Bookmarks a resource once per user; a second attempt is 409.
#[utoipa::path(
    post,
    path = "/bookmarks",
    request_body = CreateBookmarkRequest,
    responses(
        (status = 201, description = "Bookmarked", body = Bookmark),
        (status = 404, description = "Resource not found", body = ErrorBody),
        (status = 409, description = "Already bookmarked", body = ErrorBody)
    )
)]
pub async fn create_bookmark(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateBookmarkRequest>,
) -> Result<(StatusCode, Json<Bookmark>), AppError> {
    state.repo.get_resource(payload.resource_id).await?;
    let bookmark = state
        .repo
        .create_bookmark(user_id, payload.resource_id)
        .await?;
    Ok((StatusCode::CREATED, Json(bookmark)))
}

#[utoipa::path(
    get,
    path = "/bookmarks",
    responses((status = 200, description = "My bookmarks", body = [Bookmark]))
)]
pub async fn list_bookmarks(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Bookmark>>, AppError> {
    Ok(Json(state.repo.list_bookmarks(user_id).await?))
}

/// get_bookmark
///
/// [Authenticated Route] Another user's bookmark is reported as not found.
#[utoipa::path(
    get,
    path = "/bookmarks/{id}",
    params(("id" = i64, Path, description = "Bookmark ID")),
    responses(
        (status = 200, description = "Found", body = Bookmark),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_bookmark(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Bookmark>, AppError> {
    Ok(Json(state.repo.get_bookmark(id, user_id).await?))
}

#[utoipa::path(
    delete,
    path = "/bookmarks/{id}",
    params(("id" = i64, Path, description = "Bookmark ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_bookmark(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_bookmark(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Admin ---

/// get_admin_dashboard
///
/// [Admin Route] Per-status counts, totals and the most recent resources and users.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = AdminDashboard),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn get_admin_dashboard(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboard>, AppError> {
    require_admin(&user)?;
    Ok(Json(state.repo.dashboard().await?))
}

/// update_resource_status
///
/// [Admin Route] Moves a resource to any of the four review states.
#[utoipa::path(
    put,
    path = "/admin/resources/{id}/status",
    params(("id" = i64, Path, description = "Resource ID")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Updated", body = Resource),
        (status = 400, description = "Unknown status", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_resource_status(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<Resource>, AppError> {
    require_admin(&user)?;
    workflow::set_resource_status(state.repo.as_ref(), id, &payload.status).await?;
    Ok(Json(state.repo.get_resource(id).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/resources/{id}",
    params(("id" = i64, Path, description = "Resource ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_resource(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;
    state.repo.delete_resource(id).await?;
    tracing::info!(resource_id = id, admin_id = user.id, "resource deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/admin/reports",
    responses(
        (status = 200, description = "All reports", body = [Report]),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn list_reports(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Report>>, AppError> {
    require_admin(&user)?;
    Ok(Json(state.repo.list_reports().await?))
}

#[utoipa::path(
    get,
    path = "/admin/reports/{id}",
    params(("id" = i64, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Found", body = Report),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_report(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Report>, AppError> {
    require_admin(&user)?;
    Ok(Json(state.repo.get_report(id).await?))
}

/// update_report
///
/// [Admin Route] Corrects a filed report. Same validation as filing one.
#[utoipa::path(
    put,
    path = "/admin/reports/{id}",
    params(("id" = i64, Path, description = "Report ID")),
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Updated", body = Report),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 422, description = "Missing fields", body = ErrorBody)
    )
)]
pub async fn update_report(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ReportRequest>,
) -> Result<Json<Report>, AppError> {
    require_admin(&user)?;
    payload.validate()?;
    state.repo.get_resource(payload.resource_id).await?;
    Ok(Json(state.repo.update_report(id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/reports/{id}",
    params(("id" = i64, Path, description = "Report ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_report(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    require_admin(&user)?;
    state.repo.delete_report(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
