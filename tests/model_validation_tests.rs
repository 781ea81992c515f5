use axum::{http::StatusCode, response::IntoResponse};
use chrono::NaiveDate;
use resource_hub::{
    error::{AppError, ValidationErrors},
    models::{
        Comment, CommentNode, CreateCommentRequest, CreateResourceRequest, Pagination,
        ReportRequest, Resource, ResourcePage, Role,
    },
    workflow::ResourceStatus,
};

// --- Test Utilities ---

fn complete_request() -> CreateResourceRequest {
    CreateResourceRequest {
        title: "Toolkit".into(),
        description: "A practical guide".into(),
        organization: "Community Org".into(),
        contact_title: "Coordinator".into(),
        target_audience: "Educators".into(),
        weblink: "https://example.org/toolkit".into(),
        resource_types: vec!["Guide".into()],
        categories: vec!["Education".into()],
        identity_groups: vec!["Youth".into()],
        racial_spheres: vec!["Institutional".into()],
        sustainable_goals: vec!["4".into()],
        attachment_key: "resources/0b5ad8a4-2f0b-4c35-9d0a-1f5b6f3c7e21.pdf".into(),
        ..CreateResourceRequest::default()
    }
}

async fn error_json(error: AppError) -> (StatusCode, serde_json::Value) {
    let response = error.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// --- Serialization shape ---

#[test]
fn resource_status_uses_stored_labels() {
    let resource = Resource {
        status: ResourceStatus::InReview,
        ..Resource::default()
    };
    let json = serde_json::to_value(&resource).unwrap();
    assert_eq!(json["status"], "IN-REVIEW");
    assert_eq!(json["views"], 0);
    assert!(json["attachment_key"].is_null());
}

#[test]
fn roles_are_upper_case() {
    assert_eq!(serde_json::to_value(Role::Contributor).unwrap(), "CONTRIBUTOR");
    let role: Role = serde_json::from_value("ADMIN".into()).unwrap();
    assert_eq!(role, Role::Admin);
    assert!("admin".parse::<Role>().is_err());
}

#[test]
fn resource_page_field_names() {
    let page = ResourcePage {
        resources: vec![Resource::default()],
        total_found: 1,
        total_number_of_data: 12,
        current_page: 2,
        per_page: 10,
    };
    let json = serde_json::to_value(&page).unwrap();
    for key in [
        "resources",
        "total_found",
        "total_number_of_data",
        "current_page",
        "per_page",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
}

#[test]
fn comment_node_flattens_comment_and_nests_replies() {
    let reply = Comment {
        id: 2,
        resource_id: 1,
        user_id: 7,
        parent_id: Some(1),
        body: "Agreed".into(),
        ..Comment::default()
    };
    let root = Comment {
        id: 1,
        resource_id: 1,
        user_id: 7,
        body: "Useful".into(),
        author_name: Some("Sam".into()),
        ..Comment::default()
    };
    let node = CommentNode::new(root, vec![CommentNode::new(reply, vec![])]);

    let json = serde_json::to_value(&node).unwrap();
    assert_eq!(json["id"], 1);
    assert_eq!(json["author_name"], "Sam");
    assert!(json.get("children").is_none());
    assert_eq!(json["replies"][0]["parent_id"], 1);
    assert_eq!(json["replies"][0]["replies"], serde_json::json!([]));
}

#[test]
fn comment_request_parent_is_optional() {
    let request: CreateCommentRequest = serde_json::from_str(r#"{"body":"hi"}"#).unwrap();
    assert_eq!(request.parent_id, None);
}

// --- Validation ---

#[test]
fn complete_resource_request_is_valid() {
    assert!(complete_request().validate().is_ok());
}

#[test]
fn each_empty_list_is_reported_on_its_own_field() {
    let request = CreateResourceRequest {
        categories: vec![],
        racial_spheres: vec!["  ".into()],
        ..complete_request()
    };
    let errors = request.validate().unwrap_err();
    assert!(errors.contains("categories"));
    assert!(errors.contains("racial_spheres"));
    assert!(!errors.contains("resource_types"));
    assert!(!errors.contains("identity_groups"));
}

#[test]
fn end_date_before_start_date_is_invalid() {
    let request = CreateResourceRequest {
        start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
        end_date: NaiveDate::from_ymd_opt(2024, 5, 31),
        ..complete_request()
    };
    assert!(request.validate().unwrap_err().contains("end_date"));
}

#[test]
fn foreign_attachment_key_is_invalid() {
    let request = CreateResourceRequest {
        attachment_key: "uploads/../../secret.pdf".into(),
        ..complete_request()
    };
    assert!(request.validate().unwrap_err().contains("attachment_key"));
}

#[test]
fn report_request_checks_email_shape() {
    let report = ReportRequest {
        resource_id: 3,
        content: "Broken link".into(),
        fullname: "Pat".into(),
        email: "not-an-email".into(),
    };
    let errors = report.validate().unwrap_err();
    assert_eq!(errors.0.len(), 1);
    assert!(errors.contains("email"));
}

#[test]
fn pagination_defaults_and_bounds() {
    let page: Pagination = serde_json::from_str("{}").unwrap();
    assert_eq!((page.offset, page.limit), (0, 10));
    assert_eq!(page.current_page(), 1);

    let invalid = Pagination {
        offset: -1,
        limit: 0,
    };
    let errors = invalid.validate().unwrap_err();
    assert!(errors.contains("offset"));
    assert!(errors.contains("limit"));
}

// --- Error responses ---

#[tokio::test]
async fn validation_error_body_lists_fields() {
    let mut errors = ValidationErrors::default();
    errors.add("title", "Resource Title is required.");

    let (status, body) = error_json(AppError::Validation(errors)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "error");
    assert_eq!(body["errors"]["title"], "Resource Title is required.");
}

#[tokio::test]
async fn invalid_status_is_bad_request_without_field_errors() {
    let (status, body) = error_json(AppError::InvalidStatus("ARCHIVED".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("ARCHIVED"));
    assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn not_found_and_conflict_statuses() {
    let (status, _) = error_json(AppError::NotFound).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = error_json(AppError::Conflict).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = error_json(AppError::Forbidden).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
