use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use resource_hub::{
    AppConfig, AppState,
    auth::AuthUser,
    error::AppError,
    handlers,
    memory::InMemoryRepository,
    models::{
        Comment, CreateBookmarkRequest, CreateCommentRequest, CreateResourceRequest, Pagination,
        ReportRequest, Resource, Role, StatusUpdateRequest, UpdateCommentRequest, User,
    },
    repository::Repository,
    storage::MockAttachmentStorage,
    workflow::ResourceStatus,
};
use std::sync::Arc;

// --- Fixtures ---

struct Fixture {
    repo: Arc<InMemoryRepository>,
    state: AppState,
    owner: User,
    other: User,
    admin: User,
}

impl Fixture {
    fn new() -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let owner = repo.insert_user("owner@example.org", "Owner", Role::Contributor);
        let other = repo.insert_user("other@example.org", "Other", Role::User);
        let admin = repo.insert_user("admin@example.org", "Admin", Role::Admin);
        let state = AppState {
            repo: repo.clone(),
            storage: Arc::new(MockAttachmentStorage::new()),
            config: AppConfig::default(),
        };
        Self {
            repo,
            state,
            owner,
            other,
            admin,
        }
    }

    fn auth(user: &User) -> AuthUser {
        AuthUser {
            id: user.id,
            roles: vec![user.role],
        }
    }

    async fn resource(&self, title: &str) -> Resource {
        self.repo
            .create_resource(self.owner.id, &resource_request(title))
            .await
            .unwrap()
    }
}

fn resource_request(title: &str) -> CreateResourceRequest {
    CreateResourceRequest {
        title: title.to_string(),
        description: "A practical guide".into(),
        organization: "Civic Lab".into(),
        contact_title: "Coordinator".into(),
        target_audience: "Organisers".into(),
        weblink: "https://example.org".into(),
        resource_types: vec!["Guide".into()],
        categories: vec!["Education".into()],
        identity_groups: vec!["Youth".into()],
        racial_spheres: vec!["Interpersonal".into()],
        sustainable_goals: vec!["4".into()],
        year_initiated: Some(2024),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        end_date: None,
        attachment_key: "resources/6a1f1c0e-8d7b-4b55-9a53-2c4a0f1e9b11.pdf".into(),
    }
}

// --- Resources ---

#[tokio::test]
async fn created_resource_starts_pending() {
    let fx = Fixture::new();
    let (status, Json(resource)) = handlers::create_resource(
        Fixture::auth(&fx.owner),
        State(fx.state.clone()),
        Json(resource_request("Toolkit")),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resource.status, ResourceStatus::Pending);
    assert_eq!(resource.user_id, fx.owner.id);
    assert_eq!((resource.views, resource.likes), (0, 0));
}

#[tokio::test]
async fn invalid_resource_is_rejected_with_field_errors() {
    let fx = Fixture::new();
    let mut request = resource_request("");
    request.categories.clear();

    let err = handlers::create_resource(
        Fixture::auth(&fx.owner),
        State(fx.state.clone()),
        Json(request),
    )
    .await
    .unwrap_err();

    match err {
        AppError::Validation(errors) => {
            assert!(errors.contains("title"));
            assert!(errors.contains("categories"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(fx.repo.count_user_resources(fx.owner.id).await.unwrap(), 0);
}

#[tokio::test]
async fn listing_is_paged_and_ordered_by_title() {
    let fx = Fixture::new();
    for title in ["Charlie", "Alpha", "Echo", "Bravo", "Delta"] {
        fx.resource(title).await;
    }

    let Json(page) = handlers::list_resources(
        State(fx.state.clone()),
        Query(Pagination { offset: 2, limit: 2 }),
    )
    .await
    .unwrap();

    let titles: Vec<&str> = page.resources.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Charlie", "Delta"]);
    for resource in &page.resources {
        assert_eq!(resource.author_name.as_deref(), Some("Owner"));
        assert_eq!(resource.author_email.as_deref(), Some("owner@example.org"));
    }
    assert_eq!(page.total_found, 2);
    assert_eq!(page.total_number_of_data, 5);
    assert_eq!(page.current_page, 2);
    assert_eq!(page.per_page, 2);
}

#[tokio::test]
async fn negative_offset_is_rejected() {
    let fx = Fixture::new();
    let err = handlers::list_resources(
        State(fx.state.clone()),
        Query(Pagination { offset: -1, limit: 10 }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_resource_is_not_found() {
    let fx = Fixture::new();
    let err = handlers::get_resource(State(fx.state.clone()), Path(9_999))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn views_and_likes_are_counted_per_call() {
    let fx = Fixture::new();
    let resource = fx.resource("Counted").await;

    for _ in 0..3 {
        handlers::record_resource_view(State(fx.state.clone()), Path(resource.id))
            .await
            .unwrap();
    }
    handlers::record_resource_like(State(fx.state.clone()), Path(resource.id))
        .await
        .unwrap();

    let stored = fx.repo.get_resource(resource.id).await.unwrap();
    assert_eq!(stored.views, 3);
    assert_eq!(stored.likes, 1);

    let err = handlers::record_resource_like(State(fx.state.clone()), Path(9_999))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn my_resources_and_counts() {
    let fx = Fixture::new();
    fx.resource("Mine 1").await;
    fx.resource("Mine 2").await;

    let Json(mine) = handlers::get_my_resources(Fixture::auth(&fx.owner), State(fx.state.clone()))
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);

    let Json(count) =
        handlers::count_my_resources(Fixture::auth(&fx.other), State(fx.state.clone()))
            .await
            .unwrap();
    assert_eq!(count.total, 0);
}

// --- Comments ---

#[tokio::test]
async fn detail_returns_nested_comment_threads() {
    let fx = Fixture::new();
    let resource = fx.resource("Threaded").await;

    let (_, Json(root)) = handlers::add_comment(
        Fixture::auth(&fx.other),
        State(fx.state.clone()),
        Path(resource.id),
        Json(CreateCommentRequest {
            body: "Great resource".into(),
            parent_id: None,
        }),
    )
    .await
    .unwrap();

    let (_, Json(reply)) = handlers::add_comment(
        Fixture::auth(&fx.owner),
        State(fx.state.clone()),
        Path(resource.id),
        Json(CreateCommentRequest {
            body: "Thanks!".into(),
            parent_id: Some(root.id),
        }),
    )
    .await
    .unwrap();

    let Json(detail) = handlers::get_resource(State(fx.state.clone()), Path(resource.id))
        .await
        .unwrap();

    assert_eq!(detail.resource.id, resource.id);
    assert_eq!(detail.resource.author_name.as_deref(), Some("Owner"));
    assert_eq!(
        detail.resource.author_email.as_deref(),
        Some("owner@example.org")
    );
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(detail.comments[0].comment.id, root.id);
    assert_eq!(detail.comments[0].children[0].comment.id, reply.id);
    assert_eq!(
        detail.comments[0].comment.author_name.as_deref(),
        Some("Other")
    );
}

#[tokio::test]
async fn reply_to_comment_of_another_resource_is_rejected() {
    let fx = Fixture::new();
    let first = fx.resource("First").await;
    let second = fx.resource("Second").await;
    let (_, Json(foreign)) = handlers::add_comment(
        Fixture::auth(&fx.other),
        State(fx.state.clone()),
        Path(first.id),
        Json(CreateCommentRequest {
            body: "On the first".into(),
            parent_id: None,
        }),
    )
    .await
    .unwrap();

    let err = handlers::add_comment(
        Fixture::auth(&fx.other),
        State(fx.state.clone()),
        Path(second.id),
        Json(CreateCommentRequest {
            body: "Wrong thread".into(),
            parent_id: Some(foreign.id),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn blank_comment_is_rejected() {
    let fx = Fixture::new();
    let resource = fx.resource("Quiet").await;
    let err = handlers::add_comment(
        Fixture::auth(&fx.other),
        State(fx.state.clone()),
        Path(resource.id),
        Json(CreateCommentRequest {
            body: "   ".into(),
            parent_id: None,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn only_the_author_edits_or_deletes_a_comment() {
    let fx = Fixture::new();
    let resource = fx.resource("Moderated").await;
    let (_, Json(comment)) = handlers::add_comment(
        Fixture::auth(&fx.other),
        State(fx.state.clone()),
        Path(resource.id),
        Json(CreateCommentRequest {
            body: "first draft".into(),
            parent_id: None,
        }),
    )
    .await
    .unwrap();

    // The admin is not the author either.
    for intruder in [&fx.owner, &fx.admin] {
        let err = handlers::update_comment(
            Fixture::auth(intruder),
            State(fx.state.clone()),
            Path(comment.id),
            Json(UpdateCommentRequest {
                body: "hijacked".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = handlers::delete_comment(
            Fixture::auth(intruder),
            State(fx.state.clone()),
            Path(comment.id),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    let Json(edited) = handlers::update_comment(
        Fixture::auth(&fx.other),
        State(fx.state.clone()),
        Path(comment.id),
        Json(UpdateCommentRequest {
            body: "final wording".into(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(edited.body, "final wording");

    let status = handlers::delete_comment(
        Fixture::auth(&fx.other),
        State(fx.state.clone()),
        Path(comment.id),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn replies_survive_deletion_of_their_parent() {
    let fx = Fixture::new();
    let resource = fx.resource("Orphans").await;
    let (_, Json(parent)) = handlers::add_comment(
        Fixture::auth(&fx.other),
        State(fx.state.clone()),
        Path(resource.id),
        Json(CreateCommentRequest {
            body: "parent".into(),
            parent_id: None,
        }),
    )
    .await
    .unwrap();
    handlers::add_comment(
        Fixture::auth(&fx.owner),
        State(fx.state.clone()),
        Path(resource.id),
        Json(CreateCommentRequest {
            body: "reply".into(),
            parent_id: Some(parent.id),
        }),
    )
    .await
    .unwrap();

    handlers::delete_comment(
        Fixture::auth(&fx.other),
        State(fx.state.clone()),
        Path(parent.id),
    )
    .await
    .unwrap();

    let Json(forest) =
        handlers::get_resource_comments(State(fx.state.clone()), Path(resource.id))
            .await
            .unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].comment.body, "reply");
}

#[tokio::test]
async fn comment_with_vanished_parent_is_listed_as_a_thread() {
    let fx = Fixture::new();
    let resource = fx.resource("Dangling").await;
    let stray = fx.repo.insert_comment_row(Comment {
        id: 9_000,
        resource_id: resource.id,
        user_id: fx.other.id,
        parent_id: Some(8_999),
        body: "parent row is gone".into(),
        created_at: Utc::now(),
        ..Comment::default()
    });
    let (_, Json(reply)) = handlers::add_comment(
        Fixture::auth(&fx.owner),
        State(fx.state.clone()),
        Path(resource.id),
        Json(CreateCommentRequest {
            body: "still answerable".into(),
            parent_id: Some(stray.id),
        }),
    )
    .await
    .unwrap();

    let Json(forest) =
        handlers::get_resource_comments(State(fx.state.clone()), Path(resource.id))
            .await
            .unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].comment.id, stray.id);
    assert_eq!(forest[0].comment.author_name.as_deref(), Some("Other"));
    assert_eq!(forest[0].children.len(), 1);
    assert_eq!(forest[0].children[0].comment.id, reply.id);
}

// --- Bookmarks ---

#[tokio::test]
async fn bookmarks_are_private_and_unique() {
    let fx = Fixture::new();
    let resource = fx.resource("Bookmarked").await;

    let (status, Json(bookmark)) = handlers::create_bookmark(
        Fixture::auth(&fx.other),
        State(fx.state.clone()),
        Json(CreateBookmarkRequest {
            resource_id: resource.id,
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let err = handlers::create_bookmark(
        Fixture::auth(&fx.other),
        State(fx.state.clone()),
        Json(CreateBookmarkRequest {
            resource_id: resource.id,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::CONFLICT);

    // Nobody else sees or deletes it.
    let err = handlers::get_bookmark(
        Fixture::auth(&fx.admin),
        State(fx.state.clone()),
        Path(bookmark.id),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

    let Json(listed) = handlers::list_bookmarks(Fixture::auth(&fx.admin), State(fx.state.clone()))
        .await
        .unwrap();
    assert!(listed.is_empty());

    // The owner of the resource sees it in their received count.
    let Json(received) =
        handlers::count_my_received_bookmarks(Fixture::auth(&fx.owner), State(fx.state.clone()))
            .await
            .unwrap();
    assert_eq!(received.total, 1);

    let status = handlers::delete_bookmark(
        Fixture::auth(&fx.other),
        State(fx.state.clone()),
        Path(bookmark.id),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn bookmark_of_unknown_resource_is_not_found() {
    let fx = Fixture::new();
    let err = handlers::create_bookmark(
        Fixture::auth(&fx.other),
        State(fx.state.clone()),
        Json(CreateBookmarkRequest { resource_id: 9_999 }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

// --- Reports & admin ---

#[tokio::test]
async fn report_lifecycle_is_admin_only_after_filing() {
    let fx = Fixture::new();
    let resource = fx.resource("Reported").await;
    let request = ReportRequest {
        resource_id: resource.id,
        content: "Broken link".into(),
        fullname: "Visitor".into(),
        email: "visitor@example.org".into(),
    };

    let (status, Json(report)) =
        handlers::submit_report(State(fx.state.clone()), Json(request.clone()))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let err = handlers::list_reports(Fixture::auth(&fx.owner), State(fx.state.clone()))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

    let Json(updated) = handlers::update_report(
        Fixture::auth(&fx.admin),
        State(fx.state.clone()),
        Path(report.id),
        Json(ReportRequest {
            content: "Broken link on page 2".into(),
            ..request
        }),
    )
    .await
    .unwrap();
    assert_eq!(updated.content, "Broken link on page 2");

    handlers::delete_report(
        Fixture::auth(&fx.admin),
        State(fx.state.clone()),
        Path(report.id),
    )
    .await
    .unwrap();
    let err = handlers::get_report(
        Fixture::auth(&fx.admin),
        State(fx.state.clone()),
        Path(report.id),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn incomplete_report_is_rejected() {
    let fx = Fixture::new();
    let err = handlers::submit_report(
        State(fx.state.clone()),
        Json(ReportRequest {
            resource_id: 1,
            content: String::new(),
            fullname: "Visitor".into(),
            email: "not-an-email".into(),
        }),
    )
    .await
    .unwrap_err();

    match err {
        AppError::Validation(errors) => {
            assert!(errors.contains("content"));
            assert!(errors.contains("email"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn admin_moves_resource_through_review() {
    let fx = Fixture::new();
    let resource = fx.resource("Under review").await;

    let Json(updated) = handlers::update_resource_status(
        Fixture::auth(&fx.admin),
        State(fx.state.clone()),
        Path(resource.id),
        Json(StatusUpdateRequest {
            status: "IN-REVIEW".into(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(updated.status, ResourceStatus::InReview);

    let err = handlers::update_resource_status(
        Fixture::auth(&fx.admin),
        State(fx.state.clone()),
        Path(resource.id),
        Json(StatusUpdateRequest {
            status: "ARCHIVED".into(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let err = handlers::update_resource_status(
        Fixture::auth(&fx.owner),
        State(fx.state.clone()),
        Path(resource.id),
        Json(StatusUpdateRequest {
            status: "APPROVED".into(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

    let stored = fx.repo.get_resource(resource.id).await.unwrap();
    assert_eq!(stored.status, ResourceStatus::InReview);
}

#[tokio::test]
async fn dashboard_counts_by_status() {
    let fx = Fixture::new();
    let a = fx.resource("A").await;
    fx.resource("B").await;
    fx.resource("C").await;
    fx.repo
        .update_resource_status(a.id, ResourceStatus::Approved)
        .await
        .unwrap();

    let Json(dashboard) =
        handlers::get_admin_dashboard(Fixture::auth(&fx.admin), State(fx.state.clone()))
            .await
            .unwrap();

    assert_eq!(dashboard.info.total_pending_resources, 2);
    assert_eq!(dashboard.info.total_approved_resources, 1);
    assert_eq!(dashboard.info.total_in_review_resources, 0);
    assert_eq!(dashboard.info.total_no_of_resources, 3);
    assert_eq!(dashboard.info.total_no_of_users, 3);
    assert_eq!(dashboard.recent_resources.len(), 3);
    assert_eq!(dashboard.recent_users.len(), 3);
}

#[tokio::test]
async fn admin_deletes_resource() {
    let fx = Fixture::new();
    let resource = fx.resource("Gone").await;

    let err = handlers::delete_resource(
        Fixture::auth(&fx.owner),
        State(fx.state.clone()),
        Path(resource.id),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

    let status = handlers::delete_resource(
        Fixture::auth(&fx.admin),
        State(fx.state.clone()),
        Path(resource.id),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(fx.repo.get_resource(resource.id).await.is_err());
}
