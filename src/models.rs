use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{error::ValidationErrors, workflow::ResourceStatus};

// --- Identity ---

/// Role
///
/// Account role as stored in `users.role` and carried in the token's `roles` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Contributor,
    Admin,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Contributor => "CONTRIBUTOR",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Self::User),
            "CONTRIBUTOR" => Ok(Self::Contributor),
            "ADMIN" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// User
///
/// Row of the `users` table. Accounts are provisioned by the identity provider;
/// this service only reads them (auth lookup, dashboard).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub fullname: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Resources ---

/// Resource
///
/// The content entity submitted by contributors and moderated by admins.
/// `status` follows the review workflow; `views` and `likes` only ever grow.
/// Reads carry the submitter's name and email; both are `None` once the
/// account is gone.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Resource {
    pub id: i64,
    // Submitting user.
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub organization: String,
    pub contact_title: String,
    pub target_audience: String,
    pub weblink: String,
    // Taxonomy selections, stored as TEXT[] columns.
    pub resource_types: Vec<String>,
    pub categories: Vec<String>,
    pub identity_groups: Vec<String>,
    pub racial_spheres: Vec<String>,
    pub sustainable_goals: Vec<String>,
    pub year_initiated: Option<i32>,
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDate>,
    // Object-store key of the uploaded attachment.
    pub attachment_key: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ResourceStatus,
    pub views: i64,
    pub likes: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    // Submitter, joined from `users`.
    #[sqlx(default)]
    pub author_name: Option<String>,
    #[sqlx(default)]
    pub author_email: Option<String>,
}

/// CreateResourceRequest
///
/// Payload of `POST /resources`. The attachment is uploaded beforehand through
/// `POST /uploads/presigned`; only its key is sent here. New resources always
/// start `PENDING`, whatever the client would like.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateResourceRequest {
    pub title: String,
    pub description: String,
    pub organization: String,
    pub contact_title: String,
    pub target_audience: String,
    pub weblink: String,
    #[serde(default)]
    pub resource_types: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub identity_groups: Vec<String>,
    #[serde(default)]
    pub racial_spheres: Vec<String>,
    #[serde(default)]
    pub sustainable_goals: Vec<String>,
    pub year_initiated: Option<i32>,
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDate>,
    pub attachment_key: String,
}

impl CreateResourceRequest {
    /// Collects every problem at once so the form can show them together.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let required_text = [
            ("title", &self.title, "Resource Title is required."),
            ("description", &self.description, "Resource Description is required."),
            ("organization", &self.organization, "Resource Organization is required."),
            ("contact_title", &self.contact_title, "Resource Contact Title is required."),
            ("target_audience", &self.target_audience, "Target Audience is required."),
            ("weblink", &self.weblink, "Weblink is required."),
            ("attachment_key", &self.attachment_key, "Resource Attachment is required."),
        ];
        for (field, value, message) in required_text {
            if value.trim().is_empty() {
                errors.add(field, message);
            }
        }

        let required_lists = [
            ("resource_types", &self.resource_types, "Resource Type is required."),
            ("categories", &self.categories, "Resource Category is required."),
            ("identity_groups", &self.identity_groups, "Identity Group is required."),
            ("racial_spheres", &self.racial_spheres, "Racial Sphere is required."),
            ("sustainable_goals", &self.sustainable_goals, "Sustainable Development Goal is required."),
        ];
        for (field, values, message) in required_lists {
            if values.iter().all(|value| value.trim().is_empty()) {
                errors.add(field, message);
            }
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                errors.add("end_date", "End Date must not be before Start Date.");
            }
        }

        if !self.attachment_key.trim().is_empty()
            && !crate::storage::is_attachment_key(&self.attachment_key)
        {
            errors.add("attachment_key", "Attachment key was not issued by this service.");
        }

        errors.into_result()
    }
}

/// StatusUpdateRequest
///
/// Body of `PUT /admin/resources/{id}/status`. Kept as a raw string so that an
/// unknown label is reported as an invalid status rather than a JSON error.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StatusUpdateRequest {
    #[schema(example = "APPROVED")]
    pub status: String,
}

/// ResourcePage
///
/// One page of the public resource listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ResourcePage {
    pub resources: Vec<Resource>,
    // Rows on this page.
    pub total_found: usize,
    // Rows in the whole table.
    pub total_number_of_data: i64,
    pub current_page: i64,
    pub per_page: i64,
}

/// ResourceDetail
///
/// A resource together with its reconstructed comment threads.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ResourceDetail {
    pub resource: Resource,
    pub comments: Vec<CommentNode>,
}

// --- Comments ---

/// Comment
///
/// Row of the `comments` table, enriched with the author's name and email
/// through a join in the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub resource_id: i64,
    pub user_id: i64,
    // None for a top-level comment.
    pub parent_id: Option<i64>,
    pub body: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub author_name: Option<String>,
    #[sqlx(default)]
    pub author_email: Option<String>,
}

/// CommentNode
///
/// A comment and its direct replies, in creation order. Built on every read by
/// [`crate::comment_tree::build_comment_tree`] and never stored. Serializes as
/// the comment's own fields plus a `replies` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(rename = "replies")]
    #[schema(no_recursion)]
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn new(comment: Comment, children: Vec<CommentNode>) -> Self {
        Self { comment, children }
    }
}

/// CreateCommentRequest
///
/// Payload of `POST /resources/{id}/comments`. `parent_id` turns the comment
/// into a reply; the parent must belong to the same resource.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

/// UpdateCommentRequest
///
/// Only the body of a comment can change after posting.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCommentRequest {
    pub body: String,
}

// --- Bookmarks ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Bookmark {
    pub id: i64,
    pub user_id: i64,
    pub resource_id: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateBookmarkRequest {
    pub resource_id: i64,
}

// --- Reports ---

/// Report
///
/// A problem report about a resource, filed by anyone (no account needed).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Report {
    pub id: i64,
    pub resource_id: i64,
    pub fullname: String,
    pub email: String,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// ReportRequest
///
/// Used both to file a report and, by admins, to correct one.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ReportRequest {
    pub resource_id: i64,
    pub content: String,
    pub fullname: String,
    pub email: String,
}

impl ReportRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.resource_id <= 0 {
            errors.add("resource_id", "Resource ID is required");
        }
        if self.content.trim().is_empty() {
            errors.add("content", "Content is required");
        }
        if self.fullname.trim().is_empty() {
            errors.add("fullname", "Fullname is required");
        }
        let email = self.email.trim();
        if email.is_empty() {
            errors.add("email", "Email is required");
        } else if !email.contains('@') {
            errors.add("email", "Email is invalid");
        }
        errors.into_result()
    }
}

// --- Pagination ---

/// Pagination
///
/// Offset/limit query of `GET /resources`.
#[derive(Debug, Clone, Copy, Deserialize, utoipa::IntoParams)]
pub struct Pagination {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "Pagination::default_limit")]
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: Self::default_limit(),
        }
    }
}

impl Pagination {
    const fn default_limit() -> i64 {
        10
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.offset < 0 {
            errors.add("offset", "Invalid offset value");
        }
        if self.limit <= 0 {
            errors.add("limit", "Invalid limit value");
        }
        errors.into_result()
    }

    /// 1-based page number of this window. Call only after `validate`.
    pub fn current_page(&self) -> i64 {
        self.offset / self.limit + 1
    }
}

// --- Dashboard & misc output schemas ---

/// DashboardCounts
///
/// Headline numbers of the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct DashboardCounts {
    pub total_pending_resources: i64,
    pub total_in_review_resources: i64,
    pub total_rejected_resources: i64,
    pub total_approved_resources: i64,
    pub total_no_of_users: i64,
    pub total_no_of_resources: i64,
}

/// AdminDashboard
///
/// Output of `GET /admin/dashboard`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboard {
    pub info: DashboardCounts,
    pub recent_resources: Vec<Resource>,
    pub recent_users: Vec<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct CountResponse {
    pub total: i64,
}

/// StatusMessage
///
/// Plain acknowledgement body, e.g. after recording a view.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}

/// PresignedUrlRequest
///
/// Input of `POST /uploads/presigned`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// Original filename; its extension decides whether the upload is allowed.
    #[schema(example = "toolkit.pdf")]
    pub filename: String,
    /// MIME type the upload is pinned to.
    #[schema(example = "application/pdf")]
    pub file_type: String,
}

/// PresignedUrlResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// Time-limited URL for the client's PUT.
    pub upload_url: String,
    /// Key to send back as `attachment_key` when creating the resource.
    pub resource_key: String,
}
