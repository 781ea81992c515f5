use crate::{
    error::RepoError,
    models::{
        AdminDashboard, Bookmark, Comment, CreateResourceRequest, DashboardCounts, Report,
        ReportRequest, Resource, User,
    },
    workflow::{Counter, ResourceStatus},
};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;

/// Repository Trait
///
/// Abstract contract for every persistence operation. Handlers and the
/// workflow core only see `Arc<dyn Repository>`, so tests can swap in
/// [`crate::memory::InMemoryRepository`].
///
/// Lookups of a single row return `RepoError::NotFound` when nothing matches,
/// and so do updates and deletes that touch zero rows.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: i64) -> Result<User, RepoError>;

    // --- Resources ---
    /// One page ordered by title, plus the size of the whole table.
    async fn list_resources(&self, offset: i64, limit: i64)
    -> Result<(Vec<Resource>, i64), RepoError>;
    async fn get_resource(&self, id: i64) -> Result<Resource, RepoError>;
    // New rows always start PENDING with zeroed counters.
    async fn create_resource(
        &self,
        user_id: i64,
        req: &CreateResourceRequest,
    ) -> Result<Resource, RepoError>;
    async fn delete_resource(&self, id: i64) -> Result<(), RepoError>;
    async fn get_user_resources(&self, user_id: i64) -> Result<Vec<Resource>, RepoError>;
    async fn count_user_resources(&self, user_id: i64) -> Result<i64, RepoError>;

    // --- Workflow ---
    async fn update_resource_status(
        &self,
        id: i64,
        status: ResourceStatus,
    ) -> Result<(), RepoError>;
    /// Adds one to the counter in a single statement.
    async fn increment_counter(&self, id: i64, counter: Counter) -> Result<(), RepoError>;

    // --- Comments ---
    /// Ascending by creation time, ties broken by id.
    async fn fetch_comments_for_resource(&self, resource_id: i64)
    -> Result<Vec<Comment>, RepoError>;
    async fn get_comment(&self, id: i64) -> Result<Comment, RepoError>;
    async fn add_comment(
        &self,
        resource_id: i64,
        user_id: i64,
        parent_id: Option<i64>,
        body: &str,
    ) -> Result<Comment, RepoError>;
    // Author-only: a comment of another user is NotFound.
    async fn update_comment(&self, id: i64, user_id: i64, body: &str)
    -> Result<Comment, RepoError>;
    async fn delete_comment(&self, id: i64, user_id: i64) -> Result<(), RepoError>;

    // --- Bookmarks (always scoped to the owner) ---
    /// `Conflict` when the user already bookmarked the resource.
    async fn create_bookmark(&self, user_id: i64, resource_id: i64)
    -> Result<Bookmark, RepoError>;
    async fn get_bookmark(&self, id: i64, user_id: i64) -> Result<Bookmark, RepoError>;
    async fn list_bookmarks(&self, user_id: i64) -> Result<Vec<Bookmark>, RepoError>;
    async fn delete_bookmark(&self, id: i64, user_id: i64) -> Result<(), RepoError>;
    /// Bookmarks other users placed on resources owned by `user_id`.
    async fn count_bookmarks_on_user_resources(&self, user_id: i64) -> Result<i64, RepoError>;

    // --- Reports ---
    async fn create_report(&self, req: &ReportRequest) -> Result<Report, RepoError>;
    async fn get_report(&self, id: i64) -> Result<Report, RepoError>;
    async fn list_reports(&self) -> Result<Vec<Report>, RepoError>;
    async fn update_report(&self, id: i64, req: &ReportRequest) -> Result<Report, RepoError>;
    async fn delete_report(&self, id: i64) -> Result<(), RepoError>;

    // --- Admin ---
    async fn dashboard(&self) -> Result<AdminDashboard, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Number of rows in each "recent" list of the admin dashboard.
pub const DASHBOARD_RECENT_LIMIT: i64 = 10;

// Resource row `r` plus its submitter `u`; pair with `RESOURCE_JOIN`.
const RESOURCE_COLUMNS: &str = r#"
    r.id, r.user_id, r.title, r.description, r.organization, r.contact_title,
    r.target_audience, r.weblink, r.resource_types, r.categories, r.identity_groups,
    r.racial_spheres, r.sustainable_goals, r.year_initiated, r.start_date, r.end_date,
    r.attachment_key, r.status, r.views, r.likes, r.created_at, r.updated_at,
    u.fullname AS author_name, u.email AS author_email
"#;

const RESOURCE_JOIN: &str = "LEFT JOIN users u ON u.id = r.user_id";

const BOOKMARK_COLUMNS: &str = "id, user_id, resource_id, created_at";

const REPORT_COLUMNS: &str = "id, resource_id, fullname, email, content, created_at";

fn expect_one_row(rows_affected: u64) -> Result<(), RepoError> {
    if rows_affected == 0 {
        Err(RepoError::NotFound)
    } else {
        Ok(())
    }
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. All queries are
/// bound at runtime; mutations are single statements.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: i64) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, fullname, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// list_resources
    ///
    /// Page and total are two statements; the total may drift under
    /// concurrent inserts, which only affects the page count shown.
    async fn list_resources(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Resource>, i64), RepoError> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new("SELECT ");
        builder.push(RESOURCE_COLUMNS);
        builder.push(" FROM resources r ");
        builder.push(RESOURCE_JOIN);
        builder.push(" ORDER BY r.title ASC, r.id ASC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let resources = builder
            .build_query_as::<Resource>()
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resources")
            .fetch_one(&self.pool)
            .await?;

        Ok((resources, total))
    }

    async fn get_resource(&self, id: i64) -> Result<Resource, RepoError> {
        let query =
            format!("SELECT {RESOURCE_COLUMNS} FROM resources r {RESOURCE_JOIN} WHERE r.id = $1");
        let resource = sqlx::query_as::<_, Resource>(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(resource)
    }

    /// create_resource
    ///
    /// `status`, `views` and `likes` are left to their column defaults.
    async fn create_resource(
        &self,
        user_id: i64,
        req: &CreateResourceRequest,
    ) -> Result<Resource, RepoError> {
        let query = format!(
            r#"
            WITH r AS (
                INSERT INTO resources (
                    user_id, title, description, organization, contact_title, target_audience,
                    weblink, resource_types, categories, identity_groups, racial_spheres,
                    sustainable_goals, year_initiated, start_date, end_date, attachment_key
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                RETURNING *
            )
            SELECT {RESOURCE_COLUMNS} FROM r {RESOURCE_JOIN}
            "#
        );
        let resource = sqlx::query_as::<_, Resource>(&query)
            .bind(user_id)
            .bind(req.title.trim())
            .bind(req.description.trim())
            .bind(req.organization.trim())
            .bind(req.contact_title.trim())
            .bind(req.target_audience.trim())
            .bind(req.weblink.trim())
            .bind(&req.resource_types)
            .bind(&req.categories)
            .bind(&req.identity_groups)
            .bind(&req.racial_spheres)
            .bind(&req.sustainable_goals)
            .bind(req.year_initiated)
            .bind(req.start_date)
            .bind(req.end_date)
            .bind(&req.attachment_key)
            .fetch_one(&self.pool)
            .await?;
        Ok(resource)
    }

    /// Comments, bookmarks and reports of the resource go with it (ON DELETE CASCADE).
    async fn delete_resource(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_one_row(result.rows_affected())
    }

    async fn get_user_resources(&self, user_id: i64) -> Result<Vec<Resource>, RepoError> {
        let query = format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources r {RESOURCE_JOIN} \
             WHERE r.user_id = $1 ORDER BY r.created_at DESC"
        );
        let resources = sqlx::query_as::<_, Resource>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(resources)
    }

    async fn count_user_resources(&self, user_id: i64) -> Result<i64, RepoError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resources WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn update_resource_status(
        &self,
        id: i64,
        status: ResourceStatus,
    ) -> Result<(), RepoError> {
        let result =
            sqlx::query("UPDATE resources SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(status.as_str())
                .bind(id)
                .execute(&self.pool)
                .await?;
        expect_one_row(result.rows_affected())
    }

    /// increment_counter
    ///
    /// The column name comes from the closed `Counter` enum, never from input.
    async fn increment_counter(&self, id: i64, counter: Counter) -> Result<(), RepoError> {
        let column = counter.column();
        let query = format!("UPDATE resources SET {column} = {column} + 1 WHERE id = $1");
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await?;
        expect_one_row(result.rows_affected())
    }

    /// fetch_comments_for_resource
    ///
    /// LEFT JOIN keeps comments whose author has been removed.
    async fn fetch_comments_for_resource(
        &self,
        resource_id: i64,
    ) -> Result<Vec<Comment>, RepoError> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.resource_id, c.user_id, c.parent_id, c.body, c.created_at,
                   u.fullname AS author_name, u.email AS author_email
            FROM comments c
            LEFT JOIN users u ON u.id = c.user_id
            WHERE c.resource_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn get_comment(&self, id: i64) -> Result<Comment, RepoError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.resource_id, c.user_id, c.parent_id, c.body, c.created_at,
                   u.fullname AS author_name, u.email AS author_email
            FROM comments c
            LEFT JOIN users u ON u.id = c.user_id
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    /// add_comment
    ///
    /// Inserts and joins the author in one round trip.
    async fn add_comment(
        &self,
        resource_id: i64,
        user_id: i64,
        parent_id: Option<i64>,
        body: &str,
    ) -> Result<Comment, RepoError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (resource_id, user_id, parent_id, body)
                VALUES ($1, $2, $3, $4)
                RETURNING id, resource_id, user_id, parent_id, body, created_at
            )
            SELECT i.id, i.resource_id, i.user_id, i.parent_id, i.body, i.created_at,
                   u.fullname AS author_name, u.email AS author_email
            FROM inserted i
            LEFT JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(resource_id)
        .bind(user_id)
        .bind(parent_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn update_comment(
        &self,
        id: i64,
        user_id: i64,
        body: &str,
    ) -> Result<Comment, RepoError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH updated AS (
                UPDATE comments SET body = $3
                WHERE id = $1 AND user_id = $2
                RETURNING id, resource_id, user_id, parent_id, body, created_at
            )
            SELECT d.id, d.resource_id, d.user_id, d.parent_id, d.body, d.created_at,
                   u.fullname AS author_name, u.email AS author_email
            FROM updated d
            LEFT JOIN users u ON u.id = d.user_id
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    /// Replies to the deleted comment stay and surface as roots.
    async fn delete_comment(&self, id: i64, user_id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        expect_one_row(result.rows_affected())
    }

    async fn create_bookmark(
        &self,
        user_id: i64,
        resource_id: i64,
    ) -> Result<Bookmark, RepoError> {
        let query = format!(
            "INSERT INTO bookmarks (user_id, resource_id) VALUES ($1, $2) RETURNING {BOOKMARK_COLUMNS}"
        );
        // UNIQUE (user_id, resource_id) surfaces as RepoError::Conflict.
        let bookmark = sqlx::query_as::<_, Bookmark>(&query)
            .bind(user_id)
            .bind(resource_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(bookmark)
    }

    async fn get_bookmark(&self, id: i64, user_id: i64) -> Result<Bookmark, RepoError> {
        let query =
            format!("SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE id = $1 AND user_id = $2");
        let bookmark = sqlx::query_as::<_, Bookmark>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(bookmark)
    }

    async fn list_bookmarks(&self, user_id: i64) -> Result<Vec<Bookmark>, RepoError> {
        let query = format!(
            "SELECT {BOOKMARK_COLUMNS} FROM bookmarks WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let bookmarks = sqlx::query_as::<_, Bookmark>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(bookmarks)
    }

    async fn delete_bookmark(&self, id: i64, user_id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        expect_one_row(result.rows_affected())
    }

    async fn count_bookmarks_on_user_resources(&self, user_id: i64) -> Result<i64, RepoError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM bookmarks b
            JOIN resources r ON r.id = b.resource_id
            WHERE r.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn create_report(&self, req: &ReportRequest) -> Result<Report, RepoError> {
        let query = format!(
            "INSERT INTO reports (resource_id, fullname, email, content) VALUES ($1, $2, $3, $4) RETURNING {REPORT_COLUMNS}"
        );
        let report = sqlx::query_as::<_, Report>(&query)
            .bind(req.resource_id)
            .bind(req.fullname.trim())
            .bind(req.email.trim())
            .bind(req.content.trim())
            .fetch_one(&self.pool)
            .await?;
        Ok(report)
    }

    async fn get_report(&self, id: i64) -> Result<Report, RepoError> {
        let query = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1");
        let report = sqlx::query_as::<_, Report>(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(report)
    }

    async fn list_reports(&self) -> Result<Vec<Report>, RepoError> {
        let query = format!("SELECT {REPORT_COLUMNS} FROM reports ORDER BY created_at DESC, id DESC");
        let reports = sqlx::query_as::<_, Report>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(reports)
    }

    async fn update_report(&self, id: i64, req: &ReportRequest) -> Result<Report, RepoError> {
        let query = format!(
            r#"
            UPDATE reports
            SET resource_id = $2, fullname = $3, email = $4, content = $5
            WHERE id = $1
            RETURNING {REPORT_COLUMNS}
            "#
        );
        let report = sqlx::query_as::<_, Report>(&query)
            .bind(id)
            .bind(req.resource_id)
            .bind(req.fullname.trim())
            .bind(req.email.trim())
            .bind(req.content.trim())
            .fetch_one(&self.pool)
            .await?;
        Ok(report)
    }

    async fn delete_report(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_one_row(result.rows_affected())
    }

    /// dashboard
    ///
    /// Per-status counts come from one GROUP BY; statuses with no rows stay zero.
    async fn dashboard(&self) -> Result<AdminDashboard, RepoError> {
        let by_status: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM resources GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut info = DashboardCounts::default();
        for (status, count) in by_status {
            match status.parse::<ResourceStatus>() {
                Ok(ResourceStatus::Pending) => info.total_pending_resources = count,
                Ok(ResourceStatus::InReview) => info.total_in_review_resources = count,
                Ok(ResourceStatus::Rejected) => info.total_rejected_resources = count,
                Ok(ResourceStatus::Approved) => info.total_approved_resources = count,
                Err(e) => tracing::warn!("dashboard skipped row: {}", e),
            }
            info.total_no_of_resources += count;
        }
        info.total_no_of_users = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let query = format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources r {RESOURCE_JOIN} \
             ORDER BY r.created_at DESC, r.id DESC LIMIT $1"
        );
        let recent_resources = sqlx::query_as::<_, Resource>(&query)
            .bind(DASHBOARD_RECENT_LIMIT)
            .fetch_all(&self.pool)
            .await?;

        let recent_users = sqlx::query_as::<_, User>(
            "SELECT id, email, fullname, role, created_at FROM users ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(DASHBOARD_RECENT_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(AdminDashboard {
            info,
            recent_resources,
            recent_users,
        })
    }
}
