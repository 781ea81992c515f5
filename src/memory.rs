//! In-process `Repository` used by the handler and workflow tests.
//!
//! Mirrors the Postgres implementation's observable behavior: ordering,
//! owner scoping, `NotFound` on zero-row mutations and `Conflict` on a
//! duplicate bookmark. Every operation holds the single lock for its whole
//! duration, so counter increments are atomic here too.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Mutex, MutexGuard};

use crate::{
    error::RepoError,
    models::{
        AdminDashboard, Bookmark, Comment, CreateResourceRequest, DashboardCounts, Report,
        ReportRequest, Resource, User,
    },
    repository::{DASHBOARD_RECENT_LIMIT, Repository},
    workflow::{Counter, ResourceStatus},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    resources: Vec<Resource>,
    comments: Vec<Comment>,
    bookmarks: Vec<Bookmark>,
    reports: Vec<Report>,
    next_id: i64,
    // Monotonic clock so creation order is total even within one instant.
    ticks: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn now(&mut self) -> chrono::DateTime<Utc> {
        self.ticks += 1;
        Utc::now() + Duration::microseconds(self.ticks)
    }

    fn with_author(&self, mut comment: Comment) -> Comment {
        if let Some(user) = self.users.iter().find(|u| u.id == comment.user_id) {
            comment.author_name = Some(user.fullname.clone());
            comment.author_email = Some(user.email.clone());
        }
        comment
    }

    fn with_submitter(&self, mut resource: Resource) -> Resource {
        if let Some(user) = self.users.iter().find(|u| u.id == resource.user_id) {
            resource.author_name = Some(user.fullname.clone());
            resource.author_email = Some(user.email.clone());
        }
        resource
    }

    fn resource_mut(&mut self, id: i64) -> Result<&mut Resource, RepoError> {
        self.resources
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)
    }
}

/// InMemoryRepository
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panicking test thread must not take the other tests down with it.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seeds an account; ids are shared with every other table.
    pub fn insert_user(&self, email: &str, fullname: &str, role: crate::models::Role) -> User {
        let mut tables = self.lock();
        let user = User {
            id: tables.next_id(),
            email: email.to_string(),
            fullname: fullname.to_string(),
            role,
            created_at: tables.now(),
        };
        tables.users.push(user.clone());
        user
    }

    /// Seeds a comment without any parent validation, as a raw row would be.
    pub fn insert_comment_row(&self, comment: Comment) -> Comment {
        let mut tables = self.lock();
        tables.comments.push(comment.clone());
        comment
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: i64) -> Result<User, RepoError> {
        let tables = self.lock();
        tables
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn list_resources(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Resource>, i64), RepoError> {
        let tables = self.lock();
        let mut sorted = tables.resources.clone();
        sorted.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        let total = sorted.len() as i64;
        let page = sorted
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|r| tables.with_submitter(r))
            .collect();
        Ok((page, total))
    }

    async fn get_resource(&self, id: i64) -> Result<Resource, RepoError> {
        let tables = self.lock();
        tables
            .resources
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .map(|r| tables.with_submitter(r))
            .ok_or(RepoError::NotFound)
    }

    async fn create_resource(
        &self,
        user_id: i64,
        req: &CreateResourceRequest,
    ) -> Result<Resource, RepoError> {
        let mut tables = self.lock();
        let now = tables.now();
        let resource = Resource {
            id: tables.next_id(),
            user_id,
            title: req.title.trim().to_string(),
            description: req.description.trim().to_string(),
            organization: req.organization.trim().to_string(),
            contact_title: req.contact_title.trim().to_string(),
            target_audience: req.target_audience.trim().to_string(),
            weblink: req.weblink.trim().to_string(),
            resource_types: req.resource_types.clone(),
            categories: req.categories.clone(),
            identity_groups: req.identity_groups.clone(),
            racial_spheres: req.racial_spheres.clone(),
            sustainable_goals: req.sustainable_goals.clone(),
            year_initiated: req.year_initiated,
            start_date: req.start_date,
            end_date: req.end_date,
            attachment_key: Some(req.attachment_key.clone()),
            status: ResourceStatus::Pending,
            views: 0,
            likes: 0,
            created_at: now,
            updated_at: now,
            author_name: None,
            author_email: None,
        };
        tables.resources.push(resource.clone());
        Ok(tables.with_submitter(resource))
    }

    async fn delete_resource(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.lock();
        let before = tables.resources.len();
        tables.resources.retain(|r| r.id != id);
        if tables.resources.len() == before {
            return Err(RepoError::NotFound);
        }
        tables.comments.retain(|c| c.resource_id != id);
        tables.bookmarks.retain(|b| b.resource_id != id);
        tables.reports.retain(|r| r.resource_id != id);
        Ok(())
    }

    async fn get_user_resources(&self, user_id: i64) -> Result<Vec<Resource>, RepoError> {
        let tables = self.lock();
        let mut owned: Vec<Resource> = tables
            .resources
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .map(|r| tables.with_submitter(r))
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn count_user_resources(&self, user_id: i64) -> Result<i64, RepoError> {
        let tables = self.lock();
        Ok(tables.resources.iter().filter(|r| r.user_id == user_id).count() as i64)
    }

    async fn update_resource_status(
        &self,
        id: i64,
        status: ResourceStatus,
    ) -> Result<(), RepoError> {
        let mut tables = self.lock();
        let now = tables.now();
        let resource = tables.resource_mut(id)?;
        resource.status = status;
        resource.updated_at = now;
        Ok(())
    }

    async fn increment_counter(&self, id: i64, counter: Counter) -> Result<(), RepoError> {
        let mut tables = self.lock();
        let resource = tables.resource_mut(id)?;
        match counter {
            Counter::Views => resource.views += 1,
            Counter::Likes => resource.likes += 1,
        }
        Ok(())
    }

    async fn fetch_comments_for_resource(
        &self,
        resource_id: i64,
    ) -> Result<Vec<Comment>, RepoError> {
        let tables = self.lock();
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.resource_id == resource_id)
            .map(|c| tables.with_author(c.clone()))
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn get_comment(&self, id: i64) -> Result<Comment, RepoError> {
        let tables = self.lock();
        tables
            .comments
            .iter()
            .find(|c| c.id == id)
            .map(|c| tables.with_author(c.clone()))
            .ok_or(RepoError::NotFound)
    }

    async fn add_comment(
        &self,
        resource_id: i64,
        user_id: i64,
        parent_id: Option<i64>,
        body: &str,
    ) -> Result<Comment, RepoError> {
        let mut tables = self.lock();
        let comment = Comment {
            id: tables.next_id(),
            resource_id,
            user_id,
            parent_id,
            body: body.to_string(),
            created_at: tables.now(),
            author_name: None,
            author_email: None,
        };
        tables.comments.push(comment.clone());
        Ok(tables.with_author(comment))
    }

    async fn update_comment(
        &self,
        id: i64,
        user_id: i64,
        body: &str,
    ) -> Result<Comment, RepoError> {
        let mut tables = self.lock();
        let comment = tables
            .comments
            .iter_mut()
            .find(|c| c.id == id && c.user_id == user_id)
            .ok_or(RepoError::NotFound)?;
        comment.body = body.to_string();
        let updated = comment.clone();
        Ok(tables.with_author(updated))
    }

    async fn delete_comment(&self, id: i64, user_id: i64) -> Result<(), RepoError> {
        let mut tables = self.lock();
        let before = tables.comments.len();
        tables
            .comments
            .retain(|c| !(c.id == id && c.user_id == user_id));
        if tables.comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn create_bookmark(
        &self,
        user_id: i64,
        resource_id: i64,
    ) -> Result<Bookmark, RepoError> {
        let mut tables = self.lock();
        if tables
            .bookmarks
            .iter()
            .any(|b| b.user_id == user_id && b.resource_id == resource_id)
        {
            return Err(RepoError::Conflict);
        }
        let bookmark = Bookmark {
            id: tables.next_id(),
            user_id,
            resource_id,
            created_at: tables.now(),
        };
        tables.bookmarks.push(bookmark.clone());
        Ok(bookmark)
    }

    async fn get_bookmark(&self, id: i64, user_id: i64) -> Result<Bookmark, RepoError> {
        let tables = self.lock();
        tables
            .bookmarks
            .iter()
            .find(|b| b.id == id && b.user_id == user_id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn list_bookmarks(&self, user_id: i64) -> Result<Vec<Bookmark>, RepoError> {
        let tables = self.lock();
        let mut bookmarks: Vec<Bookmark> = tables
            .bookmarks
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookmarks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(bookmarks)
    }

    async fn delete_bookmark(&self, id: i64, user_id: i64) -> Result<(), RepoError> {
        let mut tables = self.lock();
        let before = tables.bookmarks.len();
        tables
            .bookmarks
            .retain(|b| !(b.id == id && b.user_id == user_id));
        if tables.bookmarks.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn count_bookmarks_on_user_resources(&self, user_id: i64) -> Result<i64, RepoError> {
        let tables = self.lock();
        let count = tables
            .bookmarks
            .iter()
            .filter(|b| {
                tables
                    .resources
                    .iter()
                    .any(|r| r.id == b.resource_id && r.user_id == user_id)
            })
            .count();
        Ok(count as i64)
    }

    async fn create_report(&self, req: &ReportRequest) -> Result<Report, RepoError> {
        let mut tables = self.lock();
        let report = Report {
            id: tables.next_id(),
            resource_id: req.resource_id,
            fullname: req.fullname.trim().to_string(),
            email: req.email.trim().to_string(),
            content: req.content.trim().to_string(),
            created_at: tables.now(),
        };
        tables.reports.push(report.clone());
        Ok(report)
    }

    async fn get_report(&self, id: i64) -> Result<Report, RepoError> {
        let tables = self.lock();
        tables
            .reports
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn list_reports(&self) -> Result<Vec<Report>, RepoError> {
        let tables = self.lock();
        let mut reports = tables.reports.clone();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(reports)
    }

    async fn update_report(&self, id: i64, req: &ReportRequest) -> Result<Report, RepoError> {
        let mut tables = self.lock();
        let report = tables
            .reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        report.resource_id = req.resource_id;
        report.fullname = req.fullname.trim().to_string();
        report.email = req.email.trim().to_string();
        report.content = req.content.trim().to_string();
        Ok(report.clone())
    }

    async fn delete_report(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.lock();
        let before = tables.reports.len();
        tables.reports.retain(|r| r.id != id);
        if tables.reports.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn dashboard(&self) -> Result<AdminDashboard, RepoError> {
        let tables = self.lock();
        let mut info = DashboardCounts::default();
        for resource in &tables.resources {
            match resource.status {
                ResourceStatus::Pending => info.total_pending_resources += 1,
                ResourceStatus::InReview => info.total_in_review_resources += 1,
                ResourceStatus::Rejected => info.total_rejected_resources += 1,
                ResourceStatus::Approved => info.total_approved_resources += 1,
            }
        }
        info.total_no_of_resources = tables.resources.len() as i64;
        info.total_no_of_users = tables.users.len() as i64;

        let mut recent_resources = tables.resources.clone();
        recent_resources.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent_resources.truncate(DASHBOARD_RECENT_LIMIT as usize);
        let recent_resources = recent_resources
            .into_iter()
            .map(|r| tables.with_submitter(r))
            .collect();

        let mut recent_users = tables.users.clone();
        recent_users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent_users.truncate(DASHBOARD_RECENT_LIMIT as usize);

        Ok(AdminDashboard {
            info,
            recent_resources,
            recent_users,
        })
    }
}
