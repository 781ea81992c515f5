//! Resource review workflow and engagement counters.
//!
//! A resource is created `PENDING` and moves between the four review states
//! only through administrative action. Any state may be set from any other.
//! The view and like counters only ever grow, one event at a time, and each
//! increment is a single atomic statement in the store.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{error::RepoError, repository::Repository};

/// ResourceStatus
///
/// Review state of a resource. Serialized with the exact upper-case labels
/// stored in the `resources.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum ResourceStatus {
    #[default]
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "IN-REVIEW")]
    InReview,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "APPROVED")]
    Approved,
}

impl ResourceStatus {
    pub const ALL: [ResourceStatus; 4] = [
        Self::Pending,
        Self::InReview,
        Self::Rejected,
        Self::Approved,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InReview => "IN-REVIEW",
            Self::Rejected => "REJECTED",
            Self::Approved => "APPROVED",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid resource status: {0}")]
pub struct InvalidStatus(pub String);

impl FromStr for ResourceStatus {
    type Err = InvalidStatus;

    // Labels are matched exactly; "approved" is not "APPROVED".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvalidStatus(s.to_string()))
    }
}

impl TryFrom<String> for ResourceStatus {
    type Error = InvalidStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Counter
///
/// The monotonic engagement counters of a resource. Each variant names
/// exactly one column, so no field is ever looked up by a caller-supplied string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Views,
    Likes,
}

impl Counter {
    pub const fn column(self) -> &'static str {
        match self {
            Self::Views => "views",
            Self::Likes => "likes",
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid status value: {0}")]
    InvalidStatus(String),
    #[error("Resource not found")]
    NotFound,
    #[error(transparent)]
    Repo(RepoError),
}

impl From<InvalidStatus> for WorkflowError {
    fn from(InvalidStatus(value): InvalidStatus) -> Self {
        Self::InvalidStatus(value)
    }
}

impl From<RepoError> for WorkflowError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            err => Self::Repo(err),
        }
    }
}

/// set_resource_status
///
/// Validates `status` against the four review states and overwrites the
/// stored value. An unknown label fails before the store is touched.
pub async fn set_resource_status(
    repo: &dyn Repository,
    resource_id: i64,
    status: &str,
) -> Result<ResourceStatus, WorkflowError> {
    let status: ResourceStatus = status.parse()?;
    repo.update_resource_status(resource_id, status).await?;
    tracing::info!(resource_id, %status, "resource status changed");
    Ok(status)
}

/// Records one view event. Repeated calls are all counted.
pub async fn record_view(repo: &dyn Repository, resource_id: i64) -> Result<(), WorkflowError> {
    record(repo, resource_id, Counter::Views).await
}

/// Records one like event. Repeated calls are all counted.
pub async fn record_like(repo: &dyn Repository, resource_id: i64) -> Result<(), WorkflowError> {
    record(repo, resource_id, Counter::Likes).await
}

async fn record(
    repo: &dyn Repository,
    resource_id: i64,
    counter: Counter,
) -> Result<(), WorkflowError> {
    repo.increment_counter(resource_id, counter).await?;
    tracing::debug!(resource_id, counter = counter.column(), "counter incremented");
    Ok(())
}
