use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::workflow::WorkflowError;

/// RepoError
///
/// Failures surfaced by the persistence layer. The core never interprets
/// `Database`; it is passed through to the HTTP layer untouched.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("The requested record could not be found")]
    NotFound,
    #[error("The record already exists")]
    Conflict,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict,
            _ => Self::Database(err),
        }
    }
}

/// ValidationErrors
///
/// Field name to human readable message, returned with 422.
#[derive(Debug, Clone, Default, PartialEq, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct ValidationErrors(pub BTreeMap<String, String>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        self.0.insert(field.to_string(), message.to_string());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ok when nothing was recorded, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// AppError
///
/// The single error type returned by handlers. Each variant maps to one HTTP
/// status and a JSON body of the form `{"status": "error", "message": ...}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Resource not found")]
    NotFound,
    #[error("Invalid status value '{0}'. Allowed values: PENDING, IN-REVIEW, APPROVED, REJECTED")]
    InvalidStatus(String),
    #[error("Validation failed")]
    Validation(ValidationErrors),
    #[error("This is not allowed")]
    Forbidden,
    #[error("Already exists")]
    Conflict,
    #[error("Storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            RepoError::Conflict => Self::Conflict,
            err => Self::Repo(err),
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidStatus(value) => Self::InvalidStatus(value),
            WorkflowError::NotFound => Self::NotFound,
            WorkflowError::Repo(err) => err.into(),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// ErrorBody
///
/// Wire shape of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::BAD_GATEWAY,
            Self::Repo(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Internal details stay in the logs.
            Self::Repo(err) => {
                tracing::error!("repository error: {:?}", err);
                "Internal server error".to_string()
            }
            Self::Storage(err) => {
                tracing::error!("storage error: {}", err);
                "Attachment storage is unavailable".to_string()
            }
            other => other.to_string(),
        };
        let errors = match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        };
        let body = ErrorBody {
            status: "error",
            message,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_not_found_becomes_404() {
        let err: AppError = RepoError::NotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            RepoError::from(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
    }

    #[test]
    fn workflow_errors_keep_their_meaning() {
        let invalid: AppError = WorkflowError::InvalidStatus("ARCHIVED".into()).into();
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert!(invalid.to_string().contains("ARCHIVED"));

        let missing: AppError = WorkflowError::NotFound.into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn empty_validation_is_ok() {
        assert!(ValidationErrors::default().into_result().is_ok());

        let mut errors = ValidationErrors::default();
        errors.add("title", "Title is required.");
        let err = errors.into_result().unwrap_err();
        assert!(err.contains("title"));
    }
}
