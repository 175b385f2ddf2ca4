use chrono::NaiveTime;
use thiserror::Error;
use uuid::Uuid;

use shared_models::auth::UserRole;
use shared_models::error::AppError;

/// Failure reported by any store or directory backend.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("storage error: {0}")]
pub struct StorageError(pub String);

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        StorageError(message.into())
    }
}

impl From<anyhow::Error> for StorageError {
    fn from(err: anyhow::Error) -> Self {
        StorageError(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AvailabilityError {
    #[error("Start time {start} must be before end time {end}")]
    InvalidRange { start: NaiveTime, end: NaiveTime },

    #[error("Window {start}-{end} overlaps available window {existing_id} on {day_name}")]
    Overlap {
        existing_id: Uuid,
        day_name: &'static str,
        start: NaiveTime,
        end: NaiveTime,
    },

    #[error("User {user_id} referenced by '{field}' must be a {expected}")]
    InvalidRole {
        field: &'static str,
        user_id: Uuid,
        expected: UserRole,
    },

    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AvailabilityError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AvailabilityError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Request field the error is attributed to, when there is one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            AvailabilityError::InvalidRange { .. } => Some("start_time"),
            AvailabilityError::Overlap { .. } => Some("start_time"),
            AvailabilityError::InvalidRole { field, .. } => Some(*field),
            AvailabilityError::Validation { field, .. } => Some(*field),
            AvailabilityError::NotFound(_)
            | AvailabilityError::Forbidden(_)
            | AvailabilityError::Storage(_) => None,
        }
    }
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::Overlap { .. } => AppError::Conflict(err.to_string()),
            AvailabilityError::NotFound(_) => AppError::NotFound(err.to_string()),
            AvailabilityError::Forbidden(msg) => AppError::Forbidden(msg),
            AvailabilityError::Storage(inner) => AppError::Database(inner.0),
            AvailabilityError::InvalidRange { .. }
            | AvailabilityError::InvalidRole { .. }
            | AvailabilityError::Validation { .. } => {
                let field = err.field().unwrap_or("non_field_errors");
                AppError::validation(field, err.to_string())
            }
        }
    }
}
