use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use professional_cell::{AvailabilityError, StorageError};
use shared_models::auth::UserRole;
use shared_models::error::AppError;

use crate::models::AppointmentStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppointmentError {
    #[error("End time {end} must be after start time {start}")]
    InvalidRange { start: DateTime<Utc>, end: DateTime<Utc> },

    #[error("Appointments cannot be scheduled in the past (start {start})")]
    PastScheduling { start: DateTime<Utc> },

    #[error("Professional already has appointment {conflicting_id} from {start} to {end}")]
    BookingConflict {
        conflicting_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Professional is not available from {start} to {end}")]
    OutsideAvailability { start: DateTime<Utc>, end: DateTime<Utc> },

    #[error("User {user_id} referenced by '{field}' must be a {expected}")]
    InvalidRole {
        field: &'static str,
        user_id: Uuid,
        expected: UserRole,
    },

    #[error("Appointment is {current} and cannot change to {requested}")]
    TerminalState {
        current: AppointmentStatus,
        requested: AppointmentStatus,
    },

    #[error("Appointment {appointment_id} was changed by another request, reload and retry")]
    ConcurrentUpdate { appointment_id: Uuid },

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AppointmentError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppointmentError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            AppointmentError::InvalidRange { .. } => Some("end_time"),
            AppointmentError::PastScheduling { .. } => Some("start_time"),
            AppointmentError::BookingConflict { .. } => Some("start_time"),
            AppointmentError::OutsideAvailability { .. } => Some("start_time"),
            AppointmentError::InvalidRole { field, .. } => Some(*field),
            AppointmentError::TerminalState { .. } => Some("status"),
            AppointmentError::ConcurrentUpdate { .. } => Some("status"),
            AppointmentError::Validation { field, .. } => Some(*field),
            AppointmentError::Forbidden(_)
            | AppointmentError::NotFound(_)
            | AppointmentError::Storage(_) => None,
        }
    }
}

impl From<AvailabilityError> for AppointmentError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::InvalidRole { field, user_id, expected } => {
                AppointmentError::InvalidRole { field, user_id, expected }
            }
            AvailabilityError::NotFound(what) => AppointmentError::NotFound(what),
            AvailabilityError::Forbidden(msg) => AppointmentError::Forbidden(msg),
            AvailabilityError::Storage(inner) => AppointmentError::Storage(inner),
            other => {
                let field = other.field().unwrap_or("non_field_errors");
                AppointmentError::validation(field, other.to_string())
            }
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::BookingConflict { .. }
            | AppointmentError::TerminalState { .. }
            | AppointmentError::ConcurrentUpdate { .. } => {
                AppError::Conflict(err.to_string())
            }
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::NotFound(_) => AppError::NotFound(err.to_string()),
            AppointmentError::Storage(inner) => AppError::Database(inner.0),
            AppointmentError::InvalidRange { .. }
            | AppointmentError::PastScheduling { .. }
            | AppointmentError::OutsideAvailability { .. }
            | AppointmentError::InvalidRole { .. }
            | AppointmentError::Validation { .. } => {
                let field = err.field().unwrap_or("non_field_errors");
                AppError::validation(field, err.to_string())
            }
        }
    }
}
