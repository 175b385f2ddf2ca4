// libs/appointment-cell/src/services/conflict.rs
use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use professional_cell::models::AvailabilityWindow;

use crate::error::AppointmentError;
use crate::models::Appointment;

/// Proposed booking for one professional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub professional_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationMode {
    /// New booking: the start must lie strictly after `now`.
    Create { now: DateTime<Utc> },
    /// Existing appointment re-claiming its slot; it never conflicts with itself.
    Update { appointment_id: Uuid },
}

/// Decides whether a candidate may become a booked appointment.
///
/// Performs no I/O. Callers hand in the professional's active appointments
/// around the candidate and their available windows, and must hold the
/// professional's scheduling lock across validate and write.
pub struct OverlapValidator;

impl OverlapValidator {
    pub fn validate(
        candidate: &Candidate,
        mode: ValidationMode,
        active_appointments: &[Appointment],
        windows: &[AvailabilityWindow],
    ) -> Result<(), AppointmentError> {
        debug!(
            "Validating candidate {}-{} for professional {}",
            candidate.start_time, candidate.end_time, candidate.professional_id
        );

        Self::check_range(candidate)?;

        if let ValidationMode::Create { now } = mode {
            if candidate.start_time <= now {
                return Err(AppointmentError::PastScheduling {
                    start: candidate.start_time,
                });
            }
        }

        let exclude_id = match mode {
            ValidationMode::Update { appointment_id } => Some(appointment_id),
            ValidationMode::Create { .. } => None,
        };

        if let Some(existing) = Self::find_conflict(candidate, exclude_id, active_appointments) {
            warn!(
                "Booking conflict for professional {} with appointment {}",
                candidate.professional_id, existing.id
            );
            return Err(AppointmentError::BookingConflict {
                conflicting_id: existing.id,
                start: existing.start_time,
                end: existing.end_time,
            });
        }

        if Self::containing_window(candidate, windows).is_none() {
            warn!(
                "Candidate {}-{} falls outside availability of professional {}",
                candidate.start_time, candidate.end_time, candidate.professional_id
            );
            return Err(AppointmentError::OutsideAvailability {
                start: candidate.start_time,
                end: candidate.end_time,
            });
        }

        Ok(())
    }

    pub fn check_range(candidate: &Candidate) -> Result<(), AppointmentError> {
        if candidate.start_time >= candidate.end_time {
            return Err(AppointmentError::InvalidRange {
                start: candidate.start_time,
                end: candidate.end_time,
            });
        }
        Ok(())
    }

    pub fn find_conflict<'a>(
        candidate: &Candidate,
        exclude_id: Option<Uuid>,
        active_appointments: &'a [Appointment],
    ) -> Option<&'a Appointment> {
        active_appointments.iter().find(|existing| {
            Some(existing.id) != exclude_id
                && existing.professional_id == candidate.professional_id
                && existing.is_active()
                && existing.overlaps(candidate.start_time, candidate.end_time)
        })
    }

    /// Available window on the candidate's weekday that covers it.
    ///
    /// Weekday and times are taken in UTC from the start; a candidate ending
    /// on a later calendar day never matches.
    pub fn containing_window<'a>(
        candidate: &Candidate,
        windows: &'a [AvailabilityWindow],
    ) -> Option<&'a AvailabilityWindow> {
        if candidate.end_time.date_naive() != candidate.start_time.date_naive() {
            return None;
        }

        let day_of_week = candidate.start_time.weekday().num_days_from_monday() as i32;
        let t0 = candidate.start_time.time();
        let t1 = candidate.end_time.time();

        windows.iter().find(|window| {
            window.is_available
                && window.professional_id == candidate.professional_id
                && window.day_of_week == day_of_week
                && window.contains(t0, t1)
        })
    }
}
