// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::auth::Actor;

use crate::error::AppointmentError;
use crate::models::AppointmentStatus;

/// What applying a requested status means for the stored appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Requested status equals the current one; nothing is written.
    Unchanged,
    /// Status changes. `reactivates` is set when an inactive appointment
    /// becomes active again and has to re-claim its time slot.
    Change { reactivates: bool },
}

/// Decides whether `current -> requested` is allowed.
///
/// Completed and cancelled are terminal: the only way out of one is into
/// the other. Re-setting the same value is a no-op. No-show is not terminal.
pub fn plan_transition(
    current: AppointmentStatus,
    requested: AppointmentStatus,
) -> Result<Transition, AppointmentError> {
    debug!("Planning status transition {} -> {}", current, requested);

    if current == requested {
        return Ok(Transition::Unchanged);
    }

    if current.is_terminal() && !requested.is_terminal() {
        warn!("Rejected transition out of terminal status {} -> {}", current, requested);
        return Err(AppointmentError::TerminalState { current, requested });
    }

    Ok(Transition::Change {
        reactivates: !current.is_active() && requested.is_active(),
    })
}

/// Cancelling is open to anyone who can see the appointment; every other
/// status is set by clinic staff.
pub fn authorize_status_change(actor: &Actor, requested: AppointmentStatus) -> Result<(), AppointmentError> {
    if requested == AppointmentStatus::Cancelled || actor.role.is_staff() {
        return Ok(());
    }

    Err(AppointmentError::Forbidden(format!(
        "Only professionals or admins can mark an appointment as {}",
        requested
    )))
}
