// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use professional_cell::services::directory::require_role;
use professional_cell::services::{AvailabilityService, ProfessionalLocks, UserDirectory};
use shared_models::auth::{Actor, UserRole};

use crate::error::AppointmentError;
use crate::models::{
    Appointment, AppointmentListQuery, AppointmentStatistics, AppointmentStatus,
    AvailableSlotsQuery, CreateAppointmentRequest, Slot, UpdatePaymentRequest,
};
use crate::services::access::AccessScope;
use crate::services::conflict::{Candidate, OverlapValidator, ValidationMode};
use crate::services::lifecycle::{authorize_status_change, plan_transition, Transition};
use crate::services::notification::{AppointmentEvent, NotificationSink};
use crate::services::slots::{SlotEnumerator, SlotPolicy};
use crate::services::stats::compute_statistics;
use crate::services::store::{AppointmentFilter, AppointmentStore, SortOrder};

pub const DEFAULT_UPCOMING_LIMIT: usize = 5;

pub struct AppointmentBookingService {
    appointments: Arc<dyn AppointmentStore>,
    availability: Arc<AvailabilityService>,
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<dyn NotificationSink>,
    locks: ProfessionalLocks,
    slot_policy: SlotPolicy,
}

impl AppointmentBookingService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        availability: Arc<AvailabilityService>,
        notifier: Arc<dyn NotificationSink>,
        slot_policy: SlotPolicy,
    ) -> Self {
        let directory = availability.directory();
        Self {
            appointments,
            availability,
            directory,
            notifier,
            locks: ProfessionalLocks::new(),
            slot_policy,
        }
    }

    pub async fn create_appointment(
        &self,
        actor: &Actor,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        self.create_appointment_at(actor, request, Utc::now()).await
    }

    /// Books an appointment as of `now`.
    ///
    /// Validation and insert run under the professional's lock, so two
    /// overlapping requests for one professional cannot both succeed.
    #[instrument(skip(self, request), fields(professional_id = %request.professional_id))]
    pub async fn create_appointment_at(
        &self,
        actor: &Actor,
        request: CreateAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let patient_id = self.resolve_patient_id(actor, request.patient_id)?;

        require_role(self.directory.as_ref(), patient_id, UserRole::Patient, "patient_id").await?;
        require_role(
            self.directory.as_ref(),
            request.professional_id,
            UserRole::Professional,
            "professional_id",
        )
        .await?;

        let candidate = Candidate {
            professional_id: request.professional_id,
            start_time: request.start_time,
            end_time: request.end_time,
        };
        OverlapValidator::check_range(&candidate)?;

        let mut appointment =
            Appointment::new(patient_id, request.professional_id, request.start_time, request.end_time);
        appointment.reason = request.reason.unwrap_or_default();
        appointment.notes = request.notes.unwrap_or_default();

        let stored = {
            let _guard = self.locks.acquire(candidate.professional_id).await;
            self.validate_candidate(&candidate, ValidationMode::Create { now }).await?;
            self.appointments.insert(appointment).await.map_err(|e| {
                error!("Failed to store appointment: {}", e);
                e
            })?
        };

        info!(
            "Appointment {} booked for patient {} with professional {} at {}",
            stored.id, stored.patient_id, stored.professional_id, stored.start_time
        );

        self.notifier
            .publish(AppointmentEvent::Created {
                appointment: stored.clone(),
            })
            .await;

        Ok(stored)
    }

    fn resolve_patient_id(&self, actor: &Actor, requested: Option<Uuid>) -> Result<Uuid, AppointmentError> {
        match actor.role {
            UserRole::Patient => match requested {
                Some(id) if id != actor.id => Err(AppointmentError::Forbidden(
                    "Patients can only book appointments for themselves".to_string(),
                )),
                _ => Ok(actor.id),
            },
            UserRole::Professional | UserRole::Admin => requested
                .ok_or_else(|| AppointmentError::validation("patient_id", "patient_id is required")),
        }
    }

    async fn validate_candidate(
        &self,
        candidate: &Candidate,
        mode: ValidationMode,
    ) -> Result<(), AppointmentError> {
        let active = self
            .appointments
            .list_active(
                candidate.professional_id,
                Some(candidate.start_time),
                Some(candidate.end_time),
            )
            .await?;
        let windows = self.availability.available_windows(candidate.professional_id).await?;

        OverlapValidator::validate(candidate, mode, &active, &windows)
    }

    /// Applies a status change while holding the professional's lock.
    ///
    /// The row is re-read under the lock, so the transition is planned
    /// against the latest status and concurrent changes apply one at a time.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let visible = self.get_appointment(actor, appointment_id).await?;
        authorize_status_change(actor, status)?;

        let guard = self.locks.acquire(visible.professional_id).await;
        let current = self.reload(appointment_id).await?;

        let update = match plan_transition(current.status, status)? {
            Transition::Unchanged => {
                debug!("Appointment {} already {}", appointment_id, status);
                return Ok(current);
            }
            Transition::Change { reactivates } => {
                if reactivates {
                    let candidate = Candidate {
                        professional_id: current.professional_id,
                        start_time: current.start_time,
                        end_time: current.end_time,
                    };
                    self.validate_candidate(&candidate, ValidationMode::Update { appointment_id })
                        .await?;
                }
                self.appointments.update_status(&current, status).await?
            }
        };
        drop(guard);

        if update.changed() {
            info!(
                "Appointment {} status changed {} -> {}",
                appointment_id, update.previous, update.appointment.status
            );
            self.notifier
                .publish(AppointmentEvent::StatusChanged {
                    appointment: update.appointment.clone(),
                    old: update.previous,
                    new: update.appointment.status,
                })
                .await;
        }

        Ok(update.appointment)
    }

    async fn reload(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .get(appointment_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(format!("Appointment {}", appointment_id)))
    }

    pub async fn confirm(&self, actor: &Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.update_status(actor, appointment_id, AppointmentStatus::Confirmed).await
    }

    pub async fn cancel(&self, actor: &Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.update_status(actor, appointment_id, AppointmentStatus::Cancelled).await
    }

    pub async fn complete(&self, actor: &Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.update_status(actor, appointment_id, AppointmentStatus::Completed).await
    }

    pub async fn mark_no_show(&self, actor: &Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.update_status(actor, appointment_id, AppointmentStatus::NoShow).await
    }

    /// Payment is tracked separately from the scheduling status and never
    /// changes it.
    pub async fn update_payment(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        request: UpdatePaymentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let visible = self.get_appointment(actor, appointment_id).await?;

        let allowed = actor.is_admin() || (actor.is_professional() && actor.id == visible.professional_id);
        if !allowed {
            return Err(AppointmentError::Forbidden(
                "Only the professional or an admin can update payment".to_string(),
            ));
        }

        if let Some(amount) = request.payment_amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(AppointmentError::validation(
                    "payment_amount",
                    "Payment amount must be a non-negative number",
                ));
            }
        }

        let _guard = self.locks.acquire(visible.professional_id).await;
        let mut appointment = self.reload(appointment_id).await?;
        let status = appointment.status;

        if let Some(amount) = request.payment_amount {
            appointment.payment_amount = Some(amount);
        }
        appointment.payment_status = request.payment_status;
        appointment.updated_at = Utc::now();

        let stored = self
            .appointments
            .update_if_status(appointment, status)
            .await?
            .ok_or(AppointmentError::ConcurrentUpdate { appointment_id })?;
        info!("Appointment {} payment set to {:?}", stored.id, stored.payment_status);

        Ok(stored)
    }

    /// Appointments outside the actor's scope are reported as forbidden.
    pub async fn get_appointment(&self, actor: &Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .appointments
            .get(appointment_id)
            .await?
            .ok_or_else(|| AppointmentError::NotFound(format!("Appointment {}", appointment_id)))?;

        if !AccessScope::for_actor(actor).permits(&appointment) {
            return Err(AppointmentError::Forbidden(
                "You do not have access to this appointment".to_string(),
            ));
        }

        Ok(appointment)
    }

    pub async fn list_appointments(
        &self,
        actor: &Actor,
        query: AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.list_appointments_at(actor, query, Utc::now().date_naive()).await
    }

    pub async fn list_appointments_at(
        &self,
        actor: &Actor,
        query: AppointmentListQuery,
        today: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut filter = AppointmentFilter {
            order: SortOrder::StartDescending,
            ..Default::default()
        };

        if let Some(raw) = query.status.as_deref() {
            filter.statuses = parse_statuses(raw)?;
        }

        if query.today.unwrap_or(false) {
            filter.starts_at_or_after = Some(start_of_day(today));
            filter.starts_before = start_of_next_day(today);
        } else {
            filter.starts_at_or_after = query.date_from.map(start_of_day);
            filter.starts_before = query.date_to.and_then(start_of_next_day);
        }

        let filter = AccessScope::for_actor(actor).restrict(filter);
        Ok(self.appointments.list(&filter).await?)
    }

    pub async fn upcoming_appointments(
        &self,
        actor: &Actor,
        limit: Option<usize>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter {
            starts_at_or_after: Some(Utc::now() + Duration::microseconds(1)),
            order: SortOrder::StartAscending,
            limit: Some(limit.unwrap_or(DEFAULT_UPCOMING_LIMIT)),
            ..Default::default()
        };

        let filter = AccessScope::for_actor(actor).restrict(filter);
        Ok(self.appointments.list(&filter).await?)
    }

    pub async fn statistics(&self, actor: &Actor) -> Result<AppointmentStatistics, AppointmentError> {
        self.statistics_at(actor, Utc::now().date_naive()).await
    }

    pub async fn statistics_at(
        &self,
        actor: &Actor,
        today: NaiveDate,
    ) -> Result<AppointmentStatistics, AppointmentError> {
        let filter = AccessScope::for_actor(actor).restrict(AppointmentFilter::default());
        let appointments = self.appointments.list(&filter).await?;
        Ok(compute_statistics(&appointments, today))
    }

    pub async fn available_slots(&self, query: AvailableSlotsQuery) -> Result<Vec<Slot>, AppointmentError> {
        self.available_slots_at(query, Utc::now().date_naive()).await
    }

    /// Free slots for a professional. Read-only and lock-free; a slot may be
    /// taken by the time it is booked, which booking itself rejects.
    pub async fn available_slots_at(
        &self,
        query: AvailableSlotsQuery,
        today: NaiveDate,
    ) -> Result<Vec<Slot>, AppointmentError> {
        let slot = self.slot_policy.slot_duration(query.slot_minutes)?;
        let (date_from, date_to) = self.slot_policy.resolve_range(today, query.date_from, query.date_to);

        let professional = require_role(
            self.directory.as_ref(),
            query.professional_id,
            UserRole::Professional,
            "professional_id",
        )
        .await?;

        let windows = self.availability.available_windows(professional.id).await?;
        if windows.is_empty() || date_to < date_from {
            return Ok(Vec::new());
        }

        let appointments = self
            .appointments
            .list_active(
                professional.id,
                Some(start_of_day(date_from)),
                start_of_next_day(date_to),
            )
            .await?;

        let professional_name = professional.full_name();
        let enumerator = SlotEnumerator {
            professional_id: professional.id,
            professional_name: &professional_name,
            windows: &windows,
            appointments: &appointments,
        };

        Ok(enumerator.enumerate(date_from, date_to, slot))
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// `None` for the last representable date, which leaves the range open.
fn start_of_next_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.succ_opt().map(start_of_day)
}

fn parse_statuses(raw: &str) -> Result<Vec<AppointmentStatus>, AppointmentError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|e: String| AppointmentError::validation("status", e)))
        .collect()
}
