// libs/appointment-cell/src/services/store.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use professional_cell::StorageError;

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentStatus};
use crate::services::lifecycle::{plan_transition, Transition};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    StartAscending,
    StartDescending,
}

/// Store-level appointment query. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub professional_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub statuses: Vec<AppointmentStatus>,
    /// Inclusive lower bound on `start_time`.
    pub starts_at_or_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `start_time`.
    pub starts_before: Option<DateTime<Utc>>,
    /// Exclusive lower bound on `end_time`. Together with `starts_before`
    /// this selects appointments overlapping a half-open range.
    pub ends_after: Option<DateTime<Utc>>,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.professional_id.map_or(true, |id| appointment.professional_id == id)
            && self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && (self.statuses.is_empty() || self.statuses.contains(&appointment.status))
            && self
                .starts_at_or_after
                .map_or(true, |from| appointment.start_time >= from)
            && self.starts_before.map_or(true, |to| appointment.start_time < to)
            && self.ends_after.map_or(true, |from| appointment.end_time > from)
    }
}

/// Outcome of a status write.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub previous: AppointmentStatus,
    pub appointment: Appointment,
}

impl StatusUpdate {
    pub fn changed(&self) -> bool {
        self.previous != self.appointment.status
    }
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StorageError>;

    /// Replaces the stored row only while its status is still `expected`.
    /// `None` means the row is gone or its status moved on.
    async fn update_if_status(
        &self,
        appointment: Appointment,
        expected: AppointmentStatus,
    ) -> Result<Option<Appointment>, StorageError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StorageError>;

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StorageError>;

    /// Scheduled or confirmed appointments of a professional, optionally
    /// only those overlapping `[from, to)`.
    async fn list_active(
        &self,
        professional_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Appointment>, StorageError> {
        let filter = AppointmentFilter {
            professional_id: Some(professional_id),
            statuses: AppointmentStatus::ACTIVE.to_vec(),
            starts_before: to,
            ends_after: from,
            ..Default::default()
        };
        self.list(&filter).await
    }

    /// Moves `current` to `status`, refusing to leave a terminal status.
    /// Re-setting the current value writes nothing. The write is rejected
    /// with `ConcurrentUpdate` if the stored status is no longer the one
    /// `current` was read with.
    async fn update_status(
        &self,
        current: &Appointment,
        status: AppointmentStatus,
    ) -> Result<StatusUpdate, AppointmentError> {
        let previous = current.status;

        if plan_transition(previous, status)? == Transition::Unchanged {
            return Ok(StatusUpdate {
                previous,
                appointment: current.clone(),
            });
        }

        let mut appointment = current.clone();
        appointment.status = status;
        appointment.updated_at = Utc::now();

        let appointment = self
            .update_if_status(appointment, previous)
            .await?
            .ok_or(AppointmentError::ConcurrentUpdate {
                appointment_id: current.id,
            })?;

        Ok(StatusUpdate { previous, appointment })
    }
}

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StorageError> {
        let mut appointments = self.appointments.write().await;
        if appointments.contains_key(&appointment.id) {
            return Err(StorageError::new(format!("duplicate appointment id {}", appointment.id)));
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update_if_status(
        &self,
        appointment: Appointment,
        expected: AppointmentStatus,
    ) -> Result<Option<Appointment>, StorageError> {
        let mut appointments = self.appointments.write().await;
        match appointments.get_mut(&appointment.id) {
            Some(existing) if existing.status == expected => {
                *existing = appointment.clone();
                Ok(Some(appointment))
            }
            _ => Ok(None),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StorageError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StorageError> {
        let appointments = self.appointments.read().await;
        let mut matching: Vec<Appointment> = appointments
            .values()
            .filter(|appointment| filter.matches(appointment))
            .cloned()
            .collect();

        matching.sort_by(|a, b| (a.start_time, a.id).cmp(&(b.start_time, b.id)));
        if filter.order == SortOrder::StartDescending {
            matching.reverse();
        }
        if let Some(limit) = filter.limit {
            matching.truncate(limit);
        }

        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone};

    fn appointment(professional_id: Uuid, hour: u32, status: AppointmentStatus) -> Appointment {
        let start = Utc.with_ymd_and_hms(2030, 1, 7, hour, 0, 0).unwrap();
        let mut appointment = Appointment::new(Uuid::new_v4(), professional_id, start, start + Duration::minutes(30));
        appointment.status = status;
        appointment
    }

    #[tokio::test]
    async fn list_active_skips_inactive_and_non_overlapping() {
        let store = InMemoryAppointmentStore::new();
        let professional_id = Uuid::new_v4();

        let kept = store.insert(appointment(professional_id, 9, AppointmentStatus::Confirmed)).await.unwrap();
        store.insert(appointment(professional_id, 9, AppointmentStatus::Cancelled)).await.unwrap();
        store.insert(appointment(professional_id, 15, AppointmentStatus::Scheduled)).await.unwrap();
        store.insert(appointment(Uuid::new_v4(), 9, AppointmentStatus::Scheduled)).await.unwrap();

        let from = Utc.with_ymd_and_hms(2030, 1, 7, 8, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2030, 1, 7, 12, 0, 0).unwrap();
        let active = store.list_active(professional_id, Some(from), Some(to)).await.unwrap();

        assert_eq!(active, vec![kept]);
    }

    #[tokio::test]
    async fn update_status_guards_terminal_states() {
        let store = InMemoryAppointmentStore::new();
        let stored = store
            .insert(appointment(Uuid::new_v4(), 9, AppointmentStatus::Scheduled))
            .await
            .unwrap();

        let cancelled = store.update_status(&stored, AppointmentStatus::Cancelled).await.unwrap();
        assert!(cancelled.changed());
        assert_eq!(cancelled.previous, AppointmentStatus::Scheduled);

        let again = store
            .update_status(&cancelled.appointment, AppointmentStatus::Cancelled)
            .await
            .unwrap();
        assert!(!again.changed());

        assert_matches!(
            store.update_status(&cancelled.appointment, AppointmentStatus::Confirmed).await,
            Err(AppointmentError::TerminalState { .. })
        );
    }

    #[tokio::test]
    async fn stale_reads_cannot_overwrite_a_newer_status() {
        let store = InMemoryAppointmentStore::new();
        let read = store
            .insert(appointment(Uuid::new_v4(), 9, AppointmentStatus::Scheduled))
            .await
            .unwrap();

        store.update_status(&read, AppointmentStatus::Cancelled).await.unwrap();

        // Still holds the Scheduled copy
        assert_matches!(
            store.update_status(&read, AppointmentStatus::Confirmed).await,
            Err(AppointmentError::ConcurrentUpdate { appointment_id }) if appointment_id == read.id
        );
        assert_eq!(
            store.get(read.id).await.unwrap().unwrap().status,
            AppointmentStatus::Cancelled
        );

        let missing = appointment(Uuid::new_v4(), 10, AppointmentStatus::Scheduled);
        assert_eq!(
            store.update_if_status(missing, AppointmentStatus::Scheduled).await.unwrap(),
            None
        );
    }
}
