// Shared fixture for appointment-cell integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::*;
use appointment_cell::services::*;
use professional_cell::models::DirectoryUser;
use professional_cell::StorageError;
use professional_cell::services::{AvailabilityService, InMemoryAvailabilityStore, InMemoryUserDirectory};
use shared_models::auth::{Actor, UserRole};

/// Monday 2030-01-07.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
}

pub fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(hour, minute, 0).unwrap())
}

pub fn t(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AppointmentEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<AppointmentEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn publish(&self, event: AppointmentEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// In-memory store whose reads and writes take a while, so concurrent
/// requests interleave between reading a row and writing it back.
pub struct SlowAppointmentStore {
    inner: InMemoryAppointmentStore,
    delay: StdDuration,
}

impl SlowAppointmentStore {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            inner: InMemoryAppointmentStore::new(),
            delay: StdDuration::from_millis(delay_ms),
        }
    }
}

#[async_trait]
impl AppointmentStore for SlowAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StorageError> {
        self.inner.insert(appointment).await
    }

    async fn update_if_status(
        &self,
        appointment: Appointment,
        expected: AppointmentStatus,
    ) -> Result<Option<Appointment>, StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.update_if_status(appointment, expected).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StorageError> {
        let appointment = self.inner.get(id).await;
        tokio::time::sleep(self.delay).await;
        appointment
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StorageError> {
        self.inner.list(filter).await
    }
}

pub struct Fixture {
    pub booking: Arc<AppointmentBookingService>,
    pub availability: Arc<AvailabilityService>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub directory: Arc<InMemoryUserDirectory>,
    pub sink: Arc<RecordingSink>,
    pub patient: Actor,
    pub professional: Actor,
    pub admin: Actor,
}

impl Fixture {
    /// Professional "Ana Ruiz" with an available Monday 09:00-12:00 window.
    pub async fn new() -> Self {
        let fixture = Self::without_windows().await;
        fixture
            .availability
            .add_window(fixture.professional.id, 0, t(9, 0), t(12, 0), true)
            .await
            .unwrap();
        fixture
    }

    /// Same as [`Fixture::new`] over a store that stalls on every read and write.
    pub async fn slow() -> Self {
        let fixture = Self::with_store(Arc::new(SlowAppointmentStore::new(20))).await;
        fixture
            .availability
            .add_window(fixture.professional.id, 0, t(9, 0), t(12, 0), true)
            .await
            .unwrap();
        fixture
    }

    pub async fn without_windows() -> Self {
        Self::with_store(Arc::new(InMemoryAppointmentStore::new())).await
    }

    pub async fn with_store(appointments: Arc<dyn AppointmentStore>) -> Self {
        let directory = Arc::new(InMemoryUserDirectory::new());
        let availability = Arc::new(AvailabilityService::new(
            Arc::new(InMemoryAvailabilityStore::new()),
            directory.clone(),
        ));
        let sink = Arc::new(RecordingSink::default());

        let booking = Arc::new(AppointmentBookingService::new(
            appointments.clone(),
            availability.clone(),
            sink.clone(),
            SlotPolicy::default(),
        ));

        let fixture = Self {
            booking,
            availability,
            appointments,
            directory,
            sink,
            patient: Actor::new(Uuid::new_v4(), UserRole::Patient),
            professional: Actor::new(Uuid::new_v4(), UserRole::Professional),
            admin: Actor::new(Uuid::new_v4(), UserRole::Admin),
        };

        fixture.register(&fixture.patient, "Pablo", "Díaz").await;
        fixture.register(&fixture.professional, "Ana", "Ruiz").await;
        fixture.register(&fixture.admin, "Root", "Admin").await;
        fixture
    }

    pub async fn register(&self, actor: &Actor, first_name: &str, last_name: &str) {
        self.directory
            .register(DirectoryUser {
                id: actor.id,
                email: format!("{}@clinic.test", first_name.to_lowercase()),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                role: actor.role,
            })
            .await;
    }

    pub async fn another_patient(&self) -> Actor {
        let patient = Actor::new(Uuid::new_v4(), UserRole::Patient);
        self.register(&patient, "Lucía", "Sanz").await;
        patient
    }

    pub fn request(&self, start: DateTime<Utc>, minutes: i64) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: Some(self.patient.id),
            professional_id: self.professional.id,
            start_time: start,
            end_time: start + Duration::minutes(minutes),
            reason: Some("Control".to_string()),
            notes: None,
        }
    }

    pub async fn book(&self, start: DateTime<Utc>, minutes: i64) -> Appointment {
        self.booking
            .create_appointment(&self.patient, self.request(start, minutes))
            .await
            .unwrap()
    }

    pub fn slots_query(&self, from: NaiveDate, to: NaiveDate) -> AvailableSlotsQuery {
        AvailableSlotsQuery {
            professional_id: self.professional.id,
            date_from: Some(from),
            date_to: Some(to),
            slot_minutes: None,
        }
    }
}
