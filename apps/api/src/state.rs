use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use appointment_cell::handlers::AppointmentState;
use appointment_cell::services::{
    AppointmentBookingService, AppointmentStore, InMemoryAppointmentStore, NotificationService,
    SlotPolicy, SupabaseAppointmentStore,
};
use professional_cell::handlers::AvailabilityState;
use professional_cell::models::DirectoryUser;
use professional_cell::services::{
    AvailabilityService, AvailabilityStore, InMemoryAvailabilityStore, InMemoryUserDirectory,
    SupabaseAvailabilityStore, SupabaseUserDirectory, UserDirectory,
};
use shared_config::{AppConfig, StorageBackend};

/// Services shared by every request. Built once so the booking locks are process-wide.
pub struct AppServices {
    pub config: Arc<AppConfig>,
    pub availability: Arc<AvailabilityService>,
    pub booking: Arc<AppointmentBookingService>,
    pub notifications: Arc<NotificationService>,
}

impl AppServices {
    pub async fn build(config: AppConfig) -> Result<Self> {
        let config = Arc::new(config);

        let (availability_store, appointment_store, directory): (
            Arc<dyn AvailabilityStore>,
            Arc<dyn AppointmentStore>,
            Arc<dyn UserDirectory>,
        ) = match config.storage_backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                let directory = Arc::new(InMemoryUserDirectory::new());
                if let Some(path) = &config.directory_seed_file {
                    let count = seed_directory(&directory, path).await?;
                    info!("Seeded {} directory users from {}", count, path);
                }
                (
                    Arc::new(InMemoryAvailabilityStore::new()) as Arc<dyn AvailabilityStore>,
                    Arc::new(InMemoryAppointmentStore::new()) as Arc<dyn AppointmentStore>,
                    directory as Arc<dyn UserDirectory>,
                )
            }
            StorageBackend::Supabase => {
                if !config.is_configured() {
                    warn!("Supabase backend selected without full configuration");
                }
                info!("Using Supabase storage at {}", config.supabase_url);
                (
                    Arc::new(SupabaseAvailabilityStore::new(&config)) as Arc<dyn AvailabilityStore>,
                    Arc::new(SupabaseAppointmentStore::new(&config)) as Arc<dyn AppointmentStore>,
                    Arc::new(SupabaseUserDirectory::new(&config)) as Arc<dyn UserDirectory>,
                )
            }
        };

        let availability = Arc::new(AvailabilityService::new(availability_store, directory.clone()));
        let notifications = Arc::new(NotificationService::new(config.notifications_enabled, directory));
        let booking = Arc::new(AppointmentBookingService::new(
            appointment_store,
            availability.clone(),
            notifications.clone(),
            SlotPolicy::from_config(&config),
        ));

        Ok(Self {
            config,
            availability,
            booking,
            notifications,
        })
    }

    pub fn availability_state(&self) -> AvailabilityState {
        AvailabilityState::new(self.config.clone(), self.availability.clone())
    }

    pub fn appointment_state(&self) -> AppointmentState {
        AppointmentState::new(self.config.clone(), self.booking.clone())
    }
}

async fn seed_directory(directory: &InMemoryUserDirectory, path: &str) -> Result<usize> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading directory seed {}", path))?;
    let users: Vec<DirectoryUser> =
        serde_json::from_str(&raw).with_context(|| format!("parsing directory seed {}", path))?;

    let count = users.len();
    for user in users {
        directory.register(user).await;
    }
    Ok(count)
}
