// libs/appointment-cell/src/services/notification.rs
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use professional_cell::services::UserDirectory;

use crate::models::{Appointment, AppointmentStatus};

/// Domain events emitted by the booking service after a successful write.
#[derive(Debug, Clone, PartialEq)]
pub enum AppointmentEvent {
    Created {
        appointment: Appointment,
    },
    StatusChanged {
        appointment: Appointment,
        old: AppointmentStatus,
        new: AppointmentStatus,
    },
}

impl AppointmentEvent {
    pub fn appointment(&self) -> &Appointment {
        match self {
            AppointmentEvent::Created { appointment } => appointment,
            AppointmentEvent::StatusChanged { appointment, .. } => appointment,
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            AppointmentEvent::Created { .. } => "New appointment scheduled",
            AppointmentEvent::StatusChanged { new, .. } => match new {
                AppointmentStatus::Confirmed => "Appointment confirmed",
                AppointmentStatus::Cancelled => "Appointment cancelled",
                AppointmentStatus::Completed => "Appointment completed",
                _ => "Appointment updated",
            },
        }
    }
}

/// Consumer of appointment events. Publishing never fails the caller.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, event: AppointmentEvent);
}

/// Rendered message handed to delivery adapters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub appointment_id: Uuid,
    pub recipients: Vec<Uuid>,
    pub subject: String,
    pub body: String,
}

pub struct NotificationService {
    enabled: bool,
    directory: Arc<dyn UserDirectory>,
    sender: broadcast::Sender<Notification>,
}

impl NotificationService {
    pub fn new(enabled: bool, directory: Arc<dyn UserDirectory>) -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            enabled,
            directory,
            sender,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// New receiver for rendered notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    async fn display_name(&self, user_id: Uuid) -> String {
        match self.directory.find_user(user_id).await {
            Ok(Some(user)) => user.full_name(),
            _ => user_id.to_string(),
        }
    }

    pub async fn render(&self, event: &AppointmentEvent) -> Notification {
        let appointment = event.appointment();
        let patient = self.display_name(appointment.patient_id).await;
        let professional = self.display_name(appointment.professional_id).await;
        let when = appointment.start_time.format("%Y-%m-%d %H:%M UTC");

        let body = match event {
            AppointmentEvent::Created { .. } => format!(
                "Appointment for {} with {} scheduled on {} ({} minutes).",
                patient,
                professional,
                when,
                appointment.duration_minutes()
            ),
            AppointmentEvent::StatusChanged { old, new, .. } => format!(
                "Appointment for {} with {} on {} changed from {} to {}.",
                patient, professional, when, old, new
            ),
        };

        Notification {
            appointment_id: appointment.id,
            recipients: vec![appointment.patient_id, appointment.professional_id],
            subject: event.subject().to_string(),
            body,
        }
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn publish(&self, event: AppointmentEvent) {
        if !self.enabled {
            debug!("Notifications disabled, dropping event for appointment {}", event.appointment().id);
            return;
        }

        let notification = self.render(&event).await;
        info!("Notifying {:?}: {}", notification.recipients, notification.subject);

        if self.sender.send(notification).is_err() {
            debug!("No notification subscribers attached");
        }
    }
}
