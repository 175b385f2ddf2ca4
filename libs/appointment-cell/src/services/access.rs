use uuid::Uuid;

use shared_models::auth::{Actor, UserRole};

use crate::models::Appointment;
use crate::services::store::AppointmentFilter;

/// Which appointments an actor may see and act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    All,
    Professional(Uuid),
    Patient(Uuid),
}

impl AccessScope {
    pub fn for_actor(actor: &Actor) -> Self {
        match actor.role {
            UserRole::Admin => AccessScope::All,
            UserRole::Professional => AccessScope::Professional(actor.id),
            UserRole::Patient => AccessScope::Patient(actor.id),
        }
    }

    pub fn permits(&self, appointment: &Appointment) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::Professional(id) => appointment.professional_id == *id,
            AccessScope::Patient(id) => appointment.patient_id == *id,
        }
    }

    /// Narrows a store filter to this scope.
    pub fn restrict(&self, mut filter: AppointmentFilter) -> AppointmentFilter {
        match self {
            AccessScope::All => {}
            AccessScope::Professional(id) => filter.professional_id = Some(*id),
            AccessScope::Patient(id) => filter.patient_id = Some(*id),
        }
        filter
    }
}
