use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per professional.
///
/// Check-then-write sequences for a professional's schedule run while holding
/// that professional's guard. Different professionals never contend.
#[derive(Default)]
pub struct ProfessionalLocks {
    table: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl ProfessionalLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, professional_id: Uuid) -> OwnedMutexGuard<()> {
        let slot = {
            let mut table = self
                .table
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            table.entry(professional_id).or_default().clone()
        };

        slot.lock_owned().await
    }
}
