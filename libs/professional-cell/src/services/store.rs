use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::{AvailabilityWindow, WindowQuery};

/// Persistence seam for availability windows.
///
/// Implementations only store rows; overlap rules are enforced by
/// [`crate::services::AvailabilityService`] while it holds the professional's lock.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn insert(&self, window: AvailabilityWindow) -> Result<AvailabilityWindow, StorageError>;

    async fn update(&self, window: AvailabilityWindow) -> Result<AvailabilityWindow, StorageError>;

    /// Returns `false` when no window had the given id.
    async fn delete(&self, id: Uuid) -> Result<bool, StorageError>;

    async fn get(&self, id: Uuid) -> Result<Option<AvailabilityWindow>, StorageError>;

    /// Matching windows ordered by `(day_of_week, start_time)`.
    async fn list(&self, query: &WindowQuery) -> Result<Vec<AvailabilityWindow>, StorageError>;
}

#[derive(Default)]
pub struct InMemoryAvailabilityStore {
    windows: RwLock<HashMap<Uuid, AvailabilityWindow>>,
}

impl InMemoryAvailabilityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryAvailabilityStore {
    async fn insert(&self, window: AvailabilityWindow) -> Result<AvailabilityWindow, StorageError> {
        let mut windows = self.windows.write().await;
        if windows.contains_key(&window.id) {
            return Err(StorageError::new(format!("duplicate availability id {}", window.id)));
        }
        windows.insert(window.id, window.clone());
        Ok(window)
    }

    async fn update(&self, window: AvailabilityWindow) -> Result<AvailabilityWindow, StorageError> {
        let mut windows = self.windows.write().await;
        match windows.get_mut(&window.id) {
            Some(existing) => {
                *existing = window.clone();
                Ok(window)
            }
            None => Err(StorageError::new(format!("availability {} does not exist", window.id))),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        Ok(self.windows.write().await.remove(&id).is_some())
    }

    async fn get(&self, id: Uuid) -> Result<Option<AvailabilityWindow>, StorageError> {
        Ok(self.windows.read().await.get(&id).cloned())
    }

    async fn list(&self, query: &WindowQuery) -> Result<Vec<AvailabilityWindow>, StorageError> {
        let windows = self.windows.read().await;
        let mut matching: Vec<AvailabilityWindow> = windows
            .values()
            .filter(|window| query.matches(window))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            (a.day_of_week, a.start_time, a.created_at, a.id)
                .cmp(&(b.day_of_week, b.start_time, b.created_at, b.id))
        });

        Ok(matching)
    }
}
