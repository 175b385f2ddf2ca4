use std::sync::Arc;

use chrono::{NaiveTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_models::auth::{Actor, UserRole};

use crate::error::AvailabilityError;
use crate::models::{
    day_name, AvailabilityQueryParams, AvailabilityWindow, CreateAvailabilityRequest,
    UpdateAvailabilityRequest, WindowQuery,
};
use crate::services::directory::{require_role, UserDirectory};
use crate::services::locks::ProfessionalLocks;
use crate::services::store::AvailabilityStore;

/// Range and weekday checks shared by add and update.
pub fn validate_window_shape(
    day_of_week: i32,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<(), AvailabilityError> {
    if !(0..=6).contains(&day_of_week) {
        return Err(AvailabilityError::validation(
            "day_of_week",
            format!("Day of week must be between 0 (Monday) and 6 (Sunday), got {}", day_of_week),
        ));
    }

    if start_time >= end_time {
        return Err(AvailabilityError::InvalidRange {
            start: start_time,
            end: end_time,
        });
    }

    Ok(())
}

/// First available window in `existing` that overlaps the candidate, skipping `exclude_id`.
pub fn find_overlap<'a>(
    existing: &'a [AvailabilityWindow],
    candidate: &AvailabilityWindow,
    exclude_id: Option<Uuid>,
) -> Option<&'a AvailabilityWindow> {
    existing.iter().find(|window| {
        Some(window.id) != exclude_id
            && window.is_available
            && window.professional_id == candidate.professional_id
            && window.day_of_week == candidate.day_of_week
            && window.overlaps(candidate.start_time, candidate.end_time)
    })
}

pub struct AvailabilityService {
    store: Arc<dyn AvailabilityStore>,
    directory: Arc<dyn UserDirectory>,
    locks: ProfessionalLocks,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn AvailabilityStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            store,
            directory,
            locks: ProfessionalLocks::new(),
        }
    }

    pub fn directory(&self) -> Arc<dyn UserDirectory> {
        self.directory.clone()
    }

    /// Stores a new window, rejecting bad ranges and overlaps with the
    /// professional's other available windows on the same day.
    #[instrument(skip(self))]
    pub async fn add_window(
        &self,
        professional_id: Uuid,
        day_of_week: i32,
        start_time: NaiveTime,
        end_time: NaiveTime,
        is_available: bool,
    ) -> Result<AvailabilityWindow, AvailabilityError> {
        validate_window_shape(day_of_week, start_time, end_time)?;

        let window = AvailabilityWindow::new(professional_id, day_of_week, start_time, end_time, is_available);

        let _guard = self.locks.acquire(professional_id).await;
        self.ensure_no_overlap(&window, None).await?;

        let stored = self.store.insert(window).await?;
        info!(
            "Availability {} added for professional {} on {} {}-{}",
            stored.id,
            professional_id,
            stored.day_name(),
            stored.start_time,
            stored.end_time
        );

        Ok(stored)
    }

    pub async fn update_window(
        &self,
        window_id: Uuid,
        changes: UpdateAvailabilityRequest,
    ) -> Result<AvailabilityWindow, AvailabilityError> {
        let current = self.require_window(window_id).await?;

        let _guard = self.locks.acquire(current.professional_id).await;
        // Re-read under the lock so the overlap check sees the latest row
        let mut updated = self.require_window(window_id).await?;

        if let Some(day) = changes.day_of_week {
            updated.day_of_week = day;
        }
        if let Some(start) = changes.start_time {
            updated.start_time = start;
        }
        if let Some(end) = changes.end_time {
            updated.end_time = end;
        }
        if let Some(is_available) = changes.is_available {
            updated.is_available = is_available;
        }

        validate_window_shape(updated.day_of_week, updated.start_time, updated.end_time)?;
        self.ensure_no_overlap(&updated, Some(window_id)).await?;

        updated.updated_at = Utc::now();
        let stored = self.store.update(updated).await?;
        info!("Availability {} updated", stored.id);

        Ok(stored)
    }

    pub async fn delete_window(&self, window_id: Uuid) -> Result<(), AvailabilityError> {
        if !self.store.delete(window_id).await? {
            return Err(AvailabilityError::NotFound(format!("Availability {}", window_id)));
        }

        info!("Availability {} deleted", window_id);
        Ok(())
    }

    pub async fn get_window(&self, window_id: Uuid) -> Result<Option<AvailabilityWindow>, AvailabilityError> {
        Ok(self.store.get(window_id).await?)
    }

    /// Windows of a professional, optionally for one weekday, ordered by `(day_of_week, start_time)`.
    pub async fn list_windows(
        &self,
        professional_id: Uuid,
        day_of_week: Option<i32>,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        let query = WindowQuery {
            professional_id: Some(professional_id),
            day_of_week,
            only_available: false,
        };
        Ok(self.store.list(&query).await?)
    }

    /// Only the windows that take part in scheduling.
    pub async fn available_windows(
        &self,
        professional_id: Uuid,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        Ok(self.store.list(&WindowQuery::available_for(professional_id)).await?)
    }

    async fn require_window(&self, window_id: Uuid) -> Result<AvailabilityWindow, AvailabilityError> {
        self.store
            .get(window_id)
            .await?
            .ok_or_else(|| AvailabilityError::NotFound(format!("Availability {}", window_id)))
    }

    async fn ensure_no_overlap(
        &self,
        candidate: &AvailabilityWindow,
        exclude_id: Option<Uuid>,
    ) -> Result<(), AvailabilityError> {
        if !candidate.is_available {
            return Ok(());
        }

        let query = WindowQuery {
            professional_id: Some(candidate.professional_id),
            day_of_week: Some(candidate.day_of_week),
            only_available: true,
        };
        let existing = self.store.list(&query).await?;

        if let Some(clash) = find_overlap(&existing, candidate, exclude_id) {
            warn!(
                "Availability {}-{} for professional {} overlaps window {}",
                candidate.start_time, candidate.end_time, candidate.professional_id, clash.id
            );
            return Err(AvailabilityError::Overlap {
                existing_id: clash.id,
                day_name: day_name(candidate.day_of_week),
                start: clash.start_time,
                end: clash.end_time,
            });
        }

        Ok(())
    }

    pub async fn create_for_actor(
        &self,
        actor: &Actor,
        request: CreateAvailabilityRequest,
    ) -> Result<AvailabilityWindow, AvailabilityError> {
        debug!("Actor {} ({}) creating availability", actor.id, actor.role);

        let professional_id = match actor.role {
            UserRole::Professional => match request.professional_id {
                Some(id) if id != actor.id => {
                    return Err(AvailabilityError::Forbidden(
                        "Professionals can only manage their own availability".to_string(),
                    ))
                }
                _ => actor.id,
            },
            UserRole::Admin => {
                let id = request.professional_id.ok_or_else(|| {
                    AvailabilityError::validation("professional_id", "professional_id is required")
                })?;
                require_role(self.directory.as_ref(), id, UserRole::Professional, "professional_id").await?;
                id
            }
            UserRole::Patient => {
                return Err(AvailabilityError::Forbidden(
                    "Patients cannot manage availability".to_string(),
                ))
            }
        };

        self.add_window(
            professional_id,
            request.day_of_week,
            request.start_time,
            request.end_time,
            request.is_available.unwrap_or(true),
        )
        .await
    }

    pub async fn update_for_actor(
        &self,
        actor: &Actor,
        window_id: Uuid,
        changes: UpdateAvailabilityRequest,
    ) -> Result<AvailabilityWindow, AvailabilityError> {
        let window = self.require_window(window_id).await?;
        ensure_can_manage(actor, window.professional_id)?;
        self.update_window(window_id, changes).await
    }

    pub async fn delete_for_actor(&self, actor: &Actor, window_id: Uuid) -> Result<(), AvailabilityError> {
        let window = self.require_window(window_id).await?;
        ensure_can_manage(actor, window.professional_id)?;
        self.delete_window(window_id).await
    }

    /// Professionals see their own windows, patients only available ones.
    pub async fn get_for_actor(
        &self,
        actor: &Actor,
        window_id: Uuid,
    ) -> Result<AvailabilityWindow, AvailabilityError> {
        let window = self.require_window(window_id).await?;

        let visible = match actor.role {
            UserRole::Admin => true,
            UserRole::Professional => window.professional_id == actor.id,
            UserRole::Patient => window.is_available,
        };

        if !visible {
            return Err(AvailabilityError::NotFound(format!("Availability {}", window_id)));
        }

        Ok(window)
    }

    pub async fn list_for_actor(
        &self,
        actor: &Actor,
        params: AvailabilityQueryParams,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        let query = match actor.role {
            UserRole::Admin => WindowQuery {
                professional_id: params.professional_id,
                day_of_week: params.day,
                only_available: false,
            },
            UserRole::Professional => WindowQuery {
                professional_id: Some(actor.id),
                day_of_week: params.day,
                only_available: false,
            },
            UserRole::Patient => WindowQuery {
                professional_id: params.professional_id,
                day_of_week: params.day,
                only_available: true,
            },
        };

        Ok(self.store.list(&query).await?)
    }
}

fn ensure_can_manage(actor: &Actor, professional_id: Uuid) -> Result<(), AvailabilityError> {
    if actor.is_admin() || (actor.is_professional() && actor.id == professional_id) {
        return Ok(());
    }

    Err(AvailabilityError::Forbidden(
        "Only the owning professional or an admin can change this availability".to_string(),
    ))
}
