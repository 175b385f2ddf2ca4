// libs/professional-cell/src/models.rs
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::auth::UserRole;

pub const DAY_NAMES: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

/// Recurring weekly interval in which a professional accepts appointments.
///
/// `day_of_week` counts from Monday = 0. A window with `is_available == false`
/// is kept for the professional's records but takes part in no calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityWindow {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AvailabilityWindow {
    pub fn new(
        professional_id: Uuid,
        day_of_week: i32,
        start_time: NaiveTime,
        end_time: NaiveTime,
        is_available: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            professional_id,
            day_of_week,
            start_time,
            end_time,
            is_available,
            created_at: now,
            updated_at: now,
        }
    }

    /// Half-open overlap against `[start, end)`; touching endpoints do not overlap.
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time < end && self.end_time > start
    }

    /// Whether `[start, end)` fits entirely inside this window.
    pub fn contains(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time <= start && self.end_time >= end
    }

    pub fn day_name(&self) -> &'static str {
        day_name(self.day_of_week)
    }
}

pub fn day_name(day_of_week: i32) -> &'static str {
    usize::try_from(day_of_week)
        .ok()
        .and_then(|idx| DAY_NAMES.get(idx).copied())
        .unwrap_or("Unknown")
}

/// Response shape for a window, with the display name of its weekday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWindowView {
    #[serde(flatten)]
    pub window: AvailabilityWindow,
    pub day_name: String,
}

impl From<AvailabilityWindow> for AvailabilityWindowView {
    fn from(window: AvailabilityWindow) -> Self {
        let day_name = window.day_name().to_string();
        Self { window, day_name }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityRequest {
    /// Required when an admin manages someone else's schedule; professionals default to themselves.
    pub professional_id: Option<Uuid>,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub day_of_week: Option<i32>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilityQueryParams {
    pub professional_id: Option<Uuid>,
    pub day: Option<i32>,
}

/// Store-level filter. Results always come back ordered by `(day_of_week, start_time)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowQuery {
    pub professional_id: Option<Uuid>,
    pub day_of_week: Option<i32>,
    pub only_available: bool,
}

impl WindowQuery {
    pub fn available_for(professional_id: Uuid) -> Self {
        Self {
            professional_id: Some(professional_id),
            day_of_week: None,
            only_available: true,
        }
    }

    pub fn matches(&self, window: &AvailabilityWindow) -> bool {
        self.professional_id.map_or(true, |id| window.professional_id == id)
            && self.day_of_week.map_or(true, |day| window.day_of_week == day)
            && (!self.only_available || window.is_available)
    }
}

/// User record as seen by the scheduling core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

impl DirectoryUser {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
