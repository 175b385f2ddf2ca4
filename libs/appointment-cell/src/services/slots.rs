// libs/appointment-cell/src/services/slots.rs
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use uuid::Uuid;

use professional_cell::models::AvailabilityWindow;
use shared_config::AppConfig;

use crate::error::AppointmentError;
use crate::models::{Appointment, Slot};

/// Defaults and caps applied to slot queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPolicy {
    pub default_slot_minutes: i64,
    pub default_range_days: i64,
    pub max_range_days: i64,
}

impl Default for SlotPolicy {
    fn default() -> Self {
        Self {
            default_slot_minutes: 30,
            default_range_days: 7,
            max_range_days: 30,
        }
    }
}

impl SlotPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_slot_minutes: config.default_slot_minutes,
            default_range_days: config.default_slot_range_days,
            max_range_days: config.max_slot_range_days,
        }
    }

    /// Fills in missing bounds and truncates spans longer than the cap.
    /// Bounds past the last representable date stop at that date.
    pub fn resolve_range(
        &self,
        today: NaiveDate,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> (NaiveDate, NaiveDate) {
        let from = date_from.unwrap_or(today);
        let to = date_to.unwrap_or_else(|| add_days(from, self.default_range_days));

        let cap = add_days(from, self.max_range_days);
        (from, to.min(cap))
    }

    pub fn slot_duration(&self, slot_minutes: Option<i64>) -> Result<Duration, AppointmentError> {
        let minutes = slot_minutes.unwrap_or(self.default_slot_minutes);
        if minutes <= 0 || minutes > MINUTES_PER_DAY {
            return Err(AppointmentError::validation(
                "slot_duration",
                format!(
                    "Slot duration must be between 1 and {} minutes, got {}",
                    MINUTES_PER_DAY, minutes
                ),
            ));
        }
        Ok(Duration::minutes(minutes))
    }
}

const MINUTES_PER_DAY: i64 = 24 * 60;

fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_days(Days::new(days.max(0) as u64))
        .unwrap_or(NaiveDate::MAX)
}

/// Lays fixed-length slots over a professional's weekly windows for each
/// date in `[date_from, date_to]` and drops those overlapping an active
/// appointment.
///
/// `windows` must already be ordered by `(day_of_week, start_time)`; output
/// follows date, then window, then time order. Deterministic for equal input.
pub struct SlotEnumerator<'a> {
    pub professional_id: Uuid,
    pub professional_name: &'a str,
    pub windows: &'a [AvailabilityWindow],
    pub appointments: &'a [Appointment],
}

impl<'a> SlotEnumerator<'a> {
    pub fn enumerate(&self, date_from: NaiveDate, date_to: NaiveDate, slot: Duration) -> Vec<Slot> {
        let mut slots = Vec::new();

        let windows: Vec<&AvailabilityWindow> = self
            .windows
            .iter()
            .filter(|w| w.is_available && w.professional_id == self.professional_id)
            .collect();

        if windows.is_empty() || slot <= Duration::zero() {
            return slots;
        }

        for date in date_from.iter_days().take_while(|d| *d <= date_to) {
            let day_of_week = date.weekday().num_days_from_monday() as i32;

            for window in windows.iter().filter(|w| w.day_of_week == day_of_week) {
                let window_start = date.and_time(window.start_time).and_utc();
                let window_end = date.and_time(window.end_time).and_utc();

                let mut cursor = window_start;
                while let Some(slot_end) = cursor.checked_add_signed(slot) {
                    if slot_end > window_end {
                        break;
                    }
                    if self.is_free(cursor, slot_end) {
                        slots.push(Slot {
                            start_time: cursor,
                            end_time: slot_end,
                            professional_id: self.professional_id,
                            professional_name: self.professional_name.to_string(),
                        });
                    }
                    cursor = slot_end;
                }
            }
        }

        slots
    }

    fn is_free(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        !self
            .appointments
            .iter()
            .any(|appt| appt.is_active() && appt.overlaps(start, end))
    }
}
