use chrono::{Datelike, Days, NaiveDate};

use crate::models::{Appointment, AppointmentStatistics, AppointmentStatus};

/// Counts appointments by status and by date bucket.
///
/// `this_week` and `this_month` count every appointment on or after the
/// Monday of the current week and the first of the current month, later
/// bookings included. Buckets compare the UTC date of `start_time`.
pub fn compute_statistics(appointments: &[Appointment], today: NaiveDate) -> AppointmentStatistics {
    let week_start = today
        .checked_sub_days(Days::new(today.weekday().num_days_from_monday() as u64))
        .unwrap_or(NaiveDate::MIN);
    let month_start = today.with_day(1).unwrap_or(today);

    let mut stats = AppointmentStatistics {
        total: appointments.len(),
        ..Default::default()
    };

    for appointment in appointments {
        match appointment.status {
            AppointmentStatus::Scheduled => stats.scheduled += 1,
            AppointmentStatus::Confirmed => stats.confirmed += 1,
            AppointmentStatus::Completed => stats.completed += 1,
            AppointmentStatus::Cancelled => stats.cancelled += 1,
            AppointmentStatus::NoShow => stats.no_show += 1,
        }

        let day = appointment.start_time.date_naive();
        if day == today {
            stats.today += 1;
        }
        if day >= week_start {
            stats.this_week += 1;
        }
        if day >= month_start {
            stats.this_month += 1;
        }
    }

    stats
}
