use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use professional_cell::StorageError;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentStatus};
use crate::services::store::{AppointmentFilter, AppointmentStore, SortOrder};

const APPOINTMENTS_TABLE: &str = "/rest/v1/appointments";

fn timestamp(value: DateTime<Utc>) -> String {
    urlencoding::encode(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true)).into_owned()
}

fn decode_row(rows: Vec<Value>, what: &str) -> Result<Appointment, StorageError> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("{} returned no rows", what))?;
    serde_json::from_value(row).map_err(|e| StorageError::new(format!("malformed appointment row: {}", e)))
}

/// Appointments stored in the `appointments` table.
///
/// The booking service serializes writes per professional inside one
/// process. Deployments running several processes also need an exclusion
/// constraint on `(professional_id, tstzrange(start_time, end_time))` for
/// active rows; a constraint violation comes back as a `StorageError`.
pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn list_path(filter: &AppointmentFilter) -> String {
        let mut params = Vec::new();

        if let Some(professional_id) = filter.professional_id {
            params.push(format!("professional_id=eq.{}", professional_id));
        }
        if let Some(patient_id) = filter.patient_id {
            params.push(format!("patient_id=eq.{}", patient_id));
        }
        if !filter.statuses.is_empty() {
            let statuses: Vec<&str> = filter.statuses.iter().map(|s| s.as_str()).collect();
            params.push(format!("status=in.({})", statuses.join(",")));
        }
        if let Some(from) = filter.starts_at_or_after {
            params.push(format!("start_time=gte.{}", timestamp(from)));
        }
        if let Some(to) = filter.starts_before {
            params.push(format!("start_time=lt.{}", timestamp(to)));
        }
        if let Some(from) = filter.ends_after {
            params.push(format!("end_time=gt.{}", timestamp(from)));
        }

        let order = match filter.order {
            SortOrder::StartAscending => "start_time.asc",
            SortOrder::StartDescending => "start_time.desc",
        };
        params.push(format!("order={}", order));

        if let Some(limit) = filter.limit {
            params.push(format!("limit={}", limit));
        }

        format!("{}?{}", APPOINTMENTS_TABLE, params.join("&"))
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StorageError> {
        debug!(
            "Inserting appointment {} for professional {}",
            appointment.id, appointment.professional_id
        );

        let body = serde_json::to_value(&appointment).map_err(|e| StorageError::new(e.to_string()))?;
        let rows = self
            .supabase
            .write_returning(Method::POST, APPOINTMENTS_TABLE, Some(body))
            .await?;

        decode_row(rows, "appointment insert")
    }

    async fn update_if_status(
        &self,
        appointment: Appointment,
        expected: AppointmentStatus,
    ) -> Result<Option<Appointment>, StorageError> {
        debug!("Updating appointment {} (expecting {})", appointment.id, expected);

        // PATCH matches no row once another writer changed the status
        let path = format!(
            "{}?id=eq.{}&status=eq.{}",
            APPOINTMENTS_TABLE,
            appointment.id,
            expected.as_str()
        );
        let body = serde_json::to_value(&appointment).map_err(|e| StorageError::new(e.to_string()))?;
        let rows = self.supabase.write_returning(Method::PATCH, &path, Some(body)).await?;

        if rows.is_empty() {
            return Ok(None);
        }
        decode_row(rows, "appointment update").map(Some)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StorageError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_TABLE, id);
        let mut rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.pop())
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StorageError> {
        let path = Self::list_path(filter);
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows)
    }
}
