use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::StorageError;
use crate::models::{AvailabilityWindow, DirectoryUser, WindowQuery};
use crate::services::directory::UserDirectory;
use crate::services::store::AvailabilityStore;

const AVAILABILITY_TABLE: &str = "/rest/v1/professional_availabilities";
const USERS_TABLE: &str = "/rest/v1/users";

fn window_row(window: &AvailabilityWindow) -> Value {
    json!({
        "id": window.id,
        "professional_id": window.professional_id,
        "day_of_week": window.day_of_week,
        "start_time": window.start_time.format("%H:%M:%S").to_string(),
        "end_time": window.end_time.format("%H:%M:%S").to_string(),
        "is_available": window.is_available,
        "created_at": window.created_at.to_rfc3339(),
        "updated_at": window.updated_at.to_rfc3339()
    })
}

fn first_row<T: serde::de::DeserializeOwned>(rows: Vec<Value>, what: &str) -> Result<T, StorageError> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("{} returned no rows", what))?;
    serde_json::from_value(row).map_err(|e| StorageError::new(format!("malformed {} row: {}", what, e)))
}

/// Availability windows stored in the `professional_availabilities` table.
pub struct SupabaseAvailabilityStore {
    supabase: SupabaseClient,
}

impl SupabaseAvailabilityStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn list_path(query: &WindowQuery) -> String {
        let mut filters = Vec::new();

        if let Some(professional_id) = query.professional_id {
            filters.push(format!("professional_id=eq.{}", professional_id));
        }
        if let Some(day) = query.day_of_week {
            filters.push(format!("day_of_week=eq.{}", day));
        }
        if query.only_available {
            filters.push("is_available=eq.true".to_string());
        }
        filters.push("order=day_of_week.asc,start_time.asc".to_string());

        format!("{}?{}", AVAILABILITY_TABLE, filters.join("&"))
    }
}

#[async_trait]
impl AvailabilityStore for SupabaseAvailabilityStore {
    async fn insert(&self, window: AvailabilityWindow) -> Result<AvailabilityWindow, StorageError> {
        debug!("Inserting availability {} for professional {}", window.id, window.professional_id);

        let rows = self
            .supabase
            .write_returning(Method::POST, AVAILABILITY_TABLE, Some(window_row(&window)))
            .await?;

        first_row(rows, "availability insert")
    }

    async fn update(&self, window: AvailabilityWindow) -> Result<AvailabilityWindow, StorageError> {
        debug!("Updating availability {}", window.id);

        let path = format!("{}?id=eq.{}", AVAILABILITY_TABLE, window.id);
        let rows = self
            .supabase
            .write_returning(Method::PATCH, &path, Some(window_row(&window)))
            .await?;

        first_row(rows, "availability update")
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        let path = format!("{}?id=eq.{}", AVAILABILITY_TABLE, id);
        let rows = self.supabase.write_returning(Method::DELETE, &path, None).await?;
        Ok(!rows.is_empty())
    }

    async fn get(&self, id: Uuid) -> Result<Option<AvailabilityWindow>, StorageError> {
        let path = format!("{}?id=eq.{}", AVAILABILITY_TABLE, id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        if rows.is_empty() {
            return Ok(None);
        }
        first_row(rows, "availability").map(Some)
    }

    async fn list(&self, query: &WindowQuery) -> Result<Vec<AvailabilityWindow>, StorageError> {
        let path = Self::list_path(query);
        let windows: Vec<AvailabilityWindow> =
            self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(windows)
    }
}

/// User lookups against the `users` table.
pub struct SupabaseUserDirectory {
    supabase: SupabaseClient,
}

impl SupabaseUserDirectory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl UserDirectory for SupabaseUserDirectory {
    async fn find_user(&self, id: Uuid) -> Result<Option<DirectoryUser>, StorageError> {
        let path = format!(
            "{}?id=eq.{}&select=id,email,first_name,last_name,role",
            USERS_TABLE, id
        );
        let mut users: Vec<DirectoryUser> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(users.pop())
    }
}
