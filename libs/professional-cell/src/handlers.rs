use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::Actor;
use shared_models::error::AppError;

use crate::models::{
    AvailabilityQueryParams, AvailabilityWindowView, CreateAvailabilityRequest,
    UpdateAvailabilityRequest,
};
use crate::services::AvailabilityService;

#[derive(Clone)]
pub struct AvailabilityState {
    pub config: Arc<AppConfig>,
    pub service: Arc<AvailabilityService>,
}

impl AvailabilityState {
    pub fn new(config: Arc<AppConfig>, service: Arc<AvailabilityService>) -> Self {
        Self { config, service }
    }
}

#[axum::debug_handler]
pub async fn list_availabilities(
    State(state): State<AvailabilityState>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<AvailabilityQueryParams>,
) -> Result<Json<Value>, AppError> {
    let windows = state.service.list_for_actor(&actor, params).await?;
    let views: Vec<AvailabilityWindowView> = windows.into_iter().map(Into::into).collect();

    Ok(Json(json!({
        "availabilities": views,
        "total": views.len()
    })))
}

#[axum::debug_handler]
pub async fn create_availability(
    State(state): State<AvailabilityState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let window = state.service.create_for_actor(&actor, request).await?;
    Ok(Json(json!(AvailabilityWindowView::from(window))))
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<AvailabilityState>,
    Extension(actor): Extension<Actor>,
    Path(window_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let window = state.service.get_for_actor(&actor, window_id).await?;
    Ok(Json(json!(AvailabilityWindowView::from(window))))
}

#[axum::debug_handler]
pub async fn update_availability(
    State(state): State<AvailabilityState>,
    Extension(actor): Extension<Actor>,
    Path(window_id): Path<Uuid>,
    Json(changes): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let window = state.service.update_for_actor(&actor, window_id, changes).await?;
    Ok(Json(json!(AvailabilityWindowView::from(window))))
}

#[axum::debug_handler]
pub async fn delete_availability(
    State(state): State<AvailabilityState>,
    Extension(actor): Extension<Actor>,
    Path(window_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.service.delete_for_actor(&actor, window_id).await?;

    Ok(Json(json!({
        "message": "Availability deleted",
        "id": window_id
    })))
}
