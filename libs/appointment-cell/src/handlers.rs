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
    AppointmentListQuery, AppointmentStatus, AppointmentView, AvailableSlotsQuery,
    CreateAppointmentRequest, UpcomingQuery, UpdatePaymentRequest, UpdateStatusRequest,
};
use crate::services::AppointmentBookingService;

#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<AppointmentBookingService>,
}

impl AppointmentState {
    pub fn new(config: Arc<AppConfig>, booking: Arc<AppointmentBookingService>) -> Self {
        Self { config, booking }
    }
}

fn appointment_json(view: AppointmentView) -> Json<Value> {
    Json(json!(view))
}

// ==============================================================================
// BOOKING & QUERIES
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppointmentState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.create_appointment(&actor, request).await?;
    Ok(appointment_json(appointment.into()))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppointmentState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.booking.list_appointments(&actor, query).await?;
    let views: Vec<AppointmentView> = appointments.into_iter().map(Into::into).collect();

    Ok(Json(json!({
        "appointments": views,
        "total": views.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.get_appointment(&actor, appointment_id).await?;
    Ok(appointment_json(appointment.into()))
}

#[axum::debug_handler]
pub async fn get_upcoming_appointments(
    State(state): State<AppointmentState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.booking.upcoming_appointments(&actor, query.limit).await?;
    let views: Vec<AppointmentView> = appointments.into_iter().map(Into::into).collect();

    Ok(Json(json!({
        "appointments": views,
        "total": views.len()
    })))
}

#[axum::debug_handler]
pub async fn get_statistics(
    State(state): State<AppointmentState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let stats = state.booking.statistics(&actor).await?;
    Ok(Json(json!(stats)))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<AppointmentState>,
    Extension(_actor): Extension<Actor>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let professional_id = query.professional_id;
    let slots = state.booking.available_slots(query).await?;

    Ok(Json(json!({
        "professional_id": professional_id,
        "slots": slots,
        "total": slots.len()
    })))
}

// ==============================================================================
// STATUS & PAYMENT
// ==============================================================================

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppointmentState>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .booking
        .update_status(&actor, appointment_id, request.status)
        .await?;
    Ok(appointment_json(appointment.into()))
}

async fn transition(
    state: &AppointmentState,
    actor: &Actor,
    appointment_id: Uuid,
    status: AppointmentStatus,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.update_status(actor, appointment_id, status).await?;

    Ok(Json(json!({
        "message": format!("Appointment {}", status),
        "appointment": AppointmentView::from(appointment)
    })))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<AppointmentState>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    transition(&state, &actor, appointment_id, AppointmentStatus::Confirmed).await
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    transition(&state, &actor, appointment_id, AppointmentStatus::Cancelled).await
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppointmentState>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    transition(&state, &actor, appointment_id, AppointmentStatus::Completed).await
}

#[axum::debug_handler]
pub async fn mark_no_show(
    State(state): State<AppointmentState>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    transition(&state, &actor, appointment_id, AppointmentStatus::NoShow).await
}

#[axum::debug_handler]
pub async fn update_payment(
    State(state): State<AppointmentState>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .booking
        .update_payment(&actor, appointment_id, request)
        .await?;
    Ok(appointment_json(appointment.into()))
}
