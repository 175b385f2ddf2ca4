use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use professional_cell::router::availability_routes;

use crate::state::AppServices;

pub fn create_router(services: &AppServices) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/availabilities", availability_routes(services.availability_state()))
        .nest("/appointments", appointment_routes(services.appointment_state()))
}
