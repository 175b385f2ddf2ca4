use axum::{
    middleware,
    routing::get,
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AvailabilityState};

pub fn availability_routes(state: AvailabilityState) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::list_availabilities).post(handlers::create_availability),
        )
        .route(
            "/{window_id}",
            get(handlers::get_availability)
                .put(handlers::update_availability)
                .delete(handlers::delete_availability),
        )
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
