// libs/appointment-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use shared_config::AppConfig;
use shared_utils::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/check-availability", post(handlers::check_availability))
        .route("/book", post(handlers::book_appointment))
        .route("/available-slots/{doctor_id}", get(handlers::available_slots))
        .route("/my-appointments", get(handlers::my_appointments))
        .route("/{appointment_id}/status", put(handlers::update_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
