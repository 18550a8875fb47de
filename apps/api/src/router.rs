use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use notification_cell::router::notification_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "E-Booklet API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/notify", notification_routes(state.clone()))
}
