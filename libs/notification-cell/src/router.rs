// libs/notification-cell/src/router.rs
use axum::{middleware, routing::post, Router};
use std::sync::Arc;

use shared_config::AppConfig;
use shared_utils::auth_middleware;

use crate::handlers;

pub fn notification_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/appointment", post(handlers::notify_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
