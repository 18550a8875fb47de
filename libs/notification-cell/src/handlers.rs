// libs/notification-cell/src/handlers.rs
use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;
use tracing::info;

use shared_config::AppConfig;
use shared_models::{AppError, User};

use crate::models::{AppointmentNotificationRequest, DispatchResult, NotificationEvent, Recipient};
use crate::services::NotificationDispatcher;

/// Directly dispatch a booking-confirmation notification. Diagnostic surface:
/// the booking flow triggers the same dispatch internally.
pub async fn notify_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<AppointmentNotificationRequest>,
) -> Result<Json<DispatchResult>, AppError> {
    info!(
        user_id = %user.id,
        patient = %request.patient_name,
        "Direct appointment notification requested"
    );

    let recipient = Recipient {
        user_id: Some(user.id.clone()),
        name: request.patient_name.clone(),
        email: Some(request.patient_email.clone()),
        phone: request.patient_phone.clone(),
        preferences: None,
    };

    let event = NotificationEvent::appointment_booked(
        recipient,
        request.appointment_id.as_deref().unwrap_or_default(),
        &request.doctor_name,
        &request.date,
        &request.time,
        &config.base_app_url,
    );

    let dispatcher = NotificationDispatcher::new(&config);
    let result = dispatcher.dispatch(&event, auth.token()).await;

    Ok(Json(result))
}
