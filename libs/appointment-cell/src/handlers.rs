// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use shared_config::AppConfig;
use shared_models::{AppError, User};

use crate::models::{
    AppointmentError, BookAppointmentRequest, CheckAvailabilityRequest, StatusUpdateRequest,
};
use crate::services::BookingService;

fn map_error(error: AppointmentError) -> AppError {
    match error {
        AppointmentError::InvalidTimeSlot(msg) => AppError::BadRequest(msg),
        AppointmentError::SlotConflict(conflicts) => AppError::Conflict {
            message: "This time slot is already booked. Please choose another time.".to_string(),
            conflicts: json!(conflicts),
        },
        AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

pub async fn check_availability(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CheckAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&config);
    let check = service
        .check_availability(&request.doctor_id, &request.date, &request.time, auth.token())
        .await
        .map_err(map_error)?;

    let message = if check.available {
        "This time slot is available"
    } else {
        "This time slot is already booked"
    };

    Ok(Json(json!({
        "available": check.available,
        "message": message,
        "conflicts": check.conflicts,
    })))
}

pub async fn book_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!(
        patient_id = %user.id,
        doctor_id = %request.doctor_id,
        date = %request.date,
        time = %request.time,
        "Booking appointment"
    );

    let service = BookingService::new(&config);
    let appointment = service
        .book_appointment(&request, &user, auth.token())
        .await
        .map_err(map_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Appointment booked successfully",
            "appointmentId": appointment.id,
            "appointment": appointment,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: String,
}

pub async fn available_slots(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let date = NaiveDate::parse_from_str(query.date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("unrecognized date '{}'", query.date)))?;

    let service = BookingService::new(&config);
    let day = service
        .slots()
        .available_slots(&doctor_id, date, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!(day)))
}

pub async fn my_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&config);
    let appointments = service
        .my_appointments(&user, auth.token())
        .await
        .map_err(map_error)?;

    let total = appointments.len();
    Ok(Json(json!({
        "appointments": appointments,
        "total": total,
    })))
}

pub async fn update_status(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        appointment_id = %appointment_id,
        new_status = %request.status,
        user_id = %user.id,
        "Updating appointment status"
    );

    let service = BookingService::new(&config);
    let appointment = service
        .update_status(&appointment_id, &request, &user, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Appointment {}", appointment.status),
        "appointment": appointment,
    })))
}
