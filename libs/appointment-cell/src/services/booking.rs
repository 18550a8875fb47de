// libs/appointment-cell/src/services/booking.rs
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::json;
use std::cmp::Ordering;
use std::sync::Arc;
use uuid::Uuid;
use tracing::{info, warn};

use notification_cell::{NotificationDispatcher, NotificationEvent, Recipient};
use shared_config::AppConfig;
use shared_database::StoreClient;
use shared_models::{User, UserProfile};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, AvailabilityCheck, BookAppointmentRequest,
    StatusUpdateRequest,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::slots::SlotGeneratorService;
use crate::services::timeslot::{parse_time_slot, SLOT_DURATION_MINUTES};

/// Decide whether `user` may move `appointment` into `new_status`.
///
/// Doctors approve/reject pending appointments and complete approved ones;
/// cancellation is open to the doctor or to the patient who owns the
/// appointment. Terminal states accept nothing further.
pub fn authorize_transition(
    appointment: &Appointment,
    new_status: AppointmentStatus,
    user: &User,
) -> Result<(), AppointmentError> {
    let current = appointment.status;

    if current.is_terminal() {
        return Err(AppointmentError::Forbidden(format!(
            "Appointment is already {} and cannot be changed",
            current
        )));
    }

    match new_status {
        AppointmentStatus::Pending => Err(AppointmentError::Forbidden(
            "Appointments cannot be moved back to pending".to_string(),
        )),
        AppointmentStatus::Approved | AppointmentStatus::Rejected => {
            if !user.is_doctor() {
                return Err(AppointmentError::Forbidden(
                    "Only doctors can approve or reject appointments".to_string(),
                ));
            }
            if current != AppointmentStatus::Pending {
                return Err(AppointmentError::Forbidden(format!(
                    "Only pending appointments can be {}",
                    new_status
                )));
            }
            Ok(())
        }
        AppointmentStatus::Cancelled => {
            if !user.is_doctor() && user.id != appointment.patient_id {
                return Err(AppointmentError::Forbidden(
                    "You can only cancel your own appointments".to_string(),
                ));
            }
            Ok(())
        }
        AppointmentStatus::Completed => {
            if !user.is_doctor() {
                return Err(AppointmentError::Forbidden(
                    "Only doctors can mark appointments as completed".to_string(),
                ));
            }
            if current != AppointmentStatus::Approved {
                return Err(AppointmentError::Forbidden(
                    "Only approved appointments can be completed".to_string(),
                ));
            }
            Ok(())
        }
    }
}

/// Orchestrates the booking lifecycle: availability checks, transactional
/// slot creation, listing, status transitions and the patient notifications
/// each step triggers.
pub struct BookingService {
    store: Arc<StoreClient>,
    conflict: ConflictDetectionService,
    slots: SlotGeneratorService,
    dispatcher: NotificationDispatcher,
    app_url: String,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let store = Arc::new(StoreClient::new(config));
        Self {
            conflict: ConflictDetectionService::new(store.clone()),
            slots: SlotGeneratorService::new(store.clone()),
            dispatcher: NotificationDispatcher::new(config),
            app_url: config.base_app_url.clone(),
            store,
        }
    }

    pub fn slots(&self) -> &SlotGeneratorService {
        &self.slots
    }

    /// Book a new pending appointment for `user` as the patient.
    ///
    /// The in-process availability check produces the conflict list clients
    /// see; the store function `book_appointment_slot` then re-validates
    /// non-overlap inside a single transaction, so two requests racing for
    /// one slot cannot both land. An empty function result means this
    /// request lost that race.
    pub async fn book_appointment(
        &self,
        request: &BookAppointmentRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let slot = parse_time_slot(&request.date, &request.time)?;

        let check = self
            .conflict
            .check_availability(&request.doctor_id, slot, auth_token)
            .await?;
        if !check.available {
            return Err(AppointmentError::SlotConflict(check.conflicts));
        }

        let now = Utc::now();
        let document = json!({
            "id": Uuid::new_v4().to_string(),
            "doctorId": request.doctor_id,
            "doctorName": request.doctor_name,
            "patientId": user.id,
            "patientName": request.patient_name,
            "patientEmail": request.patient_email,
            "patientPhone": request.patient_phone,
            "date": request.date,
            "time": request.time,
            "reason": request.reason,
            "status": AppointmentStatus::Pending,
            "createdAt": now,
            "updatedAt": now,
        });

        let created: Vec<Appointment> = self
            .store
            .rpc(
                "book_appointment_slot",
                Some(auth_token),
                json!({
                    "p_appointment": document,
                    "p_duration_minutes": SLOT_DURATION_MINUTES,
                }),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let Some(appointment) = created.into_iter().next() else {
            // Lost the race after our check passed; re-scan so the caller
            // still gets the colliding appointments.
            let conflicts = self
                .conflict
                .check_availability(&request.doctor_id, slot, auth_token)
                .await
                .map(|c| c.conflicts)
                .unwrap_or_default();
            return Err(AppointmentError::SlotConflict(conflicts));
        };

        info!(
            appointment_id = %appointment.id,
            doctor_id = %appointment.doctor_id,
            patient_id = %appointment.patient_id,
            "Appointment booked"
        );

        self.notify_booked(&appointment, user, auth_token).await;

        Ok(appointment)
    }

    pub async fn check_availability(
        &self,
        doctor_id: &str,
        date: &str,
        time: &str,
        auth_token: &str,
    ) -> Result<AvailabilityCheck, AppointmentError> {
        let slot = parse_time_slot(date, time)?;
        self.conflict
            .check_availability(doctor_id, slot, auth_token)
            .await
    }

    /// Every appointment the caller is a party to: doctors see their own
    /// schedule, patients their own bookings. Newest slot first; entries
    /// whose stored slot no longer parses sort last.
    pub async fn my_appointments(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let field = if user.is_doctor() { "doctorId" } else { "patientId" };
        let path = format!(
            "/rest/v1/appointments?{}=eq.{}",
            field,
            urlencoding::encode(&user.id)
        );

        let mut appointments: Vec<Appointment> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        appointments.sort_by(|a, b| match (a.slot_start(), b.slot_start()) {
            (Ok(x), Ok(y)) => y.cmp(&x),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => Ordering::Equal,
        });

        Ok(appointments)
    }

    /// Apply a status transition, enforcing the lifecycle and role rules,
    /// then notify the patient of the change.
    pub async fn update_status(
        &self,
        appointment_id: &str,
        request: &StatusUpdateRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;
        authorize_transition(&appointment, request.status, user)?;

        let mut patch = json!({
            "status": request.status,
            "updatedAt": Utc::now(),
        });
        if let Some(notes) = &request.notes {
            patch["statusNotes"] = json!(notes);
        }

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let path = format!(
            "/rest/v1/appointments?id=eq.{}",
            urlencoding::encode(appointment_id)
        );
        let updated: Vec<Appointment> = self
            .store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(patch),
                Some(headers),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let updated = updated
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)?;

        info!(
            appointment_id = %updated.id,
            status = %updated.status,
            changed_by = %user.id,
            "Appointment status updated"
        );

        self.notify_status_change(&updated, auth_token).await;

        Ok(updated)
    }

    async fn fetch_appointment(
        &self,
        appointment_id: &str,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}",
            urlencoding::encode(appointment_id)
        );
        let found: Vec<Appointment> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        found.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// Confirmation to the freshly booked patient. Uses the contact data from
    /// the booking itself; a delivery failure never fails the booking.
    async fn notify_booked(&self, appointment: &Appointment, user: &User, auth_token: &str) {
        let recipient = Recipient {
            user_id: Some(user.id.clone()),
            name: appointment.patient_name.clone(),
            email: Some(appointment.patient_email.clone()),
            phone: appointment.patient_phone.clone(),
            preferences: None,
        };
        let event = NotificationEvent::appointment_booked(
            recipient,
            &appointment.id,
            &appointment.doctor_name,
            &appointment.date,
            &appointment.time,
            &self.app_url,
        );

        let result = self.dispatcher.dispatch(&event, auth_token).await;
        if !result.any_delivered() {
            warn!(
                appointment_id = %appointment.id,
                "Booking confirmation not delivered on any channel"
            );
        }
    }

    async fn notify_status_change(&self, appointment: &Appointment, auth_token: &str) {
        let recipient = self.patient_recipient(appointment, auth_token).await;
        let event = NotificationEvent::appointment_status(
            recipient,
            &appointment.id,
            &appointment.status.to_string(),
            &appointment.doctor_name,
            &appointment.date,
            &appointment.time,
            appointment.status_notes.as_deref(),
            &self.app_url,
        );

        let result = self.dispatcher.dispatch(&event, auth_token).await;
        if !result.any_delivered() {
            warn!(
                appointment_id = %appointment.id,
                status = %appointment.status,
                "Status notification not delivered on any channel"
            );
        }
    }

    /// Resolve the patient's profile for contact data and saved preferences,
    /// falling back to the contact details captured at booking time when the
    /// profile is missing or the lookup fails.
    async fn patient_recipient(&self, appointment: &Appointment, auth_token: &str) -> Recipient {
        let path = format!(
            "/rest/v1/users?id=eq.{}",
            urlencoding::encode(&appointment.patient_id)
        );
        let profiles: Result<Vec<UserProfile>, _> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await;

        let profile = match profiles {
            Ok(mut profiles) => profiles.drain(..).next(),
            Err(e) => {
                warn!(
                    patient_id = %appointment.patient_id,
                    error = %e,
                    "Could not load patient profile, using booking contact data"
                );
                None
            }
        };

        match profile {
            Some(profile) => Recipient {
                user_id: Some(appointment.patient_id.clone()),
                name: profile
                    .display_name
                    .unwrap_or_else(|| appointment.patient_name.clone()),
                email: profile
                    .email
                    .or_else(|| Some(appointment.patient_email.clone())),
                phone: profile.phone.or_else(|| appointment.patient_phone.clone()),
                preferences: profile.preferences,
            },
            None => Recipient {
                user_id: Some(appointment.patient_id.clone()),
                name: appointment.patient_name.clone(),
                email: Some(appointment.patient_email.clone()),
                phone: appointment.patient_phone.clone(),
                preferences: None,
            },
        }
    }
}
