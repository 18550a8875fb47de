// libs/appointment-cell/src/services/conflict.rs
use chrono::{Duration, NaiveDateTime};
use reqwest::Method;
use std::sync::Arc;
use tracing::{debug, warn};

use shared_database::StoreClient;

use crate::models::{Appointment, AppointmentError, AvailabilityCheck, ConflictingAppointment};
use crate::services::timeslot::SLOT_DURATION_MINUTES;

/// Two fixed-duration slots overlap iff each starts before the other ends.
/// Intervals are half-open, so back-to-back slots (e.g. 10:00 and 10:30 with
/// 30-minute duration) do not collide.
pub fn slots_overlap(a: NaiveDateTime, b: NaiveDateTime, duration_minutes: i64) -> bool {
    let duration = Duration::minutes(duration_minutes);
    a < b + duration && b < a + duration
}

/// Scans a doctor's slot-occupying appointments for collisions with a
/// requested slot. This is the single source of truth for what counts as a
/// conflict; the booking path re-validates inside the store transaction but
/// the conflict list clients see always comes from here.
pub struct ConflictDetectionService {
    store: Arc<StoreClient>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    /// Fetch every appointment for `doctor_id` that still occupies its slot
    /// (i.e. not cancelled or rejected).
    pub async fn doctor_active_appointments(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctorId=eq.{}",
            urlencoding::encode(doctor_id)
        );

        let appointments: Vec<Appointment> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(appointments
            .into_iter()
            .filter(|a| a.status.occupies_slot())
            .collect())
    }

    /// Check whether `slot` is free for `doctor_id`, returning every
    /// colliding appointment when it is not.
    ///
    /// Existing appointments whose stored date/time no longer parse are
    /// skipped with a warning rather than failing the whole check.
    pub async fn check_availability(
        &self,
        doctor_id: &str,
        slot: NaiveDateTime,
        auth_token: &str,
    ) -> Result<AvailabilityCheck, AppointmentError> {
        let appointments = self
            .doctor_active_appointments(doctor_id, auth_token)
            .await?;

        let mut conflicts = Vec::new();
        for appointment in &appointments {
            match appointment.slot_start() {
                Ok(existing) => {
                    if slots_overlap(slot, existing, SLOT_DURATION_MINUTES) {
                        conflicts.push(ConflictingAppointment {
                            appointment_id: appointment.id.clone(),
                            patient_name: appointment.patient_name.clone(),
                            time: appointment.time.clone(),
                            status: appointment.status,
                        });
                    }
                }
                Err(_) => {
                    warn!(
                        appointment_id = %appointment.id,
                        date = %appointment.date,
                        time = %appointment.time,
                        "Skipping appointment with unparsable time slot during conflict check"
                    );
                }
            }
        }

        debug!(
            doctor_id = %doctor_id,
            slot = %slot,
            conflicts = conflicts.len(),
            "Availability check complete"
        );

        Ok(AvailabilityCheck {
            available: conflicts.is_empty(),
            conflicts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn identical_slots_overlap() {
        assert!(slots_overlap(at(10, 0), at(10, 0), 30));
    }

    #[test]
    fn partial_overlap_detected_both_directions() {
        assert!(slots_overlap(at(10, 0), at(10, 15), 30));
        assert!(slots_overlap(at(10, 15), at(10, 0), 30));
    }

    #[test]
    fn back_to_back_slots_do_not_overlap() {
        assert!(!slots_overlap(at(10, 0), at(10, 30), 30));
        assert!(!slots_overlap(at(10, 30), at(10, 0), 30));
    }

    #[test]
    fn distinct_days_never_overlap() {
        let other_day = NaiveDate::from_ymd_opt(2025, 3, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert!(!slots_overlap(at(10, 0), other_day, 30));
    }

    #[test]
    fn one_minute_of_overlap_is_enough() {
        assert!(slots_overlap(at(10, 0), at(10, 29), 30));
        assert!(!slots_overlap(at(10, 0), at(10, 30), 30));
    }
}
