// libs/appointment-cell/src/services/slots.rs
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::debug;

use shared_database::StoreClient;

use crate::models::{AppointmentError, DaySlots, TimeSlotView};
use crate::services::conflict::{slots_overlap, ConflictDetectionService};
use crate::services::timeslot::{
    format_slot_time, SLOT_DURATION_MINUTES, WORKING_HOURS_END, WORKING_HOURS_START,
};

/// Enumerate every slot start in a working day, in chronological order.
pub fn day_slot_starts(date: NaiveDate) -> Vec<NaiveDateTime> {
    let mut starts = Vec::new();
    for hour in WORKING_HOURS_START..WORKING_HOURS_END {
        for minute in [0u32, 30] {
            if let Some(time) = date.and_hms_opt(hour, minute, 0) {
                starts.push(time);
            }
        }
    }
    starts
}

/// Builds the full-day availability grid for a doctor by overlaying their
/// active appointments onto the working-hours slot lattice.
pub struct SlotGeneratorService {
    conflict: ConflictDetectionService,
}

impl SlotGeneratorService {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self {
            conflict: ConflictDetectionService::new(store),
        }
    }

    pub async fn available_slots(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<DaySlots, AppointmentError> {
        let appointments = self
            .conflict
            .doctor_active_appointments(doctor_id, auth_token)
            .await?;

        // Pre-parse once; appointments with invalid stored slots simply
        // never occupy anything.
        let occupied: Vec<_> = appointments
            .iter()
            .filter_map(|a| a.slot_start().ok().map(|start| (a, start)))
            .collect();

        let mut slots = Vec::new();
        for start in day_slot_starts(date) {
            let taken_by = occupied
                .iter()
                .find(|(_, existing)| slots_overlap(start, *existing, SLOT_DURATION_MINUTES));

            slots.push(match taken_by {
                Some((appointment, _)) => TimeSlotView {
                    time: format_slot_time(start),
                    available: false,
                    appointment_id: Some(appointment.id.clone()),
                    status: Some(appointment.status),
                },
                None => TimeSlotView {
                    time: format_slot_time(start),
                    available: true,
                    appointment_id: None,
                    status: None,
                },
            });
        }

        let available_slots = slots.iter().filter(|s| s.available).count();
        debug!(
            doctor_id = %doctor_id,
            date = %date,
            available = available_slots,
            total = slots.len(),
            "Generated day slots"
        );

        Ok(DaySlots {
            date: date.format("%Y-%m-%d").to_string(),
            doctor_id: doctor_id.to_string(),
            total_slots: slots.len(),
            available_slots,
            slots,
        })
    }
}
