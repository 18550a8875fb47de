// libs/appointment-cell/src/services/timeslot.rs
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::models::AppointmentError;

/// Every slot is exactly half an hour.
pub const SLOT_DURATION_MINUTES: i64 = 30;

/// Working day boundaries. Slots start on :00 and :30 from 09:00 through
/// 16:30, the last slot ending at 17:00.
pub const WORKING_HOURS_START: u32 = 9;
pub const WORKING_HOURS_END: u32 = 17;

/// Parse a client-entered date plus 12-hour time into the slot start instant.
///
/// Accepts dates as either `2025-03-14` or `March 14, 2025`, and times as
/// `10:00 AM` (leading zero optional, case-insensitive meridiem). Surrounding
/// whitespace is tolerated. None of the stored strings are rewritten; callers
/// keep echoing the originals.
pub fn parse_time_slot(date: &str, time: &str) -> Result<NaiveDateTime, AppointmentError> {
    let date = date.trim();
    let time = time.trim();

    let parsed_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date, "%B %d, %Y"))
        .map_err(|_| AppointmentError::InvalidTimeSlot(format!("unrecognized date '{date}'")))?;

    let parsed_time = NaiveTime::parse_from_str(time, "%I:%M %p")
        .map_err(|_| AppointmentError::InvalidTimeSlot(format!("unrecognized time '{time}'")))?;

    Ok(parsed_date.and_time(parsed_time))
}

/// Render a slot start back into the canonical `01:30 PM` display form
/// (zero-padded 12-hour clock, the same shape `%I:%M %p` produces).
pub fn format_slot_time(slot: NaiveDateTime) -> String {
    let hour24 = slot.hour();
    let hour12 = match hour24 % 12 {
        0 => 12,
        h => h,
    };
    let meridiem = if hour24 < 12 { "AM" } else { "PM" };
    format!("{:02}:{:02} {}", hour12, slot.minute(), meridiem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    #[test]
    fn parses_iso_date_with_morning_time() {
        let slot = parse_time_slot("2025-03-14", "10:00 AM").unwrap();
        assert_eq!(
            slot,
            NaiveDate::from_ymd_opt(2025, 3, 14)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn parses_long_form_date() {
        let slot = parse_time_slot("March 14, 2025", "2:30 PM").unwrap();
        assert_eq!(
            slot,
            NaiveDate::from_ymd_opt(2025, 3, 14)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn tolerates_whitespace_and_lowercase_meridiem() {
        let slot = parse_time_slot("  2025-03-14  ", " 9:00 am ").unwrap();
        assert_eq!(slot.hour(), 9);
    }

    #[test]
    fn noon_and_midnight_are_unambiguous() {
        let noon = parse_time_slot("2025-03-14", "12:00 PM").unwrap();
        assert_eq!(noon.hour(), 12);
        let midnight = parse_time_slot("2025-03-14", "12:00 AM").unwrap();
        assert_eq!(midnight.hour(), 0);
    }

    #[test]
    fn rejects_malformed_date() {
        assert_matches!(
            parse_time_slot("14/03/2025", "10:00 AM"),
            Err(AppointmentError::InvalidTimeSlot(_))
        );
    }

    #[test]
    fn rejects_24_hour_time() {
        assert_matches!(
            parse_time_slot("2025-03-14", "14:30"),
            Err(AppointmentError::InvalidTimeSlot(_))
        );
    }

    #[test]
    fn formats_with_zero_padded_hour() {
        let slot = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(13, 30, 0)
            .unwrap();
        assert_eq!(format_slot_time(slot), "01:30 PM");
    }

    #[test]
    fn format_round_trips_through_parse() {
        let slot = parse_time_slot("2025-03-14", "09:00 AM").unwrap();
        assert_eq!(format_slot_time(slot), "09:00 AM");
        assert_eq!(parse_time_slot("2025-03-14", &format_slot_time(slot)).unwrap(), slot);
    }
}
