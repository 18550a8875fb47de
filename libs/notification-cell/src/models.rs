// libs/notification-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use shared_models::NotificationPreferences;

// ==============================================================================
// DISPATCH MODELS
// ==============================================================================

/// Who a notification is addressed to, with whatever contact data and
/// preferences the caller could resolve. Absent preferences mean the
/// recipient never saved any; channel defaults then apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub preferences: Option<NotificationPreferences>,
}

/// A fully rendered notification, ready to fan out across channels.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    /// e.g. `appointment_booked`, `appointment_approved`.
    pub kind: String,
    pub recipient: Recipient,
    pub subject: String,
    pub email_body: String,
    pub sms_body: String,
    pub appointment_id: Option<String>,
}

impl NotificationEvent {
    /// Notification sent to the patient right after their booking request
    /// lands in `pending`.
    pub fn appointment_booked(
        recipient: Recipient,
        appointment_id: &str,
        doctor_name: &str,
        date: &str,
        time: &str,
        app_url: &str,
    ) -> Self {
        let email_body = format!(
            "Hi {},\n\nYour appointment request with {} for {} at {} has been received \
             and is awaiting the doctor's confirmation. We will notify you as soon as \
             it is reviewed.\n\nManage your appointments at {}\n\nThe E-Booklet Team",
            recipient.name, doctor_name, date, time, app_url
        );
        let sms_body = format!(
            "E-Booklet: your appointment request with {} for {} at {} was received and is pending confirmation.",
            doctor_name, date, time
        );

        Self {
            kind: "appointment_booked".to_string(),
            recipient,
            subject: "Appointment Request Received - E-Booklet".to_string(),
            email_body,
            sms_body,
            appointment_id: Some(appointment_id.to_string()),
        }
    }

    /// Notification sent to the patient when an appointment changes status.
    pub fn appointment_status(
        recipient: Recipient,
        appointment_id: &str,
        status: &str,
        doctor_name: &str,
        date: &str,
        time: &str,
        notes: Option<&str>,
        app_url: &str,
    ) -> Self {
        let (subject, summary) = match status {
            "approved" => (
                "Appointment Confirmed - E-Booklet",
                format!(
                    "Good news! Your appointment with {} on {} at {} has been approved.",
                    doctor_name, date, time
                ),
            ),
            "rejected" => (
                "Appointment Update - E-Booklet",
                format!(
                    "Unfortunately, your appointment with {} on {} at {} could not be \
                     accommodated. Please book another time that works for you.",
                    doctor_name, date, time
                ),
            ),
            "cancelled" => (
                "Appointment Cancelled - E-Booklet",
                format!(
                    "Your appointment with {} on {} at {} has been cancelled.",
                    doctor_name, date, time
                ),
            ),
            "completed" => (
                "Appointment Completed - E-Booklet",
                format!(
                    "Your appointment with {} on {} at {} has been marked as completed. \
                     Thank you for visiting.",
                    doctor_name, date, time
                ),
            ),
            other => (
                "Appointment Update - E-Booklet",
                format!(
                    "Your appointment with {} on {} at {} is now {}.",
                    doctor_name, date, time, other
                ),
            ),
        };

        let mut email_body = format!("Hi {},\n\n{}", recipient.name, summary);
        if let Some(notes) = notes {
            if !notes.is_empty() {
                email_body.push_str(&format!("\n\nNote from the clinic: {}", notes));
            }
        }
        email_body.push_str(&format!("\n\nManage your appointments at {}", app_url));
        email_body.push_str("\n\nThe E-Booklet Team");

        Self {
            kind: format!("appointment_{}", status),
            recipient,
            subject: subject.to_string(),
            email_body,
            sms_body: format!("E-Booklet: {}", summary),
            appointment_id: Some(appointment_id.to_string()),
        }
    }
}

// ==============================================================================
// OUTCOME MODELS
// ==============================================================================

/// What a delivery provider reports back for a single send. Providers never
/// return `Err`; delivery failure is data, not a fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub success: bool,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn delivered(message_id: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Per-channel result inside an aggregate dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOutcome {
    /// Whether a provider send was actually invoked for this channel.
    pub attempted: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChannelOutcome {
    pub fn skipped() -> Self {
        Self {
            attempted: false,
            success: false,
            message_id: None,
            error: None,
        }
    }

    pub fn not_configured() -> Self {
        Self {
            attempted: false,
            success: false,
            message_id: None,
            error: Some("not configured".to_string()),
        }
    }

    pub fn attempted(outcome: SendOutcome) -> Self {
        Self {
            attempted: true,
            success: outcome.success,
            message_id: outcome.message_id,
            error: outcome.error,
        }
    }
}

/// Aggregate result of fanning one event out across all channels. Dispatch
/// always produces one of these; it has no error path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub email: ChannelOutcome,
    pub sms: ChannelOutcome,
    pub sent_at: DateTime<Utc>,
}

impl DispatchResult {
    pub fn any_delivered(&self) -> bool {
        self.email.success || self.sms.success
    }
}

// ==============================================================================
// RETRY POLICY
// ==============================================================================

/// Exponential backoff for provider sends: up to `max_attempts` tries,
/// doubling the wait between them but never beyond `max_backoff`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Tight policy for tests so retry paths finish instantly.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Payload for the direct notification endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentNotificationRequest {
    pub patient_name: String,
    pub patient_email: String,
    #[serde(default)]
    pub patient_phone: Option<String>,
    pub doctor_name: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub appointment_id: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

/// Internal provider faults. These never cross the dispatcher boundary; they
/// are folded into [`SendOutcome`]s after retries are exhausted.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
