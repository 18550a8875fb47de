use serde::{Deserialize, Serialize};

/// A document from the `users` collection. Contact fields and notification
/// preferences live here; either may be absent for older accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub preferences: Option<NotificationPreferences>,
}

/// Per-user channel opt-in flags. Email defaults to enabled, SMS to disabled
/// when a flag is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub email_notifications: Option<bool>,
    pub sms_notifications: Option<bool>,
}

impl NotificationPreferences {
    pub fn email_enabled(&self) -> bool {
        self.email_notifications.unwrap_or(true)
    }

    pub fn sms_enabled(&self) -> bool {
        self.sms_notifications.unwrap_or(false)
    }
}
