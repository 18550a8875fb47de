// libs/notification-cell/src/services/dispatch.rs
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::{ChannelOutcome, DispatchResult, NotificationEvent, Recipient};
use crate::services::providers::{DeliveryProvider, EmailProvider, SmsProvider};

/// Decide which channels an event should go out on.
///
/// Email goes out whenever the recipient has an address, unless their saved
/// preferences explicitly opt out. SMS requires a phone number and, when
/// preferences exist, an explicit opt-in; a recipient with no saved
/// preferences but a phone number still gets the SMS attempt.
pub fn selected_channels(recipient: &Recipient) -> (bool, bool) {
    let email = recipient
        .email
        .as_deref()
        .is_some_and(|e| !e.trim().is_empty())
        && recipient
            .preferences
            .as_ref()
            .map_or(true, |p| p.email_enabled());

    let sms = recipient
        .phone
        .as_deref()
        .is_some_and(|p| !p.trim().is_empty())
        && recipient
            .preferences
            .as_ref()
            .map_or(true, |p| p.sms_enabled());

    (email, sms)
}

/// Fans one rendered event out to every applicable channel concurrently and
/// aggregates the per-channel results. Dispatch never fails: a channel that
/// errors is reported in its own outcome and the others proceed untouched.
pub struct NotificationDispatcher {
    store: Arc<StoreClient>,
    email: EmailProvider,
    sms: SmsProvider,
}

impl NotificationDispatcher {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(StoreClient::new(config)),
            email: EmailProvider::new(config),
            sms: SmsProvider::new(config),
        }
    }

    /// Inject pre-built providers (tests use this to shrink retry backoff).
    pub fn with_providers(store: Arc<StoreClient>, email: EmailProvider, sms: SmsProvider) -> Self {
        Self { store, email, sms }
    }

    pub async fn dispatch(&self, event: &NotificationEvent, auth_token: &str) -> DispatchResult {
        let (email_selected, sms_selected) = selected_channels(&event.recipient);

        let email_fut = async {
            if !email_selected {
                return ChannelOutcome::skipped();
            }
            // selected_channels only passes recipients with an address
            let to = event.recipient.email.as_deref().unwrap_or_default();
            ChannelOutcome::attempted(self.email.send(to, &event.subject, &event.email_body).await)
        };

        let sms_fut = async {
            if !sms_selected {
                return ChannelOutcome::skipped();
            }
            if !self.sms.is_configured() {
                return ChannelOutcome::not_configured();
            }
            let to = event.recipient.phone.as_deref().unwrap_or_default();
            ChannelOutcome::attempted(self.sms.send(to, &event.subject, &event.sms_body).await)
        };

        let (email, sms) = tokio::join!(email_fut, sms_fut);

        let result = DispatchResult {
            email,
            sms,
            sent_at: Utc::now(),
        };

        info!(
            kind = %event.kind,
            recipient = %event.recipient.name,
            email_attempted = result.email.attempted,
            email_success = result.email.success,
            sms_attempted = result.sms.attempted,
            sms_success = result.sms.success,
            "Notification dispatch complete"
        );

        self.record(event, &result, auth_token).await;
        result
    }

    /// Best-effort audit trail. A store failure here is logged and swallowed;
    /// it must never affect the dispatch outcome.
    async fn record(&self, event: &NotificationEvent, result: &DispatchResult, auth_token: &str) {
        let record = json!({
            "type": event.kind,
            "recipientId": event.recipient.user_id,
            "recipientName": event.recipient.name,
            "appointmentId": event.appointment_id,
            "subject": event.subject,
            "email": result.email,
            "sms": result.sms,
            "sentAt": result.sent_at,
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let write: Result<Vec<Value>, _> = self
            .store
            .request_with_headers(
                Method::POST,
                "/rest/v1/notifications",
                Some(auth_token),
                Some(record),
                Some(headers),
            )
            .await;

        if let Err(e) = write {
            warn!(kind = %event.kind, error = %e, "Failed to record notification, continuing");
        }
    }
}
