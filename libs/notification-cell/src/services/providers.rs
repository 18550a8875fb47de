// libs/notification-cell/src/services/providers.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{NotificationError, RetryPolicy, SendOutcome};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A single delivery channel. `send` never returns `Err`: after the retry
/// budget is spent, the last failure is reported inside the outcome.
#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    fn channel(&self) -> &'static str;
    fn is_configured(&self) -> bool;
    async fn send(&self, to: &str, subject: &str, body: &str) -> SendOutcome;
}

/// Run `attempt` under a retry policy, converting the final result into a
/// [`SendOutcome`]. Backoff doubles per attempt, capped by the policy.
async fn send_with_retry<F, Fut>(
    policy: &RetryPolicy,
    channel: &str,
    to: &str,
    attempt: F,
) -> SendOutcome
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<String>, NotificationError>>,
{
    let mut backoff = policy.initial_backoff;

    for try_number in 1..=policy.max_attempts {
        match attempt().await {
            Ok(message_id) => {
                debug!(channel, to, try_number, "Notification delivered");
                return SendOutcome::delivered(message_id);
            }
            Err(e) if try_number < policy.max_attempts => {
                warn!(channel, to, try_number, error = %e, "Delivery attempt failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, policy.max_backoff);
            }
            Err(e) => {
                warn!(channel, to, try_number, error = %e, "Delivery failed, retries exhausted");
                return SendOutcome::failed(e.to_string());
            }
        }
    }

    // max_attempts is at least 1, so the loop always returns.
    SendOutcome::failed("no delivery attempts made")
}

// ==============================================================================
// EMAIL (SendGrid)
// ==============================================================================

pub struct EmailProvider {
    client: Client,
    api_key: String,
    from_email: String,
    base_url: String,
    policy: RetryPolicy,
}

impl EmailProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_policy(config, RetryPolicy::default())
    }

    pub fn with_policy(config: &AppConfig, policy: RetryPolicy) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: config.sendgrid_api_key.clone(),
            from_email: config.sendgrid_from_email.clone(),
            base_url: config.sendgrid_base_url.clone(),
            policy,
        }
    }

    async fn attempt(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<Option<String>, NotificationError> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from_email, "name": "E-Booklet" },
            "subject": subject,
            "content": [{ "type": "text/plain", "value": body }],
        });

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let message_id = response
            .headers()
            .get("X-Message-Id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        Ok(message_id)
    }
}

#[async_trait]
impl DeliveryProvider for EmailProvider {
    fn channel(&self) -> &'static str {
        "email"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.from_email.is_empty()
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> SendOutcome {
        if !self.is_configured() {
            return SendOutcome::failed("not configured");
        }
        send_with_retry(&self.policy, self.channel(), to, || {
            self.attempt(to, subject, body)
        })
        .await
    }
}

// ==============================================================================
// SMS (Twilio)
// ==============================================================================

pub struct SmsProvider {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
    policy: RetryPolicy,
}

impl SmsProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_policy(config, RetryPolicy::default())
    }

    pub fn with_policy(config: &AppConfig, policy: RetryPolicy) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_from_number.clone(),
            base_url: config.twilio_base_url.clone(),
            policy,
        }
    }

    async fn attempt(&self, to: &str, body: &str) -> Result<Option<String>, NotificationError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        let params = [
            ("From", self.from_number.as_str()),
            ("To", to),
            ("Body", body),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        Ok(payload
            .get("sid")
            .and_then(Value::as_str)
            .map(String::from))
    }
}

#[async_trait]
impl DeliveryProvider for SmsProvider {
    fn channel(&self) -> &'static str {
        "sms"
    }

    fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }

    /// Unconfigured SMS fails immediately with no retries; the subject is
    /// ignored since SMS has no subject line.
    async fn send(&self, to: &str, _subject: &str, body: &str) -> SendOutcome {
        if !self.is_configured() {
            debug!(to, "SMS provider not configured, skipping send");
            return SendOutcome::failed("not configured");
        }
        send_with_retry(&self.policy, self.channel(), to, || self.attempt(to, body)).await
    }
}
