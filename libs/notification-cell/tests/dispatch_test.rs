// libs/notification-cell/tests/dispatch_test.rs
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::{
    notification_routes, EmailProvider, NotificationDispatcher, NotificationEvent, Recipient,
    RetryPolicy, SmsProvider,
};
use shared_config::AppConfig;
use shared_database::StoreClient;
use shared_models::NotificationPreferences;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestHarness {
    store: MockServer,
    sendgrid: MockServer,
    twilio: MockServer,
    config: AppConfig,
}

async fn setup(sms_configured: bool) -> TestHarness {
    let store = MockServer::start().await;
    let sendgrid = MockServer::start().await;
    let twilio = MockServer::start().await;

    let config = TestConfig {
        store_url: store.uri(),
        sendgrid_base_url: sendgrid.uri(),
        twilio_base_url: twilio.uri(),
        sms_configured,
        ..TestConfig::default()
    }
    .to_app_config();

    TestHarness {
        store,
        sendgrid,
        twilio,
        config,
    }
}

impl TestHarness {
    /// Dispatcher with retry backoff shrunk so failure paths finish fast.
    fn dispatcher(&self) -> NotificationDispatcher {
        NotificationDispatcher::with_providers(
            Arc::new(StoreClient::new(&self.config)),
            EmailProvider::with_policy(&self.config, RetryPolicy::immediate(3)),
            SmsProvider::with_policy(&self.config, RetryPolicy::immediate(3)),
        )
    }

    async fn accept_record_writes(&self) {
        Mock::given(method("POST"))
            .and(path("/rest/v1/notifications"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
            .mount(&self.store)
            .await;
    }
}

fn recipient(email: Option<&str>, phone: Option<&str>) -> Recipient {
    Recipient {
        user_id: Some("pat-1".to_string()),
        name: "Ada".to_string(),
        email: email.map(String::from),
        phone: phone.map(String::from),
        preferences: None,
    }
}

fn booked_event(recipient: Recipient) -> NotificationEvent {
    NotificationEvent::appointment_booked(
        recipient,
        "apt-1",
        "Dr. Grey",
        "2025-03-14",
        "10:00 AM",
        "http://localhost:5173",
    )
}

#[tokio::test]
async fn email_delivers_and_unconfigured_sms_reports_not_configured() {
    let harness = setup(false).await;
    harness.accept_record_writes().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "sg-123"))
        .expect(1)
        .mount(&harness.sendgrid)
        .await;

    let result = harness
        .dispatcher()
        .dispatch(
            &booked_event(recipient(Some("ada@example.com"), Some("+15550001"))),
            "test-token",
        )
        .await;

    assert!(result.email.attempted);
    assert!(result.email.success);
    assert_eq!(result.email.message_id.as_deref(), Some("sg-123"));

    assert!(!result.sms.attempted);
    assert!(!result.sms.success);
    assert_eq!(result.sms.error.as_deref(), Some("not configured"));
}

#[tokio::test]
async fn email_failure_is_retried_then_isolated_from_sms() {
    let harness = setup(true).await;
    harness.accept_record_writes().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream sad"))
        .expect(3)
        .mount(&harness.sendgrid)
        .await;

    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/ACtest/Messages.json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sid": "SM123" })))
        .expect(1)
        .mount(&harness.twilio)
        .await;

    let result = harness
        .dispatcher()
        .dispatch(
            &booked_event(recipient(Some("ada@example.com"), Some("+15550001"))),
            "test-token",
        )
        .await;

    assert!(result.email.attempted);
    assert!(!result.email.success);
    assert!(result.email.error.is_some());

    assert!(result.sms.attempted);
    assert!(result.sms.success);
    assert_eq!(result.sms.message_id.as_deref(), Some("SM123"));
}

#[tokio::test]
async fn transient_email_failure_recovers_within_retry_budget() {
    let harness = setup(false).await;
    harness.accept_record_writes().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&harness.sendgrid)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "sg-2nd"))
        .mount(&harness.sendgrid)
        .await;

    let result = harness
        .dispatcher()
        .dispatch(&booked_event(recipient(Some("ada@example.com"), None)), "test-token")
        .await;

    assert!(result.email.success);
    assert_eq!(result.email.message_id.as_deref(), Some("sg-2nd"));
}

#[tokio::test]
async fn explicit_email_opt_out_skips_the_channel() {
    let harness = setup(false).await;
    harness.accept_record_writes().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&harness.sendgrid)
        .await;

    let mut recipient = recipient(Some("ada@example.com"), None);
    recipient.preferences = Some(NotificationPreferences {
        email_notifications: Some(false),
        sms_notifications: None,
    });

    let result = harness
        .dispatcher()
        .dispatch(&booked_event(recipient), "test-token")
        .await;

    assert!(!result.email.attempted);
    assert!(result.email.error.is_none());
}

#[tokio::test]
async fn record_write_failure_does_not_change_the_outcome() {
    let harness = setup(false).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&harness.store)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "sg-123"))
        .mount(&harness.sendgrid)
        .await;

    let result = harness
        .dispatcher()
        .dispatch(&booked_event(recipient(Some("ada@example.com"), None)), "test-token")
        .await;

    assert!(result.email.success);
}

#[tokio::test]
async fn direct_notify_endpoint_returns_the_dispatch_result() {
    let harness = setup(false).await;
    harness.accept_record_writes().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "sg-123"))
        .mount(&harness.sendgrid)
        .await;

    let config = Arc::new(harness.config.clone());
    let router = notification_routes(config.clone());

    let patient = TestUser::patient("ada@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    let request = Request::builder()
        .method("POST")
        .uri("/appointment")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({
                "patientName": "Ada",
                "patientEmail": "ada@example.com",
                "doctorName": "Dr. Grey",
                "date": "2025-03-14",
                "time": "10:00 AM",
                "appointmentId": "apt-1"
            })
            .to_string(),
        ))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["email"]["success"], json!(true));
    assert_eq!(body["sms"]["attempted"], json!(false));
}
