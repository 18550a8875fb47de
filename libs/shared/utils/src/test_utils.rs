use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub store_url: String,
    pub store_anon_key: String,
    pub sendgrid_base_url: String,
    pub twilio_base_url: String,
    pub sms_configured: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            store_url: "http://localhost:54321".to_string(),
            store_anon_key: "test-anon-key".to_string(),
            sendgrid_base_url: "http://localhost:54322".to_string(),
            twilio_base_url: "http://localhost:54323".to_string(),
            sms_configured: false,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            store_url: self.store_url.clone(),
            store_anon_key: self.store_anon_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            base_app_url: "http://localhost:5173".to_string(),
            sendgrid_api_key: "test-sendgrid-key".to_string(),
            sendgrid_from_email: "noreply@ebooklet.test".to_string(),
            sendgrid_base_url: self.sendgrid_base_url.clone(),
            twilio_account_sid: if self.sms_configured {
                "ACtest".to_string()
            } else {
                String::new()
            },
            twilio_auth_token: if self.sms_configured {
                "test-twilio-token".to_string()
            } else {
                String::new()
            },
            twilio_from_number: if self.sms_configured {
                "+15550000000".to_string()
            } else {
                String::new()
            },
            twilio_base_url: self.twilio_base_url.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned store documents for wiremock-backed tests.
pub struct MockStoreDocs;

impl MockStoreDocs {
    pub fn user_doc(user_id: &str, email: &str, phone: Option<&str>, role: &str) -> serde_json::Value {
        json!({
            "id": user_id,
            "displayName": "Test User",
            "email": email,
            "phone": phone,
            "role": role,
            "preferences": {
                "emailNotifications": true,
                "smsNotifications": phone.is_some()
            }
        })
    }

    pub fn appointment_doc(
        appointment_id: &str,
        doctor_id: &str,
        patient_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "doctorId": doctor_id,
            "doctorName": "Dr. Test",
            "patientId": patient_id,
            "patientName": "Test Patient",
            "patientEmail": "patient@example.com",
            "patientPhone": null,
            "date": date,
            "time": time,
            "reason": "General consultation",
            "status": status,
            "statusNotes": null,
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z"
        })
    }
}
