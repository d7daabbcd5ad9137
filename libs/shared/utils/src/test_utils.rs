use std::sync::Arc;
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;

use crate::signature::sign_webhook_payload;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub provider_base_url: String,
    pub access_token: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            provider_base_url: "http://localhost:9999".to_string(),
            access_token: "test-access-token".to_string(),
        }
    }
}

impl TestConfig {
    /// Point both the database and every messaging provider at one mock server.
    pub fn with_mock_server(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            provider_base_url: uri.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            whatsapp_api_base_url: self.provider_base_url.clone(),
            whatsapp_access_token: self.access_token.clone(),
            whatsapp_phone_number_id: "1000001".to_string(),
            whatsapp_verify_token: "test-verify-token".to_string(),
            whatsapp_app_secret: String::new(),
            email_api_base_url: self.provider_base_url.clone(),
            email_api_key: "test-email-key".to_string(),
            meta_graph_base_url: self.provider_base_url.clone(),
            meta_page_access_token: self.access_token.clone(),
            facebook_page_id: "2000002".to_string(),
            instagram_account_id: "3000003".to_string(),
            channel_timeout_seconds: 5,
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct WebhookTestUtils;

impl WebhookTestUtils {
    pub fn sign(body: &str, app_secret: &str) -> String {
        sign_webhook_payload(body.as_bytes(), app_secret)
            .expect("HMAC can take key of any size")
    }

    /// A WhatsApp Cloud API inbound text message notification.
    pub fn whatsapp_text_message(from: &str, text: &str) -> serde_json::Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "WABA_ID",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {
                            "display_phone_number": "34910000000",
                            "phone_number_id": "1000001"
                        },
                        "contacts": [{ "profile": { "name": "Paciente" }, "wa_id": from }],
                        "messages": [{
                            "from": from,
                            "id": format!("wamid.{}", Uuid::new_v4().simple()),
                            "timestamp": "1700000000",
                            "type": "text",
                            "text": { "body": text }
                        }]
                    }
                }]
            }]
        })
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn clinic_response(clinic_id: &str) -> serde_json::Value {
        json!({
            "id": clinic_id,
            "name": "Clínica Dental Sonrisa",
            "whatsapp_number": "+34 910 000 000",
            "email": "citas@sonrisa.example",
            "timezone": "Europe/Madrid",
            "locale": "es-ES"
        })
    }

    pub fn appointment_lookup_response(appointment_id: &str, clinic_id: &str) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "clinic_id": clinic_id,
            "status": "scheduled"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
