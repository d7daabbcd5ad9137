// libs/reminder-cell/src/services/channels/email.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::error::ChannelError;
use crate::models::{Language, ReminderConfig};
use crate::services::channels::{check_response, ChannelSender};

/// Transactional email over HTTP (SendGrid v3 mail/send shape).
pub struct EmailClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EmailClient {
    pub fn new(config: &AppConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.email_api_base_url.trim_end_matches('/').to_string(),
            api_key: config.email_api_key.clone(),
        }
    }

    fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.api_key.is_empty()
    }

    pub fn subject_for(clinic: &ReminderConfig) -> String {
        match clinic.language() {
            Language::Spanish => format!("Recordatorio de tu cita en {}", clinic.clinic_name),
            Language::Portuguese => format!("Lembrete da sua consulta na {}", clinic.clinic_name),
            Language::English => format!("Appointment reminder from {}", clinic.clinic_name),
        }
    }
}

#[async_trait]
impl ChannelSender for EmailClient {
    async fn send(
        &self,
        clinic: &ReminderConfig,
        recipient: &str,
        message: &str,
    ) -> Result<(), ChannelError> {
        if !self.is_configured() || clinic.email.trim().is_empty() {
            return Err(ChannelError::NotConfigured);
        }

        let url = format!("{}/v3/mail/send", self.base_url);
        debug!("Sending reminder email via {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "personalizations": [{ "to": [{ "email": recipient.trim() }] }],
                "from": { "email": clinic.email.trim(), "name": clinic.clinic_name },
                "subject": Self::subject_for(clinic),
                "content": [{ "type": "text/plain", "value": message }]
            }))
            .send()
            .await?;

        check_response("Email", response).await?;
        info!("Reminder email accepted for delivery");
        Ok(())
    }
}
