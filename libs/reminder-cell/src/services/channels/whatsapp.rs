// libs/reminder-cell/src/services/channels/whatsapp.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::error::ChannelError;
use crate::models::ReminderConfig;
use crate::services::channels::{check_response, ChannelSender};

/// WhatsApp Business Cloud API client
/// POST {base}/{phone_number_id}/messages
pub struct WhatsAppClient {
    client: Client,
    base_url: String,
    access_token: String,
    phone_number_id: String,
}

impl WhatsAppClient {
    pub fn new(config: &AppConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.whatsapp_api_base_url.trim_end_matches('/').to_string(),
            access_token: config.whatsapp_access_token.clone(),
            phone_number_id: config.whatsapp_phone_number_id.clone(),
        }
    }

    fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.access_token.is_empty() && !self.phone_number_id.is_empty()
    }

    /// The Cloud API expects the international number as bare digits.
    pub fn normalize_phone(phone: &str) -> String {
        phone.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    pub async fn send_text(&self, recipient: &str, message: &str) -> Result<(), ChannelError> {
        if !self.is_configured() {
            return Err(ChannelError::NotConfigured);
        }

        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);
        let to = Self::normalize_phone(recipient);

        debug!("Sending WhatsApp message via {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": to,
                "type": "text",
                "text": { "preview_url": false, "body": message }
            }))
            .send()
            .await?;

        check_response("WhatsApp", response).await?;
        info!("WhatsApp message delivered to provider");
        Ok(())
    }
}

#[async_trait]
impl ChannelSender for WhatsAppClient {
    async fn send(
        &self,
        _clinic: &ReminderConfig,
        recipient: &str,
        message: &str,
    ) -> Result<(), ChannelError> {
        self.send_text(recipient, message).await
    }
}
