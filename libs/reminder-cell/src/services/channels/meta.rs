// libs/reminder-cell/src/services/channels/meta.rs
//! Facebook Messenger and Instagram both go through the Graph Send API with
//! the page access token; they differ only in the sending account id.
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::error::ChannelError;
use crate::models::ReminderConfig;
use crate::services::channels::{check_response, ChannelSender};

struct GraphSendApi {
    client: Client,
    base_url: String,
    access_token: String,
    account_id: String,
    provider: &'static str,
}

impl GraphSendApi {
    fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.access_token.is_empty() && !self.account_id.is_empty()
    }

    async fn send(&self, body: Value) -> Result<(), ChannelError> {
        if !self.is_configured() {
            return Err(ChannelError::NotConfigured);
        }

        let url = format!("{}/{}/messages", self.base_url, self.account_id);
        debug!("Sending {} message via {}", self.provider, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        check_response(self.provider, response).await?;
        info!("{} message delivered to provider", self.provider);
        Ok(())
    }
}

/// Facebook Messenger, recipient is the page-scoped user id.
pub struct MessengerClient {
    api: GraphSendApi,
}

impl MessengerClient {
    pub fn new(config: &AppConfig, client: Client) -> Self {
        Self {
            api: GraphSendApi {
                client,
                base_url: config.meta_graph_base_url.trim_end_matches('/').to_string(),
                access_token: config.meta_page_access_token.clone(),
                account_id: config.facebook_page_id.clone(),
                provider: "Messenger",
            },
        }
    }
}

#[async_trait]
impl ChannelSender for MessengerClient {
    async fn send(
        &self,
        _clinic: &ReminderConfig,
        recipient: &str,
        message: &str,
    ) -> Result<(), ChannelError> {
        // Sends outside the 24h messaging window must carry a tag.
        self.api
            .send(json!({
                "recipient": { "id": recipient.trim() },
                "messaging_type": "MESSAGE_TAG",
                "tag": "CONFIRMED_EVENT_UPDATE",
                "message": { "text": message }
            }))
            .await
    }
}

/// Instagram messaging, recipient is the Instagram-scoped user id.
pub struct InstagramClient {
    api: GraphSendApi,
}

impl InstagramClient {
    pub fn new(config: &AppConfig, client: Client) -> Self {
        Self {
            api: GraphSendApi {
                client,
                base_url: config.meta_graph_base_url.trim_end_matches('/').to_string(),
                access_token: config.meta_page_access_token.clone(),
                account_id: config.instagram_account_id.clone(),
                provider: "Instagram",
            },
        }
    }
}

#[async_trait]
impl ChannelSender for InstagramClient {
    async fn send(
        &self,
        _clinic: &ReminderConfig,
        recipient: &str,
        message: &str,
    ) -> Result<(), ChannelError> {
        self.api
            .send(json!({
                "recipient": { "id": recipient.trim() },
                "message": { "text": message }
            }))
            .await
    }
}
