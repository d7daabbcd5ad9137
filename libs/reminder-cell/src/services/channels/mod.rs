// libs/reminder-cell/src/services/channels/mod.rs

pub mod email;
pub mod meta;
pub mod whatsapp;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::error::ChannelError;
use crate::models::ReminderConfig;

pub use email::EmailClient;
pub use meta::{InstagramClient, MessengerClient};
pub use whatsapp::WhatsAppClient;

/// One outbound messaging provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(
        &self,
        clinic: &ReminderConfig,
        recipient: &str,
        message: &str,
    ) -> Result<(), ChannelError>;
}

/// The provider behind each channel slot.
#[derive(Clone)]
pub struct ChannelSenders {
    pub whatsapp: Arc<dyn ChannelSender>,
    pub email: Arc<dyn ChannelSender>,
    pub facebook: Arc<dyn ChannelSender>,
    pub instagram: Arc<dyn ChannelSender>,
}

impl ChannelSenders {
    pub fn from_config(config: &AppConfig) -> Self {
        let client = http_client(config.channel_timeout_seconds);

        Self {
            whatsapp: Arc::new(WhatsAppClient::new(config, client.clone())),
            email: Arc::new(EmailClient::new(config, client.clone())),
            facebook: Arc::new(MessengerClient::new(config, client.clone())),
            instagram: Arc::new(InstagramClient::new(config, client)),
        }
    }
}

pub(crate) fn http_client(timeout_seconds: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .unwrap_or_else(|e| {
            warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
            Client::new()
        })
}

pub(crate) async fn check_response(provider: &str, response: Response) -> Result<(), ChannelError> {
    let status = response.status();
    if status.is_success() {
        debug!("{} accepted message ({})", provider, status);
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    warn!("{} rejected message: {} - {}", provider, status, body);
    Err(ChannelError::Rejected {
        status: status.as_u16(),
        body,
    })
}
