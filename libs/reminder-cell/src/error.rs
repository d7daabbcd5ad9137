use thiserror::Error;

use shared_models::error::AppError;

use crate::models::DeliveryChannel;

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{channel}: {reason}")]
    ChannelDeliveryFailure {
        channel: DeliveryChannel,
        reason: String,
    },

    #[error("All channels exhausted after {attempts} attempt(s)")]
    AllChannelsExhausted { attempts: u32, errors: Vec<String> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<anyhow::Error> for ReminderError {
    fn from(err: anyhow::Error) -> Self {
        ReminderError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for ReminderError {
    fn from(err: serde_json::Error) -> Self {
        ReminderError::Store(format!("Unexpected row shape: {}", err))
    }
}

impl From<ReminderError> for AppError {
    fn from(err: ReminderError) -> Self {
        match err {
            ReminderError::InvalidInput(msg) => AppError::ValidationError(msg),
            ReminderError::NotFound(msg) => AppError::NotFound(msg),
            ReminderError::Store(msg) => AppError::Database(msg),
            other @ ReminderError::ChannelDeliveryFailure { .. }
            | other @ ReminderError::AllChannelsExhausted { .. } => {
                AppError::ExternalService(other.to_string())
            }
        }
    }
}

/// Failure of one provider call. Never escapes a single dispatch attempt.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("channel not configured")]
    NotConfigured,

    #[error("provider rejected message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sender panicked")]
    Panicked,
}

impl ChannelError {
    pub fn into_delivery_failure(self, channel: DeliveryChannel) -> ReminderError {
        ReminderError::ChannelDeliveryFailure {
            channel,
            reason: self.to_string(),
        }
    }
}
