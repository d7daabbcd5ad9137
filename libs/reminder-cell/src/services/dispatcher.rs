// libs/reminder-cell/src/services/dispatcher.rs
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{info, instrument, warn};

use shared_config::AppConfig;

use crate::error::ChannelError;
use crate::models::{ContactAddresses, DeliveryAttemptResult, DeliveryChannel, ReminderConfig};
use crate::services::channels::{ChannelSender, ChannelSenders};

/// One step of a fallback plan.
pub struct PlannedAttempt<'a> {
    pub channel: DeliveryChannel,
    pub address: &'a str,
    pub sender: Arc<dyn ChannelSender>,
}

/// Sends a message over the first channel that accepts it.
///
/// Order is fixed: WhatsApp, Email, Facebook, Instagram. Channels without an
/// address are skipped and not counted. No channel is retried within a call.
pub struct MultiChannelDispatcher {
    senders: ChannelSenders,
}

impl MultiChannelDispatcher {
    pub fn new(senders: ChannelSenders) -> Self {
        Self { senders }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(ChannelSenders::from_config(config))
    }

    pub fn plan<'a>(&self, contact: &'a ContactAddresses) -> Vec<PlannedAttempt<'a>> {
        let candidates: [(DeliveryChannel, Option<&'a str>, &Arc<dyn ChannelSender>); 4] = [
            (DeliveryChannel::Whatsapp, Some(contact.phone.as_str()), &self.senders.whatsapp),
            (DeliveryChannel::Email, contact.email.as_deref(), &self.senders.email),
            (DeliveryChannel::Facebook, contact.facebook_id.as_deref(), &self.senders.facebook),
            (DeliveryChannel::Instagram, contact.instagram_id.as_deref(), &self.senders.instagram),
        ];

        candidates
            .into_iter()
            .filter_map(|(channel, address, sender)| {
                let address = address.map(str::trim).filter(|a| !a.is_empty())?;
                Some(PlannedAttempt {
                    channel,
                    address,
                    sender: Arc::clone(sender),
                })
            })
            .collect()
    }

    #[instrument(skip(self, clinic, contact, message), fields(clinic_id = %clinic.clinic_id))]
    pub async fn dispatch(
        &self,
        clinic: &ReminderConfig,
        contact: &ContactAddresses,
        message: &str,
    ) -> DeliveryAttemptResult {
        let plan = self.plan(contact);
        if plan.is_empty() {
            warn!("No contact address available for any channel");
            return DeliveryAttemptResult::exhausted(0, Vec::new());
        }

        let mut attempts = 0u32;
        let mut errors = Vec::new();

        for step in plan {
            attempts += 1;

            let outcome = AssertUnwindSafe(async {
                step.sender.send(clinic, step.address, message).await
            })
            .catch_unwind()
            .await
            .unwrap_or(Err(ChannelError::Panicked));

            match outcome {
                Ok(()) => {
                    info!(channel = %step.channel, attempts, "Message delivered");
                    return DeliveryAttemptResult::sent(step.channel, attempts, errors);
                }
                Err(e) => {
                    let failure = e.into_delivery_failure(step.channel);
                    warn!(channel = %step.channel, "{}, falling back", failure);
                    errors.push(failure.to_string());
                }
            }
        }

        warn!(attempts, "All channels failed");
        DeliveryAttemptResult::exhausted(attempts, errors)
    }
}
