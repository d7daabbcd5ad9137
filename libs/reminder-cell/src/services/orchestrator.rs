// libs/reminder-cell/src/services/orchestrator.rs
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::ReminderError;
use crate::models::{
    AppointmentData, AppointmentRef, ConfirmationOutcome, ContactAddresses, DeliveryAttemptResult,
    DueSendResult, Language, ReminderConfig, ReminderKind, ScheduleResult, ScheduledSend,
};
use crate::services::composer::MessageComposer;
use crate::services::confirmation::{ConfirmationInterpreter, ReplyClass};
use crate::services::dispatcher::MultiChannelDispatcher;
use crate::services::schedule::calculate_reminder_schedule;
use crate::services::store::{ReminderStore, SupabaseReminderStore};

/// Entry point for the reminder workflow.
///
/// Stateless between calls: everything a call needs arrives as arguments or
/// comes from the store.
pub struct ReminderOrchestrator {
    composer: MessageComposer,
    dispatcher: MultiChannelDispatcher,
    store: Arc<dyn ReminderStore>,
}

impl ReminderOrchestrator {
    pub fn new(
        composer: MessageComposer,
        dispatcher: MultiChannelDispatcher,
        store: Arc<dyn ReminderStore>,
    ) -> Self {
        Self {
            composer,
            dispatcher,
            store,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            MessageComposer::new(),
            MultiChannelDispatcher::from_config(config),
            Arc::new(SupabaseReminderStore::new(config)),
        )
    }

    pub fn store(&self) -> &Arc<dyn ReminderStore> {
        &self.store
    }

    // ==========================================================================
    // SCHEDULING
    // ==========================================================================

    /// Computes the schedule. Failures land in `errors`, never in `Err`.
    pub fn schedule_all_reminders(
        &self,
        config: &ReminderConfig,
        appointment: &AppointmentData,
    ) -> ScheduleResult {
        match calculate_reminder_schedule(
            appointment.appointment_id,
            appointment.appointment_date,
            &appointment.appointment_time,
        ) {
            Ok(schedule) => {
                debug!(
                    "Computed reminder schedule for appointment {} at clinic {}",
                    appointment.appointment_id, config.clinic_id
                );
                ScheduleResult {
                    appointment_id: appointment.appointment_id,
                    schedule: Some(schedule),
                    errors: Vec::new(),
                }
            }
            Err(e) => {
                warn!(
                    "Could not schedule reminders for appointment {}: {}",
                    appointment.appointment_id, e
                );
                ScheduleResult {
                    appointment_id: appointment.appointment_id,
                    schedule: None,
                    errors: vec![e.to_string()],
                }
            }
        }
    }

    /// Validates, computes and persists the schedule for one appointment.
    pub async fn schedule_and_store(
        &self,
        config: &ReminderConfig,
        appointment: &AppointmentData,
    ) -> ScheduleResult {
        if let Err(e) = appointment.validate() {
            return ScheduleResult {
                appointment_id: appointment.appointment_id,
                schedule: None,
                errors: vec![e.to_string()],
            };
        }

        let mut result = self.schedule_all_reminders(config, appointment);
        let Some(schedule) = result.schedule.as_ref() else {
            return result;
        };

        let stored = match config.time_zone().and_then(|tz| schedule.to_utc(tz)) {
            Ok(utc) => self.store.save_schedule(&config.clinic_id, &utc).await,
            Err(e) => Err(e),
        };

        if let Err(e) = stored {
            warn!(
                "Reminder schedule for appointment {} not stored: {}",
                appointment.appointment_id, e
            );
            result.errors.push(e.to_string());
        }

        result
    }

    /// One result per appointment, in input order.
    #[instrument(skip(self, config, appointments), fields(clinic_id = %config.clinic_id, count = appointments.len()))]
    pub async fn schedule_batch(
        &self,
        config: &ReminderConfig,
        appointments: &[AppointmentData],
    ) -> Vec<ScheduleResult> {
        let mut results = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            results.push(self.schedule_and_store(config, appointment).await);
        }

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        info!("Scheduled {} appointment(s), {} with errors", results.len(), failed);
        results
    }

    // ==========================================================================
    // SENDING
    // ==========================================================================

    pub fn generate_message(
        &self,
        config: &ReminderConfig,
        appointment: &AppointmentData,
        send: ScheduledSend,
    ) -> String {
        match send.reminder_kind() {
            Some(kind) => self.composer.generate_reminder_message(config, appointment, kind),
            None => self.composer.generate_thank_you_message(config, appointment),
        }
    }

    pub async fn send_reminder_with_fallback(
        &self,
        config: &ReminderConfig,
        appointment: &AppointmentData,
        kind: ReminderKind,
    ) -> DeliveryAttemptResult {
        self.deliver(config, appointment, kind.into()).await
    }

    pub async fn send_thank_you(
        &self,
        config: &ReminderConfig,
        appointment: &AppointmentData,
    ) -> DeliveryAttemptResult {
        self.deliver(config, appointment, ScheduledSend::ThankYou).await
    }

    /// Fires every send due in `(window_start, now]`, earliest first.
    ///
    /// Calling twice with overlapping windows sends twice; the trigger owns
    /// the window bookkeeping.
    pub async fn process_due_sends(
        &self,
        config: &ReminderConfig,
        appointment: &AppointmentData,
        window_start: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<Vec<DueSendResult>, ReminderError> {
        let schedule = calculate_reminder_schedule(
            appointment.appointment_id,
            appointment.appointment_date,
            &appointment.appointment_time,
        )?;

        let due = schedule.due_between(window_start, now);
        debug!(
            "{} send(s) due for appointment {} in ({}, {}]",
            due.len(),
            appointment.appointment_id,
            window_start,
            now
        );

        let mut results = Vec::with_capacity(due.len());
        for send in due {
            let result = self.deliver(config, appointment, send).await;
            results.push(DueSendResult {
                send,
                fire_at: schedule.fire_time(send),
                result,
            });
        }

        Ok(results)
    }

    #[instrument(skip(self, config, appointment), fields(appointment_id = %appointment.appointment_id))]
    async fn deliver(
        &self,
        config: &ReminderConfig,
        appointment: &AppointmentData,
        send: ScheduledSend,
    ) -> DeliveryAttemptResult {
        let message = self.generate_message(config, appointment, send);
        let result = self
            .dispatcher
            .dispatch(config, &appointment.contact, &message)
            .await;

        if result.success {
            info!("{} sent via {} after {} attempt(s)", send, result.channel, result.attempts);
        } else {
            warn!("{} not delivered: {:?}", send, result.status);
        }

        if let Err(e) = self
            .store
            .record_delivery(&config.clinic_id, appointment.appointment_id, send, &result)
            .await
        {
            warn!("Failed to log {} delivery: {}", send, e);
        }

        result
    }

    // ==========================================================================
    // CONFIRMATIONS
    // ==========================================================================

    /// Classifies a reply without touching the store.
    pub fn process_patient_confirmation(
        &self,
        appointment_id: Uuid,
        reply_text: &str,
    ) -> ConfirmationOutcome {
        debug!("Interpreting reply for appointment {}", appointment_id);
        ConfirmationInterpreter::default().interpret(reply_text)
    }

    /// Classifies a reply and records its effect on the appointment.
    pub async fn apply_patient_confirmation(
        &self,
        appointment_id: Uuid,
        reply_text: &str,
    ) -> Result<ConfirmationOutcome, ReminderError> {
        let appointment = self
            .store
            .find_appointment(appointment_id)
            .await?
            .ok_or_else(|| {
                ReminderError::NotFound(format!("Appointment {} not found", appointment_id))
            })?;

        let language = match self.store.get_reminder_config(&appointment.clinic_id).await {
            Ok(config) => config.language(),
            Err(e) => {
                warn!("Clinic settings unavailable, replying in default language: {}", e);
                Language::Spanish
            }
        };

        self.apply_reply(&appointment, reply_text, language).await
    }

    /// Handles a free-text reply arriving from `phone` and answers the patient.
    ///
    /// Returns `None` when the sender has no upcoming appointment.
    #[instrument(skip(self, reply_text))]
    pub async fn handle_inbound_reply(
        &self,
        phone: &str,
        reply_text: &str,
    ) -> Result<Option<ConfirmationOutcome>, ReminderError> {
        let Some(appointment) = self.store.find_appointment_by_phone(phone).await? else {
            warn!("No upcoming appointment for inbound reply");
            return Ok(None);
        };

        let config = self.store.get_reminder_config(&appointment.clinic_id).await?;
        let outcome = self
            .apply_reply(&appointment, reply_text, config.language())
            .await?;

        let contact = ContactAddresses {
            phone: phone.to_string(),
            ..ContactAddresses::default()
        };
        let answer = self.dispatcher.dispatch(&config, &contact, &outcome.message).await;
        if !answer.success {
            warn!("Could not answer patient: {:?}", answer.errors);
        }

        Ok(Some(outcome))
    }

    async fn apply_reply(
        &self,
        appointment: &AppointmentRef,
        reply_text: &str,
        language: Language,
    ) -> Result<ConfirmationOutcome, ReminderError> {
        let interpreter = ConfirmationInterpreter::new(language);
        let outcome = interpreter.interpret(reply_text);

        match interpreter.classify(reply_text) {
            ReplyClass::Confirmed => {
                self.store
                    .mark_appointment_confirmed(appointment.appointment_id)
                    .await?;
            }
            ReplyClass::NeedsRescheduling => {
                self.store
                    .create_rescheduling_request(appointment, reply_text)
                    .await?;
            }
            ReplyClass::Unrecognized => {
                debug!(
                    "Unrecognized reply for appointment {}, asking again",
                    appointment.appointment_id
                );
            }
        }

        Ok(outcome)
    }
}
