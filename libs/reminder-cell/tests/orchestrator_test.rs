// libs/reminder-cell/tests/orchestrator_test.rs
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use reminder_cell::error::{ChannelError, ReminderError};
use reminder_cell::models::*;
use reminder_cell::services::{
    ChannelSender, ChannelSenders, MessageComposer, MultiChannelDispatcher, ReminderOrchestrator,
    ReminderStore,
};

// =====================================================================================
// TEST DOUBLES
// =====================================================================================

#[derive(Default)]
struct InMemoryStore {
    clinics: Mutex<Vec<ReminderConfig>>,
    appointments: Mutex<Vec<(AppointmentRef, String)>>,
    schedules: Mutex<Vec<(String, UtcReminderSchedule)>>,
    deliveries: Mutex<Vec<(Uuid, ScheduledSend, DeliveryAttemptResult)>>,
    confirmed: Mutex<Vec<Uuid>>,
    rescheduling: Mutex<Vec<(Uuid, String)>>,
}

impl InMemoryStore {
    fn with_clinic(clinic: ReminderConfig) -> Self {
        let store = Self::default();
        store.clinics.lock().unwrap().push(clinic);
        store
    }

    fn add_appointment(&self, appointment_id: Uuid, clinic_id: &str, phone: &str) {
        self.appointments.lock().unwrap().push((
            AppointmentRef {
                appointment_id,
                clinic_id: clinic_id.to_string(),
            },
            phone.to_string(),
        ));
    }
}

#[async_trait]
impl ReminderStore for InMemoryStore {
    async fn get_reminder_config(&self, clinic_id: &str) -> Result<ReminderConfig, ReminderError> {
        self.clinics
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.clinic_id == clinic_id)
            .cloned()
            .ok_or_else(|| ReminderError::NotFound(clinic_id.to_string()))
    }

    async fn find_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<AppointmentRef>, ReminderError> {
        Ok(self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .find(|(a, _)| a.appointment_id == appointment_id)
            .map(|(a, _)| a.clone()))
    }

    async fn find_appointment_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<AppointmentRef>, ReminderError> {
        Ok(self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .find(|(_, p)| p == phone)
            .map(|(a, _)| a.clone()))
    }

    async fn save_schedule(
        &self,
        clinic_id: &str,
        schedule: &UtcReminderSchedule,
    ) -> Result<(), ReminderError> {
        self.schedules
            .lock()
            .unwrap()
            .push((clinic_id.to_string(), schedule.clone()));
        Ok(())
    }

    async fn record_delivery(
        &self,
        _clinic_id: &str,
        appointment_id: Uuid,
        send: ScheduledSend,
        result: &DeliveryAttemptResult,
    ) -> Result<(), ReminderError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((appointment_id, send, result.clone()));
        Ok(())
    }

    async fn mark_appointment_confirmed(&self, appointment_id: Uuid) -> Result<(), ReminderError> {
        self.confirmed.lock().unwrap().push(appointment_id);
        Ok(())
    }

    async fn create_rescheduling_request(
        &self,
        appointment: &AppointmentRef,
        reply_text: &str,
    ) -> Result<(), ReminderError> {
        self.rescheduling
            .lock()
            .unwrap()
            .push((appointment.appointment_id, reply_text.to_string()));
        Ok(())
    }
}

/// Records every call and answers with a fixed outcome.
struct RecordingSender {
    succeed: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    fn new(succeed: bool) -> Arc<Self> {
        Arc::new(Self {
            succeed,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelSender for RecordingSender {
    async fn send(
        &self,
        _clinic: &ReminderConfig,
        recipient: &str,
        message: &str,
    ) -> Result<(), ChannelError> {
        self.calls
            .lock()
            .unwrap()
            .push((recipient.to_string(), message.to_string()));

        if self.succeed {
            Ok(())
        } else {
            Err(ChannelError::Rejected {
                status: 500,
                body: "provider down".to_string(),
            })
        }
    }
}

struct Harness {
    orchestrator: ReminderOrchestrator,
    store: Arc<InMemoryStore>,
    whatsapp: Arc<RecordingSender>,
    email: Arc<RecordingSender>,
    facebook: Arc<RecordingSender>,
    instagram: Arc<RecordingSender>,
}

fn harness(outcomes: [bool; 4]) -> Harness {
    let store = Arc::new(InMemoryStore::with_clinic(clinic()));
    let whatsapp = RecordingSender::new(outcomes[0]);
    let email = RecordingSender::new(outcomes[1]);
    let facebook = RecordingSender::new(outcomes[2]);
    let instagram = RecordingSender::new(outcomes[3]);

    let dispatcher = MultiChannelDispatcher::new(ChannelSenders {
        whatsapp: whatsapp.clone(),
        email: email.clone(),
        facebook: facebook.clone(),
        instagram: instagram.clone(),
    });

    Harness {
        orchestrator: ReminderOrchestrator::new(MessageComposer::new(), dispatcher, store.clone()),
        store,
        whatsapp,
        email,
        facebook,
        instagram,
    }
}

fn clinic() -> ReminderConfig {
    ReminderConfig {
        clinic_id: "clinic-1".to_string(),
        clinic_name: "Clínica Dental Sonrisa".to_string(),
        whatsapp_number: "+34 910 000 000".to_string(),
        email: "citas@sonrisa.example".to_string(),
        timezone: "Europe/Madrid".to_string(),
        locale: "es-ES".to_string(),
    }
}

fn appointment(date: (i32, u32, u32), time: &str, contact: ContactAddresses) -> AppointmentData {
    AppointmentData {
        appointment_id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        patient_name: "Lucía".to_string(),
        contact,
        appointment_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        appointment_time: time.to_string(),
        treatment_type: TreatmentType::OrthodonticCare,
        practitioner_name: Some("Dra. Martínez".to_string()),
    }
}

fn full_contact() -> ContactAddresses {
    ContactAddresses {
        phone: "+34600000000".to_string(),
        email: Some("lucia@example.com".to_string()),
        facebook_id: Some("fb-psid-1".to_string()),
        instagram_id: Some("ig-sid-1".to_string()),
    }
}

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

// =====================================================================================
// SENDING
// =====================================================================================

#[tokio::test]
async fn test_email_only_patient_gets_one_email_attempt() {
    let h = harness([true, true, true, true]);
    let contact = ContactAddresses {
        phone: String::new(),
        email: Some("lucia@example.com".to_string()),
        ..ContactAddresses::default()
    };
    let appt = appointment((2024, 1, 15), "10:30", contact);

    let result = h
        .orchestrator
        .send_reminder_with_fallback(&clinic(), &appt, ReminderKind::ThreeDays)
        .await;

    assert!(result.success);
    assert_eq!(result.channel, DeliveryChannel::Email);
    assert_eq!(result.attempts, 1);
    assert!(h.whatsapp.calls().is_empty());
    assert_eq!(h.email.calls().len(), 1);
    assert!(h.facebook.calls().is_empty());
    assert!(h.instagram.calls().is_empty());
}

#[tokio::test]
async fn test_fallback_reaches_instagram_after_three_failures() {
    let h = harness([false, false, false, true]);
    let appt = appointment((2024, 1, 15), "10:30", full_contact());

    let result = h
        .orchestrator
        .send_reminder_with_fallback(&clinic(), &appt, ReminderKind::OneDay)
        .await;

    assert!(result.success);
    assert_eq!(result.channel, DeliveryChannel::Instagram);
    assert_eq!(result.attempts, 4);
    assert_eq!(result.errors.len(), 3);

    // Every channel received the same text.
    let message = &h.whatsapp.calls()[0].1;
    assert_eq!(&h.instagram.calls()[0].1, message);
    assert!(message.starts_with("Hola Lucía,"));

    let deliveries = h.store.deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].1, ScheduledSend::OneDay);
    assert_eq!(deliveries[0].2.channel, DeliveryChannel::Instagram);
}

#[tokio::test]
async fn test_exhausted_delivery_is_logged_not_raised() {
    let h = harness([false, false, false, false]);
    let appt = appointment((2024, 1, 15), "10:30", full_contact());

    let result = h.orchestrator.send_thank_you(&clinic(), &appt).await;

    assert!(!result.success);
    assert_eq!(result.status, DeliveryStatus::AllChannelsFailed);
    assert_eq!(result.errors.len(), 4);
    assert_eq!(h.store.deliveries.lock().unwrap()[0].1, ScheduledSend::ThankYou);
}

#[tokio::test]
async fn test_due_sends_fire_in_window_in_order() {
    let h = harness([true, true, true, true]);
    let appt = appointment((2024, 3, 15), "10:30", full_contact());

    // Window covers the 2h-before reminder (08:30) and the thank-you (12:30).
    let results = h
        .orchestrator
        .process_due_sends(&clinic(), &appt, at("2024-03-15 08:00"), at("2024-03-15 12:30"))
        .await
        .unwrap();

    let sends: Vec<_> = results.iter().map(|r| r.send).collect();
    assert_eq!(sends, vec![ScheduledSend::TwoHours, ScheduledSend::ThankYou]);
    assert_eq!(results[0].fire_at, at("2024-03-15 08:30"));
    assert!(results.iter().all(|r| r.result.success));

    let texts = h.whatsapp.calls();
    assert_eq!(texts.len(), 2);
    assert!(texts[1].1.contains("Gracias por tu visita"));
}

#[tokio::test]
async fn test_due_sends_reject_malformed_time() {
    let h = harness([true, true, true, true]);
    let appt = appointment((2024, 3, 15), "half past ten", full_contact());

    let result = h
        .orchestrator
        .process_due_sends(&clinic(), &appt, at("2024-03-01 00:00"), at("2024-03-20 00:00"))
        .await;

    assert!(matches!(result, Err(ReminderError::InvalidInput(_))));
    assert!(h.whatsapp.calls().is_empty());
}

// =====================================================================================
// SCHEDULING
// =====================================================================================

#[tokio::test]
async fn test_batch_keeps_going_past_bad_records() {
    let h = harness([true, true, true, true]);
    let good = appointment((2024, 1, 15), "14:30", full_contact());
    let bad_time = appointment((2024, 1, 16), "24:61", full_contact());
    let no_phone = appointment((2024, 1, 17), "10:00", ContactAddresses::default());

    let results = h
        .orchestrator
        .schedule_batch(&clinic(), &[good.clone(), bad_time, no_phone])
        .await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(!results[1].is_ok());
    assert!(!results[2].is_ok());

    let schedules = h.store.schedules.lock().unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].1.appointment_id, good.appointment_id);
    // 12:30 Madrid in January is 11:30 UTC.
    assert_eq!(
        schedules[0].1.two_hours_before.to_rfc3339(),
        "2024-01-15T11:30:00+00:00"
    );
}

#[tokio::test]
async fn test_unknown_timezone_is_reported_without_storing() {
    let h = harness([true, true, true, true]);
    let mut config = clinic();
    config.timezone = "Atlantis/Capital".to_string();
    let appt = appointment((2024, 1, 15), "10:30", full_contact());

    let result = h.orchestrator.schedule_and_store(&config, &appt).await;

    assert!(result.schedule.is_some());
    assert!(result.errors[0].contains("Atlantis/Capital"));
    assert!(h.store.schedules.lock().unwrap().is_empty());
}

// =====================================================================================
// CONFIRMATIONS
// =====================================================================================

#[tokio::test]
async fn test_inbound_yes_confirms_and_answers_patient() {
    let h = harness([true, true, true, true]);
    let appointment_id = Uuid::new_v4();
    h.store.add_appointment(appointment_id, "clinic-1", "34600000000");

    let outcome = h
        .orchestrator
        .handle_inbound_reply("34600000000", "Sí, confirmo")
        .await
        .unwrap()
        .unwrap();

    assert!(outcome.confirmed);
    assert_eq!(*h.store.confirmed.lock().unwrap(), vec![appointment_id]);

    let replies = h.whatsapp.calls();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0, "34600000000");
    assert!(replies[0].1.contains("confirmada"));
}

#[tokio::test]
async fn test_inbound_no_opens_rescheduling_request() {
    let h = harness([true, true, true, true]);
    let appointment_id = Uuid::new_v4();
    h.store.add_appointment(appointment_id, "clinic-1", "34600000000");

    let outcome = h
        .orchestrator
        .handle_inbound_reply("34600000000", "no puedo, reagendar")
        .await
        .unwrap()
        .unwrap();

    assert!(outcome.needs_rescheduling);
    assert!(h.store.confirmed.lock().unwrap().is_empty());
    assert_eq!(
        *h.store.rescheduling.lock().unwrap(),
        vec![(appointment_id, "no puedo, reagendar".to_string())]
    );
    assert!(h.whatsapp.calls()[0].1.contains("secretaria"));
}

#[tokio::test]
async fn test_inbound_from_unknown_number_is_ignored() {
    let h = harness([true, true, true, true]);

    let outcome = h
        .orchestrator
        .handle_inbound_reply("34999999999", "sí")
        .await
        .unwrap();

    assert!(outcome.is_none());
    assert!(h.whatsapp.calls().is_empty());
}

#[tokio::test]
async fn test_portuguese_clinic_answers_in_portuguese() {
    let h = harness([true, true, true, true]);
    let mut pt = clinic();
    pt.clinic_id = "clinic-pt".to_string();
    pt.locale = "pt-BR".to_string();
    h.store.clinics.lock().unwrap().push(pt);

    let appointment_id = Uuid::new_v4();
    h.store.add_appointment(appointment_id, "clinic-pt", "5511999990000");

    let outcome = h
        .orchestrator
        .apply_patient_confirmation(appointment_id, "talvez")
        .await
        .unwrap();

    assert!(outcome.is_unrecognized());
    assert!(outcome.message.contains("SIM"));
}

#[test]
fn test_pure_classification_does_not_need_store() {
    let h = harness([true, true, true, true]);
    let id = Uuid::new_v4();

    assert!(h.orchestrator.process_patient_confirmation(id, "Sí, confirmo").confirmed);
    assert!(
        h.orchestrator
            .process_patient_confirmation(id, "no puedo, reagendar")
            .needs_rescheduling
    );
    assert!(h
        .orchestrator
        .process_patient_confirmation(id, "tal vez")
        .is_unrecognized());
}
