// libs/reminder-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Locale, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReminderError;

// ==============================================================================
// CLINIC & APPOINTMENT INPUTS
// ==============================================================================

/// Clinic settings the workflow needs. Immutable for the duration of a call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderConfig {
    pub clinic_id: String,
    pub clinic_name: String,
    #[serde(default)]
    pub whatsapp_number: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_timezone() -> String {
    "Europe/Madrid".to_string()
}

fn default_locale() -> String {
    "es-ES".to_string()
}

impl ReminderConfig {
    pub fn language(&self) -> Language {
        Language::from_locale(&self.locale)
    }

    /// chrono locale used for long-date rendering.
    pub fn date_locale(&self) -> Locale {
        let locale = self.locale.to_ascii_lowercase().replace('_', "-");
        match self.language() {
            Language::Portuguese if locale == "pt-pt" => Locale::pt_PT,
            Language::Portuguese => Locale::pt_BR,
            Language::English if locale == "en-gb" => Locale::en_GB,
            Language::English => Locale::en_US,
            Language::Spanish if locale == "es-mx" => Locale::es_MX,
            Language::Spanish => Locale::es_ES,
        }
    }

    pub fn time_zone(&self) -> Result<Tz, ReminderError> {
        self.timezone.parse::<Tz>().map_err(|_| {
            ReminderError::InvalidInput(format!("Unknown clinic timezone: {}", self.timezone))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Spanish,
    Portuguese,
    English,
}

impl Language {
    pub fn from_locale(locale: &str) -> Self {
        let locale = locale.trim().to_ascii_lowercase();
        if locale.starts_with("pt") {
            Language::Portuguese
        } else if locale.starts_with("en") {
            Language::English
        } else {
            Language::Spanish
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentType {
    #[serde(alias = "orthodontic-care", alias = "orthodontics", alias = "ortodoncia")]
    OrthodonticCare,

    #[serde(alias = "general-clinical", alias = "general", alias = "clinica_general")]
    GeneralClinical,
}

impl TreatmentType {
    pub fn display_name(&self, language: Language) -> &'static str {
        match (self, language) {
            (TreatmentType::OrthodonticCare, Language::Spanish) => "ortodoncia",
            (TreatmentType::OrthodonticCare, Language::Portuguese) => "ortodontia",
            (TreatmentType::OrthodonticCare, Language::English) => "orthodontic care",
            (TreatmentType::GeneralClinical, Language::Spanish) => "clínica general",
            (TreatmentType::GeneralClinical, Language::Portuguese) => "clínica geral",
            (TreatmentType::GeneralClinical, Language::English) => "general dentistry",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactAddresses {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub facebook_id: Option<String>,
    #[serde(default)]
    pub instagram_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentData {
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    #[serde(default)]
    pub patient_name: String,
    pub contact: ContactAddresses,
    pub appointment_date: NaiveDate,
    /// Local wall-clock time, `HH:MM` or `HH:MM:SS`.
    pub appointment_time: String,
    pub treatment_type: TreatmentType,
    #[serde(default)]
    pub practitioner_name: Option<String>,
}

impl AppointmentData {
    /// Checks the fields required to book reminders for this appointment.
    pub fn validate(&self) -> Result<(), ReminderError> {
        if self.contact.phone.trim().is_empty() {
            return Err(ReminderError::InvalidInput(format!(
                "Appointment {} has no patient phone number",
                self.appointment_id
            )));
        }
        Ok(())
    }
}

// ==============================================================================
// SCHEDULE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    #[serde(alias = "three-days", alias = "3d")]
    ThreeDays,
    #[serde(alias = "one-day", alias = "1d")]
    OneDay,
    #[serde(alias = "two-hours", alias = "2h")]
    TwoHours,
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderKind::ThreeDays => write!(f, "three_days"),
            ReminderKind::OneDay => write!(f, "one_day"),
            ReminderKind::TwoHours => write!(f, "two_hours"),
        }
    }
}

/// Anything the external trigger can fire for an appointment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledSend {
    ThreeDays,
    OneDay,
    TwoHours,
    ThankYou,
}

impl ScheduledSend {
    pub fn reminder_kind(&self) -> Option<ReminderKind> {
        match self {
            ScheduledSend::ThreeDays => Some(ReminderKind::ThreeDays),
            ScheduledSend::OneDay => Some(ReminderKind::OneDay),
            ScheduledSend::TwoHours => Some(ReminderKind::TwoHours),
            ScheduledSend::ThankYou => None,
        }
    }
}

impl From<ReminderKind> for ScheduledSend {
    fn from(kind: ReminderKind) -> Self {
        match kind {
            ReminderKind::ThreeDays => ScheduledSend::ThreeDays,
            ReminderKind::OneDay => ScheduledSend::OneDay,
            ReminderKind::TwoHours => ScheduledSend::TwoHours,
        }
    }
}

impl fmt::Display for ScheduledSend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduledSend::ThreeDays => write!(f, "three_days"),
            ScheduledSend::OneDay => write!(f, "one_day"),
            ScheduledSend::TwoHours => write!(f, "two_hours"),
            ScheduledSend::ThankYou => write!(f, "thank_you"),
        }
    }
}

/// Fire times in the clinic's local wall clock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderSchedule {
    pub appointment_id: Uuid,
    pub three_days_before: NaiveDateTime,
    pub one_day_before: NaiveDateTime,
    pub two_hours_before: NaiveDateTime,
    pub two_hours_after: NaiveDateTime,
}

impl ReminderSchedule {
    /// Every send with its fire time, earliest first.
    pub fn sends(&self) -> [(ScheduledSend, NaiveDateTime); 4] {
        [
            (ScheduledSend::ThreeDays, self.three_days_before),
            (ScheduledSend::OneDay, self.one_day_before),
            (ScheduledSend::TwoHours, self.two_hours_before),
            (ScheduledSend::ThankYou, self.two_hours_after),
        ]
    }

    pub fn fire_time(&self, send: ScheduledSend) -> NaiveDateTime {
        match send {
            ScheduledSend::ThreeDays => self.three_days_before,
            ScheduledSend::OneDay => self.one_day_before,
            ScheduledSend::TwoHours => self.two_hours_before,
            ScheduledSend::ThankYou => self.two_hours_after,
        }
    }

    /// Sends whose fire time lies in `(after, until]`.
    pub fn due_between(&self, after: NaiveDateTime, until: NaiveDateTime) -> Vec<ScheduledSend> {
        self.sends()
            .into_iter()
            .filter(|(_, at)| *at > after && *at <= until)
            .map(|(send, _)| send)
            .collect()
    }

    /// Pin the local fire times to instants in `tz`.
    ///
    /// Local times skipped by a DST jump are rejected; repeated ones resolve to
    /// the earlier instant.
    pub fn to_utc(&self, tz: Tz) -> Result<UtcReminderSchedule, ReminderError> {
        let localize = |local: NaiveDateTime| -> Result<DateTime<Utc>, ReminderError> {
            match tz.from_local_datetime(&local) {
                LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
                LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
                LocalResult::None => Err(ReminderError::InvalidInput(format!(
                    "{} does not exist in timezone {}",
                    local, tz
                ))),
            }
        };

        Ok(UtcReminderSchedule {
            appointment_id: self.appointment_id,
            three_days_before: localize(self.three_days_before)?,
            one_day_before: localize(self.one_day_before)?,
            two_hours_before: localize(self.two_hours_before)?,
            two_hours_after: localize(self.two_hours_after)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UtcReminderSchedule {
    pub appointment_id: Uuid,
    pub three_days_before: DateTime<Utc>,
    pub one_day_before: DateTime<Utc>,
    pub two_hours_before: DateTime<Utc>,
    pub two_hours_after: DateTime<Utc>,
}

/// Scheduling never fails the caller; problems are reported in `errors`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleResult {
    pub appointment_id: Uuid,
    pub schedule: Option<ReminderSchedule>,
    pub errors: Vec<String>,
}

impl ScheduleResult {
    pub fn is_ok(&self) -> bool {
        self.schedule.is_some() && self.errors.is_empty()
    }
}

// ==============================================================================
// DELIVERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    Whatsapp,
    Email,
    Facebook,
    Instagram,
    None,
}

impl fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryChannel::Whatsapp => write!(f, "whatsapp"),
            DeliveryChannel::Email => write!(f, "email"),
            DeliveryChannel::Facebook => write!(f, "facebook"),
            DeliveryChannel::Instagram => write!(f, "instagram"),
            DeliveryChannel::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    AllChannelsFailed,
    NoChannelAvailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryAttemptResult {
    pub success: bool,
    pub channel: DeliveryChannel,
    pub attempts: u32,
    pub errors: Vec<String>,
    pub status: DeliveryStatus,
}

impl DeliveryAttemptResult {
    pub fn sent(channel: DeliveryChannel, attempts: u32, errors: Vec<String>) -> Self {
        Self {
            success: true,
            channel,
            attempts,
            errors,
            status: DeliveryStatus::Sent,
        }
    }

    pub fn exhausted(attempts: u32, errors: Vec<String>) -> Self {
        let status = if attempts == 0 {
            DeliveryStatus::NoChannelAvailable
        } else {
            DeliveryStatus::AllChannelsFailed
        };

        Self {
            success: false,
            channel: DeliveryChannel::None,
            attempts,
            errors,
            status,
        }
    }

    /// Turn an unsuccessful dispatch into an error for callers that cannot
    /// continue without delivery.
    pub fn into_result(self) -> Result<DeliveryChannel, ReminderError> {
        if self.success {
            Ok(self.channel)
        } else {
            Err(ReminderError::AllChannelsExhausted {
                attempts: self.attempts,
                errors: self.errors,
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfirmationOutcome {
    pub confirmed: bool,
    pub needs_rescheduling: bool,
    pub message: String,
}

impl ConfirmationOutcome {
    pub fn is_unrecognized(&self) -> bool {
        !self.confirmed && !self.needs_rescheduling
    }
}

/// Store lookup result for an inbound reply's sender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentRef {
    pub appointment_id: Uuid,
    pub clinic_id: String,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub clinic_id: String,
    pub appointment: AppointmentData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchScheduleRequest {
    pub clinic_id: String,
    pub appointments: Vec<AppointmentData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchScheduleResponse {
    pub scheduled: usize,
    pub failed: usize,
    pub results: Vec<ScheduleResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub clinic_id: String,
    pub appointment: AppointmentData,
    pub kind: ScheduledSend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub kind: ScheduledSend,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReminderRequest {
    pub clinic_id: String,
    pub appointment: AppointmentData,
    pub kind: ReminderKind,
    /// Answer with an error instead of a failed result when nothing was delivered.
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThankYouRequest {
    pub clinic_id: String,
    pub appointment: AppointmentData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueSendsRequest {
    pub clinic_id: String,
    pub appointment: AppointmentData,
    pub window_start: NaiveDateTime,
    pub now: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DueSendResult {
    pub send: ScheduledSend,
    pub fire_at: NaiveDateTime,
    pub result: DeliveryAttemptResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub appointment_id: Uuid,
    pub reply_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelHealth {
    pub whatsapp: bool,
    pub email: bool,
    pub facebook: bool,
    pub instagram: bool,
}

// ==============================================================================
// WHATSAPP WEBHOOK MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookVerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppWebhookPayload {
    #[serde(default)]
    pub entry: Vec<WhatsAppEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppEntry {
    #[serde(default)]
    pub changes: Vec<WhatsAppChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppChange {
    pub value: WhatsAppChangeValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppChangeValue {
    #[serde(default)]
    pub messages: Vec<WhatsAppInboundMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppInboundMessage {
    pub from: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: Option<WhatsAppText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppText {
    pub body: String,
}

impl WhatsAppWebhookPayload {
    /// `(sender, text)` for every inbound text message in the notification.
    pub fn text_messages(&self) -> Vec<(String, String)> {
        self.entry
            .iter()
            .flat_map(|entry| entry.changes.iter())
            .flat_map(|change| change.value.messages.iter())
            .filter(|message| message.message_type == "text")
            .filter_map(|message| {
                message
                    .text
                    .as_ref()
                    .map(|text| (message.from.clone(), text.body.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use serde_json::json;

    fn at(date: (i32, u32, u32), time: (u32, u32)) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap())
    }

    fn schedule() -> ReminderSchedule {
        ReminderSchedule {
            appointment_id: Uuid::nil(),
            three_days_before: at((2024, 3, 12), (9, 0)),
            one_day_before: at((2024, 3, 14), (9, 0)),
            two_hours_before: at((2024, 3, 15), (8, 30)),
            two_hours_after: at((2024, 3, 15), (12, 30)),
        }
    }

    #[test]
    fn test_due_between_is_half_open() {
        let s = schedule();

        assert_eq!(
            s.due_between(at((2024, 3, 12), (9, 0)), at((2024, 3, 14), (9, 0))),
            vec![ScheduledSend::OneDay]
        );
        assert_eq!(
            s.due_between(at((2024, 3, 1), (0, 0)), at((2024, 3, 16), (0, 0))),
            vec![
                ScheduledSend::ThreeDays,
                ScheduledSend::OneDay,
                ScheduledSend::TwoHours,
                ScheduledSend::ThankYou
            ]
        );
        assert!(s.due_between(at((2024, 3, 15), (12, 30)), at((2024, 3, 20), (0, 0))).is_empty());
    }

    #[test]
    fn test_to_utc_applies_clinic_offset() {
        let utc = schedule().to_utc(chrono_tz::Europe::Madrid).unwrap();
        // Madrid is UTC+1 in March before the DST switch.
        assert_eq!(utc.three_days_before.to_rfc3339(), "2024-03-12T08:00:00+00:00");
        assert_eq!(utc.two_hours_after.to_rfc3339(), "2024-03-15T11:30:00+00:00");
    }

    #[test]
    fn test_to_utc_rejects_dst_gap() {
        let mut s = schedule();
        // 02:30 does not exist in Madrid on 2024-03-31.
        s.two_hours_before = at((2024, 3, 31), (2, 30));
        assert!(matches!(
            s.to_utc(chrono_tz::Europe::Madrid),
            Err(ReminderError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_delivery_status_distinguishes_outcomes() {
        assert_eq!(
            DeliveryAttemptResult::exhausted(0, vec![]).status,
            DeliveryStatus::NoChannelAvailable
        );
        assert_eq!(
            DeliveryAttemptResult::exhausted(2, vec!["a".into(), "b".into()]).status,
            DeliveryStatus::AllChannelsFailed
        );
        let sent = DeliveryAttemptResult::sent(DeliveryChannel::Email, 2, vec!["x".into()]);
        assert_eq!(sent.status, DeliveryStatus::Sent);
        assert_eq!(sent.into_result().unwrap(), DeliveryChannel::Email);
    }

    #[test]
    fn test_failed_delivery_into_result_keeps_attempt_errors() {
        let failed = DeliveryAttemptResult::exhausted(2, vec!["whatsapp: a".into(), "email: b".into()]);

        match failed.into_result() {
            Err(ReminderError::AllChannelsExhausted { attempts, errors }) => {
                assert_eq!(attempts, 2);
                assert_eq!(errors, vec!["whatsapp: a".to_string(), "email: b".to_string()]);
            }
            other => panic!("expected exhausted error, got {:?}", other),
        }
    }

    #[test]
    fn test_to_utc_resolves_dst_overlap_to_earlier_instant() {
        let mut s = schedule();
        // 02:30 happens twice in Madrid on 2024-10-27; the CEST reading comes first.
        s.two_hours_before = at((2024, 10, 27), (2, 30));

        let utc = s.to_utc(chrono_tz::Europe::Madrid).unwrap();

        assert_eq!(utc.two_hours_before.to_rfc3339(), "2024-10-27T00:30:00+00:00");
    }

    #[test]
    fn test_delivery_result_serializes_lowercase_channel() {
        let value = serde_json::to_value(DeliveryAttemptResult::exhausted(0, vec![])).unwrap();
        assert_eq!(value["channel"], "none");
        assert_eq!(value["status"], "no_channel_available");
    }

    #[test]
    fn test_treatment_type_accepts_hyphenated_names() {
        let t: TreatmentType = serde_json::from_value(json!("orthodontic-care")).unwrap();
        assert_eq!(t, TreatmentType::OrthodonticCare);
        let t: TreatmentType = serde_json::from_value(json!("general_clinical")).unwrap();
        assert_eq!(t, TreatmentType::GeneralClinical);
    }

    #[test]
    fn test_locale_selection() {
        let mut config = ReminderConfig {
            clinic_id: "c1".into(),
            clinic_name: "Clínica".into(),
            whatsapp_number: String::new(),
            email: String::new(),
            timezone: default_timezone(),
            locale: "pt-PT".into(),
        };
        assert_eq!(config.language(), Language::Portuguese);
        assert_eq!(config.date_locale(), Locale::pt_PT);

        config.locale = "fr-FR".into();
        assert_eq!(config.language(), Language::Spanish);
        assert_eq!(config.date_locale(), Locale::es_ES);

        config.timezone = "Mars/Olympus".into();
        assert!(config.time_zone().is_err());
    }

    #[test]
    fn test_webhook_payload_extracts_text_messages() {
        let payload: WhatsAppWebhookPayload = serde_json::from_value(json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [
                            { "from": "34600000001", "type": "text", "text": { "body": "Sí" } },
                            { "from": "34600000002", "type": "image" }
                        ]
                    }
                }]
            }]
        }))
        .unwrap();

        assert_eq!(
            payload.text_messages(),
            vec![("34600000001".to_string(), "Sí".to_string())]
        );
    }

    #[test]
    fn test_status_update_payload_has_no_messages() {
        let payload: WhatsAppWebhookPayload = serde_json::from_value(json!({
            "entry": [{ "changes": [{ "value": { "statuses": [{ "status": "read" }] } }] }]
        }))
        .unwrap();

        assert!(payload.text_messages().is_empty());
    }
}
