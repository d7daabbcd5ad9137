// libs/reminder-cell/src/services/store.rs
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::ReminderError;
use crate::models::{
    AppointmentRef, DeliveryAttemptResult, ReminderConfig, ScheduledSend, UtcReminderSchedule,
};
use crate::services::channels::WhatsAppClient;

/// Persistence the reminder workflow relies on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn get_reminder_config(&self, clinic_id: &str) -> Result<ReminderConfig, ReminderError>;

    async fn find_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<AppointmentRef>, ReminderError>;

    /// Upcoming appointment for the patient writing from `phone`.
    async fn find_appointment_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<AppointmentRef>, ReminderError>;

    async fn save_schedule(
        &self,
        clinic_id: &str,
        schedule: &UtcReminderSchedule,
    ) -> Result<(), ReminderError>;

    async fn record_delivery(
        &self,
        clinic_id: &str,
        appointment_id: Uuid,
        send: ScheduledSend,
        result: &DeliveryAttemptResult,
    ) -> Result<(), ReminderError>;

    async fn mark_appointment_confirmed(&self, appointment_id: Uuid) -> Result<(), ReminderError>;

    async fn create_rescheduling_request(
        &self,
        appointment: &AppointmentRef,
        reply_text: &str,
    ) -> Result<(), ReminderError>;
}

#[derive(Debug, Deserialize)]
struct ClinicRow {
    id: String,
    name: String,
    #[serde(default)]
    whatsapp_number: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    locale: Option<String>,
}

impl From<ClinicRow> for ReminderConfig {
    fn from(row: ClinicRow) -> Self {
        ReminderConfig {
            clinic_id: row.id,
            clinic_name: row.name,
            whatsapp_number: row.whatsapp_number.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
            timezone: row.timezone.unwrap_or_else(|| "Europe/Madrid".to_string()),
            locale: row.locale.unwrap_or_else(|| "es-ES".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppointmentRow {
    id: Uuid,
    clinic_id: String,
}

impl From<AppointmentRow> for AppointmentRef {
    fn from(row: AppointmentRow) -> Self {
        AppointmentRef {
            appointment_id: row.id,
            clinic_id: row.clinic_id,
        }
    }
}

/// PostgREST-backed store over the clinic tables.
pub struct SupabaseReminderStore {
    supabase: SupabaseClient,
}

impl SupabaseReminderStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn first_row<T>(&self, path: &str) -> Result<Option<T>, ReminderError>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<Value> = self.supabase.request(Method::GET, path, None, None).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ReminderStore for SupabaseReminderStore {
    async fn get_reminder_config(&self, clinic_id: &str) -> Result<ReminderConfig, ReminderError> {
        debug!("Fetching reminder config for clinic {}", clinic_id);

        let path = format!(
            "/rest/v1/clinics?id=eq.{}&select=id,name,whatsapp_number,email,timezone,locale",
            clinic_id
        );
        let row: Option<ClinicRow> = self.first_row(&path).await?;

        row.map(ReminderConfig::from)
            .ok_or_else(|| ReminderError::NotFound(format!("Clinic {} not found", clinic_id)))
    }

    async fn find_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<AppointmentRef>, ReminderError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select=id,clinic_id", appointment_id);
        let row: Option<AppointmentRow> = self.first_row(&path).await?;
        Ok(row.map(AppointmentRef::from))
    }

    async fn find_appointment_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<AppointmentRef>, ReminderError> {
        let digits = WhatsAppClient::normalize_phone(phone);
        if digits.is_empty() {
            return Ok(None);
        }

        // Numbers are stored either bare or with a leading '+' (%2B).
        let path = format!(
            "/rest/v1/appointments?or=(patient_phone.eq.{d},patient_phone.eq.%2B{d})\
             &status=in.(scheduled,confirmed)&appointment_date=gte.{today}\
             &order=appointment_date.asc,appointment_time.asc&limit=1&select=id,clinic_id",
            d = digits,
            today = Utc::now().date_naive()
        );
        let row: Option<AppointmentRow> = self.first_row(&path).await?;
        Ok(row.map(AppointmentRef::from))
    }

    async fn save_schedule(
        &self,
        clinic_id: &str,
        schedule: &UtcReminderSchedule,
    ) -> Result<(), ReminderError> {
        let row = json!({
            "appointment_id": schedule.appointment_id,
            "clinic_id": clinic_id,
            "three_days_before": schedule.three_days_before.to_rfc3339(),
            "one_day_before": schedule.one_day_before.to_rfc3339(),
            "two_hours_before": schedule.two_hours_before.to_rfc3339(),
            "two_hours_after": schedule.two_hours_after.to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/reminder_schedules?on_conflict=appointment_id",
                None,
                Some(row),
                Some(SupabaseClient::upsert_representation()),
            )
            .await?;

        info!("Stored reminder schedule for appointment {}", schedule.appointment_id);
        Ok(())
    }

    async fn record_delivery(
        &self,
        clinic_id: &str,
        appointment_id: Uuid,
        send: ScheduledSend,
        result: &DeliveryAttemptResult,
    ) -> Result<(), ReminderError> {
        let row = json!({
            "appointment_id": appointment_id,
            "clinic_id": clinic_id,
            "kind": send,
            "success": result.success,
            "channel": result.channel,
            "attempts": result.attempts,
            "errors": result.errors,
            "status": result.status,
            "created_at": Utc::now().to_rfc3339()
        });

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/notification_logs",
                None,
                Some(row),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        debug!("Logged {} delivery for appointment {}", send, appointment_id);
        Ok(())
    }

    async fn mark_appointment_confirmed(&self, appointment_id: Uuid) -> Result<(), ReminderError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let updated: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(json!({
                    "status": "confirmed",
                    "confirmed_at": Utc::now().to_rfc3339(),
                    "updated_at": Utc::now().to_rfc3339()
                })),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        if updated.is_empty() {
            return Err(ReminderError::NotFound(format!(
                "Appointment {} not found",
                appointment_id
            )));
        }

        info!("Appointment {} confirmed by patient", appointment_id);
        Ok(())
    }

    async fn create_rescheduling_request(
        &self,
        appointment: &AppointmentRef,
        reply_text: &str,
    ) -> Result<(), ReminderError> {
        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/rescheduling_requests",
                None,
                Some(json!({
                    "appointment_id": appointment.appointment_id,
                    "clinic_id": appointment.clinic_id,
                    "patient_reply": reply_text,
                    "status": "pending",
                    "created_at": Utc::now().to_rfc3339()
                })),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        info!(
            "Opened rescheduling request for appointment {}",
            appointment.appointment_id
        );
        Ok(())
    }
}
