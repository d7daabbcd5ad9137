// =====================================================================================
// REMINDER CELL HANDLERS
// =====================================================================================

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    BatchScheduleRequest, BatchScheduleResponse, ChannelHealth, ConfirmationOutcome,
    ConfirmationRequest, DeliveryAttemptResult, DueSendResult, DueSendsRequest, PreviewRequest,
    PreviewResponse, ReminderConfig, ScheduleRequest, ScheduleResult, SendReminderRequest,
    ThankYouRequest, WebhookVerifyQuery, WhatsAppWebhookPayload,
};
use crate::services::ReminderOrchestrator;

pub struct ReminderHandlers {
    orchestrator: Arc<ReminderOrchestrator>,
    config: Arc<AppConfig>,
}

impl ReminderHandlers {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let orchestrator = Arc::new(ReminderOrchestrator::from_config(&config));
        Self::with_orchestrator(config, orchestrator)
    }

    pub fn with_orchestrator(config: Arc<AppConfig>, orchestrator: Arc<ReminderOrchestrator>) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    async fn clinic(&self, clinic_id: &str) -> Result<ReminderConfig, AppError> {
        Ok(self.orchestrator.store().get_reminder_config(clinic_id).await?)
    }
}

// =====================================================================================
// SCHEDULING ENDPOINTS
// =====================================================================================

#[instrument(skip(handlers, request), fields(clinic_id = %request.clinic_id))]
pub async fn schedule_reminders(
    State(handlers): State<Arc<ReminderHandlers>>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<ScheduleResult>, AppError> {
    request.appointment.validate()?;
    let clinic = handlers.clinic(&request.clinic_id).await?;

    let result = handlers
        .orchestrator
        .schedule_and_store(&clinic, &request.appointment)
        .await;

    if result.schedule.is_none() {
        return Err(AppError::ValidationError(result.errors.join("; ")));
    }

    Ok(Json(result))
}

#[instrument(skip(handlers, request), fields(clinic_id = %request.clinic_id))]
pub async fn schedule_batch(
    State(handlers): State<Arc<ReminderHandlers>>,
    Json(request): Json<BatchScheduleRequest>,
) -> Result<Json<BatchScheduleResponse>, AppError> {
    let clinic = handlers.clinic(&request.clinic_id).await?;

    let results = handlers
        .orchestrator
        .schedule_batch(&clinic, &request.appointments)
        .await;

    let scheduled = results.iter().filter(|r| r.is_ok()).count();
    Ok(Json(BatchScheduleResponse {
        scheduled,
        failed: results.len() - scheduled,
        results,
    }))
}

#[instrument(skip(handlers, request), fields(clinic_id = %request.clinic_id))]
pub async fn preview_message(
    State(handlers): State<Arc<ReminderHandlers>>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let clinic = handlers.clinic(&request.clinic_id).await?;
    let message = handlers
        .orchestrator
        .generate_message(&clinic, &request.appointment, request.kind);

    Ok(Json(PreviewResponse {
        kind: request.kind,
        message,
    }))
}

// =====================================================================================
// DELIVERY ENDPOINTS
// =====================================================================================

#[instrument(skip(handlers, request), fields(clinic_id = %request.clinic_id, kind = %request.kind))]
pub async fn send_reminder(
    State(handlers): State<Arc<ReminderHandlers>>,
    Json(request): Json<SendReminderRequest>,
) -> Result<Json<DeliveryAttemptResult>, AppError> {
    let clinic = handlers.clinic(&request.clinic_id).await?;
    let result = handlers
        .orchestrator
        .send_reminder_with_fallback(&clinic, &request.appointment, request.kind)
        .await;

    if request.strict {
        result.clone().into_result()?;
    }

    Ok(Json(result))
}

#[instrument(skip(handlers, request), fields(clinic_id = %request.clinic_id))]
pub async fn send_thank_you(
    State(handlers): State<Arc<ReminderHandlers>>,
    Json(request): Json<ThankYouRequest>,
) -> Result<Json<DeliveryAttemptResult>, AppError> {
    let clinic = handlers.clinic(&request.clinic_id).await?;
    let result = handlers
        .orchestrator
        .send_thank_you(&clinic, &request.appointment)
        .await;

    Ok(Json(result))
}

#[instrument(skip(handlers, request), fields(clinic_id = %request.clinic_id))]
pub async fn process_due_sends(
    State(handlers): State<Arc<ReminderHandlers>>,
    Json(request): Json<DueSendsRequest>,
) -> Result<Json<Vec<DueSendResult>>, AppError> {
    if request.window_start >= request.now {
        return Err(AppError::ValidationError(
            "window_start must be before now".to_string(),
        ));
    }

    let clinic = handlers.clinic(&request.clinic_id).await?;
    let results = handlers
        .orchestrator
        .process_due_sends(&clinic, &request.appointment, request.window_start, request.now)
        .await?;

    Ok(Json(results))
}

// =====================================================================================
// CONFIRMATION ENDPOINTS
// =====================================================================================

#[instrument(skip(handlers, request), fields(appointment_id = %request.appointment_id))]
pub async fn apply_confirmation(
    State(handlers): State<Arc<ReminderHandlers>>,
    Json(request): Json<ConfirmationRequest>,
) -> Result<Json<ConfirmationOutcome>, AppError> {
    let outcome = handlers
        .orchestrator
        .apply_patient_confirmation(request.appointment_id, &request.reply_text)
        .await?;

    Ok(Json(outcome))
}

/// Meta subscription handshake: echo `hub.challenge` when the token matches.
pub async fn verify_whatsapp_webhook(
    State(handlers): State<Arc<ReminderHandlers>>,
    Query(query): Query<WebhookVerifyQuery>,
) -> Result<impl IntoResponse, AppError> {
    let expected = handlers.config.whatsapp_verify_token.as_str();
    let token_matches = !expected.is_empty() && query.verify_token.as_deref() == Some(expected);

    if query.mode.as_deref() != Some("subscribe") || !token_matches {
        warn!("Rejected WhatsApp webhook verification");
        return Err(AppError::Forbidden("Webhook verification failed".to_string()));
    }

    info!("WhatsApp webhook verified");
    Ok((StatusCode::OK, query.challenge.unwrap_or_default()))
}

/// Inbound WhatsApp notifications. Always acknowledged so Meta does not retry;
/// per-message failures are logged.
#[instrument(skip(handlers, payload))]
pub async fn receive_whatsapp_webhook(
    State(handlers): State<Arc<ReminderHandlers>>,
    Json(payload): Json<WhatsAppWebhookPayload>,
) -> Json<Value> {
    let messages = payload.text_messages();
    let mut processed = 0usize;

    for (from, text) in &messages {
        match handlers.orchestrator.handle_inbound_reply(from, text).await {
            Ok(Some(_)) => processed += 1,
            Ok(None) => {}
            Err(e) => warn!("Failed to handle inbound reply: {}", e),
        }
    }

    Json(json!({
        "received": messages.len(),
        "processed": processed
    }))
}

// =====================================================================================
// HEALTH
// =====================================================================================

pub async fn health_check(State(handlers): State<Arc<ReminderHandlers>>) -> Json<Value> {
    let config = &handlers.config;
    let channels = ChannelHealth {
        whatsapp: config.is_whatsapp_configured(),
        email: config.is_email_configured(),
        facebook: config.is_facebook_configured(),
        instagram: config.is_instagram_configured(),
    };

    let status = if config.is_any_channel_configured() {
        "healthy"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "service": "reminder-cell",
        "database_configured": config.is_configured(),
        "channels": channels
    }))
}
