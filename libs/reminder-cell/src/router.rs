// =====================================================================================
// REMINDER CELL ROUTER
// =====================================================================================

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::webhook_signature_middleware;

use crate::handlers::{
    apply_confirmation, health_check, preview_message, process_due_sends,
    receive_whatsapp_webhook, schedule_batch, schedule_reminders, send_reminder, send_thank_you,
    verify_whatsapp_webhook, ReminderHandlers,
};

pub fn create_reminder_router(config: Arc<AppConfig>) -> Router {
    let handlers = Arc::new(ReminderHandlers::new(config.clone()));
    create_reminder_router_with_handlers(config, handlers)
}

pub fn create_reminder_router_with_handlers(
    config: Arc<AppConfig>,
    handlers: Arc<ReminderHandlers>,
) -> Router {
    // Only the inbound POST carries a payload signature; the GET handshake does not.
    let whatsapp_webhook = get(verify_whatsapp_webhook).merge(
        post(receive_whatsapp_webhook).layer(middleware::from_fn_with_state(
            config,
            webhook_signature_middleware,
        )),
    );

    Router::new()
        .route("/health", get(health_check))
        .route("/schedule", post(schedule_reminders))
        .route("/schedule/batch", post(schedule_batch))
        .route("/preview", post(preview_message))
        .route("/send", post(send_reminder))
        .route("/thank-you", post(send_thank_you))
        .route("/due", post(process_due_sends))
        .route("/confirmation", post(apply_confirmation))
        .route("/webhooks/whatsapp", whatsapp_webhook)
        .with_state(handlers)
}
