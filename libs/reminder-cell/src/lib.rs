// libs/reminder-cell/src/lib.rs
//! # Reminder Cell
//!
//! Appointment reminders and patient confirmations for dental clinics.
//!
//! ## Features
//!
//! - **Reminder Schedule**: 3 days and 1 day before at 09:00, 2 hours before,
//!   and a thank-you 2 hours after the appointment
//! - **Localized Messages**: Spanish, Portuguese and English templates
//! - **Channel Fallback**: WhatsApp, then Email, Facebook Messenger, Instagram
//! - **Confirmations**: keyword interpretation of patient replies, confirmed
//!   appointments are marked and rescheduling goes to the clinic secretary
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------+
//! |                   Reminder Cell                     |
//! +-----------------------------------------------------+
//! |  handlers.rs     |  HTTP endpoint handlers          |
//! |  router.rs       |  Route definitions               |
//! |  models.rs       |  Data structures & DTOs          |
//! |  services/       |  Business logic layer            |
//! |    schedule.rs   |  Fire time calculation           |
//! |    composer.rs   |  Message templates               |
//! |    dispatcher.rs |  Ordered channel fallback        |
//! |    confirmation.rs| Reply interpretation            |
//! |    orchestrator.rs| Workflow entry point            |
//! |    store.rs      |  Supabase persistence            |
//! |    channels/     |  Provider HTTP clients           |
//! +-----------------------------------------------------+
//! ```
//!
//! ## API Endpoints
//!
//! - `POST /reminders/schedule` - Compute and store a reminder schedule
//! - `POST /reminders/schedule/batch` - Schedule many appointments
//! - `POST /reminders/preview` - Render a message without sending
//! - `POST /reminders/send` - Send one reminder with fallback
//! - `POST /reminders/thank-you` - Send the post-visit message
//! - `POST /reminders/due` - Fire every send due in a time window
//! - `POST /reminders/confirmation` - Apply a patient reply
//! - `GET|POST /reminders/webhooks/whatsapp` - WhatsApp webhook
//! - `GET /reminders/health` - Channel configuration status

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::{ChannelError, ReminderError};
pub use handlers::ReminderHandlers;
pub use models::*;
pub use router::create_reminder_router;
pub use services::*;
