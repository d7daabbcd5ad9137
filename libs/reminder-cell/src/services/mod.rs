pub mod channels;
pub mod composer;
pub mod confirmation;
pub mod dispatcher;
pub mod orchestrator;
pub mod schedule;
pub mod store;

pub use channels::{ChannelSender, ChannelSenders};
pub use composer::MessageComposer;
pub use confirmation::{ConfirmationInterpreter, ReplyClass};
pub use dispatcher::MultiChannelDispatcher;
pub use orchestrator::ReminderOrchestrator;
pub use schedule::{calculate_reminder_schedule, parse_appointment_time};
pub use store::{ReminderStore, SupabaseReminderStore};
