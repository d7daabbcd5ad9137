// libs/reminder-cell/src/services/confirmation.rs
use tracing::debug;

use crate::models::{ConfirmationOutcome, Language};

pub const AFFIRMATIVE_KEYWORDS: [&str; 8] = ["si", "sí", "sim", "yes", "confirmo", "ok", "vale", "claro"];
pub const NEGATIVE_KEYWORDS: [&str; 5] = ["no", "não", "nao", "cancelar", "reagendar"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    Confirmed,
    NeedsRescheduling,
    Unrecognized,
}

/// Keyword classifier for patient replies.
///
/// Affirmative keywords are checked first, so a reply containing both sets
/// counts as a confirmation. Matching is by substring on the lowercased reply.
#[derive(Debug, Clone)]
pub struct ConfirmationInterpreter {
    language: Language,
}

impl Default for ConfirmationInterpreter {
    fn default() -> Self {
        Self::new(Language::Spanish)
    }
}

impl ConfirmationInterpreter {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn classify(&self, reply_text: &str) -> ReplyClass {
        let normalized = reply_text.trim().to_lowercase();

        if AFFIRMATIVE_KEYWORDS.iter().any(|k| normalized.contains(k)) {
            ReplyClass::Confirmed
        } else if NEGATIVE_KEYWORDS.iter().any(|k| normalized.contains(k)) {
            ReplyClass::NeedsRescheduling
        } else {
            ReplyClass::Unrecognized
        }
    }

    pub fn interpret(&self, reply_text: &str) -> ConfirmationOutcome {
        let class = self.classify(reply_text);
        debug!("Classified patient reply as {:?}", class);

        ConfirmationOutcome {
            confirmed: class == ReplyClass::Confirmed,
            needs_rescheduling: class == ReplyClass::NeedsRescheduling,
            message: self.reply_for(class).to_string(),
        }
    }

    fn reply_for(&self, class: ReplyClass) -> &'static str {
        match (self.language, class) {
            (Language::Spanish, ReplyClass::Confirmed) => {
                "¡Perfecto! Tu cita ha quedado confirmada. ¡Te esperamos!"
            }
            (Language::Spanish, ReplyClass::NeedsRescheduling) => {
                "Entendido. Nuestra secretaria se pondrá en contacto contigo para reagendar tu cita."
            }
            (Language::Spanish, ReplyClass::Unrecognized) => {
                "No hemos entendido tu respuesta. Por favor responde SÍ para confirmar o NO para reagendar tu cita."
            }
            (Language::Portuguese, ReplyClass::Confirmed) => {
                "Perfeito! Sua consulta está confirmada. Esperamos por você!"
            }
            (Language::Portuguese, ReplyClass::NeedsRescheduling) => {
                "Entendido. Nossa secretária entrará em contato para reagendar sua consulta."
            }
            (Language::Portuguese, ReplyClass::Unrecognized) => {
                "Não entendemos sua resposta. Por favor responda SIM para confirmar ou NÃO para reagendar sua consulta."
            }
            (Language::English, ReplyClass::Confirmed) => {
                "Great! Your appointment is confirmed. See you soon!"
            }
            (Language::English, ReplyClass::NeedsRescheduling) => {
                "Understood. Our front desk will contact you to reschedule your appointment."
            }
            (Language::English, ReplyClass::Unrecognized) => {
                "We couldn't understand your reply. Please answer YES to confirm or NO to reschedule your appointment."
            }
        }
    }
}
