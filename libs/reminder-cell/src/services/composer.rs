// libs/reminder-cell/src/services/composer.rs
use chrono::{NaiveTime, TimeZone, Utc};

use crate::models::{AppointmentData, Language, ReminderConfig, ReminderKind};
use crate::services::schedule::parse_appointment_time;

/// Renders patient-facing text. Pure: no clock, no I/O.
#[derive(Debug, Clone, Default)]
pub struct MessageComposer;

struct Fields<'a> {
    clinic: &'a str,
    greeting_name: Option<&'a str>,
    date: String,
    time: String,
    treatment: &'static str,
    practitioner: Option<&'a str>,
    contact: Option<&'a str>,
}

impl MessageComposer {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_reminder_message(
        &self,
        config: &ReminderConfig,
        appointment: &AppointmentData,
        kind: ReminderKind,
    ) -> String {
        let language = config.language();
        let f = self.fields(config, appointment, language);

        let mut parts = vec![greeting(language, f.greeting_name)];

        let body = match (language, kind) {
            (Language::Spanish, ReminderKind::ThreeDays) => format!(
                "te recordamos que tienes una cita de {} en {} el {} a las {}{}.",
                f.treatment, f.clinic, f.date, f.time, with_practitioner(language, f.practitioner)
            ),
            (Language::Spanish, ReminderKind::OneDay) => format!(
                "mañana, {}, a las {} tienes tu cita de {} en {}{}.",
                f.date, f.time, f.treatment, f.clinic, with_practitioner(language, f.practitioner)
            ),
            (Language::Spanish, ReminderKind::TwoHours) => format!(
                "tu cita de {} en {} es hoy a las {}{}. ¡Te esperamos!",
                f.treatment, f.clinic, f.time, with_practitioner(language, f.practitioner)
            ),
            (Language::Portuguese, ReminderKind::ThreeDays) => format!(
                "lembramos que você tem uma consulta de {} na {} em {} às {}{}.",
                f.treatment, f.clinic, f.date, f.time, with_practitioner(language, f.practitioner)
            ),
            (Language::Portuguese, ReminderKind::OneDay) => format!(
                "amanhã, {}, às {} você tem sua consulta de {} na {}{}.",
                f.date, f.time, f.treatment, f.clinic, with_practitioner(language, f.practitioner)
            ),
            (Language::Portuguese, ReminderKind::TwoHours) => format!(
                "sua consulta de {} na {} é hoje às {}{}. Esperamos por você!",
                f.treatment, f.clinic, f.time, with_practitioner(language, f.practitioner)
            ),
            (Language::English, ReminderKind::ThreeDays) => format!(
                "this is a reminder of your {} appointment at {} on {} at {}{}.",
                f.treatment, f.clinic, f.date, f.time, with_practitioner(language, f.practitioner)
            ),
            (Language::English, ReminderKind::OneDay) => format!(
                "tomorrow, {}, at {} you have your {} appointment at {}{}.",
                f.date, f.time, f.treatment, f.clinic, with_practitioner(language, f.practitioner)
            ),
            (Language::English, ReminderKind::TwoHours) => format!(
                "your {} appointment at {} is today at {}{}. See you soon!",
                f.treatment, f.clinic, f.time, with_practitioner(language, f.practitioner)
            ),
        };
        parts.push(body);

        if kind != ReminderKind::TwoHours {
            parts.push(confirmation_prompt(language).to_string());
        }

        if let Some(contact) = f.contact {
            parts.push(contact_line(language, contact));
        }

        parts.join(" ")
    }

    pub fn generate_thank_you_message(
        &self,
        config: &ReminderConfig,
        appointment: &AppointmentData,
    ) -> String {
        let language = config.language();
        let f = self.fields(config, appointment, language);

        let thanks = match (language, f.greeting_name) {
            (Language::Spanish, Some(name)) => format!("¡Gracias por tu visita, {}!", name),
            (Language::Spanish, None) => "¡Gracias por tu visita!".to_string(),
            (Language::Portuguese, Some(name)) => format!("Obrigado pela sua visita, {}!", name),
            (Language::Portuguese, None) => "Obrigado pela sua visita!".to_string(),
            (Language::English, Some(name)) => format!("Thank you for your visit, {}!", name),
            (Language::English, None) => "Thank you for your visit!".to_string(),
        };

        let body = match language {
            Language::Spanish => format!(
                "En {} fue un placer atenderte hoy en tu cita de {}{}.",
                f.clinic, f.treatment, with_practitioner(language, f.practitioner)
            ),
            Language::Portuguese => format!(
                "Na {} foi um prazer atender você hoje na sua consulta de {}{}.",
                f.clinic, f.treatment, with_practitioner(language, f.practitioner)
            ),
            Language::English => format!(
                "It was a pleasure to see you today at {} for your {} appointment{}.",
                f.clinic, f.treatment, with_practitioner(language, f.practitioner)
            ),
        };

        let mut parts = vec![thanks, body];

        if let Some(contact) = f.contact {
            parts.push(match language {
                Language::Spanish => format!(
                    "Si tienes cualquier duda sobre tu tratamiento, escríbenos al {}.",
                    contact
                ),
                Language::Portuguese => format!(
                    "Se tiver qualquer dúvida sobre o seu tratamento, escreva para {}.",
                    contact
                ),
                Language::English => format!(
                    "If you have any questions about your treatment, message us at {}.",
                    contact
                ),
            });
        }

        parts.join(" ")
    }

    /// Long-form date in the clinic locale, e.g. `lunes, 15 de enero de 2024`.
    pub fn format_long_date(&self, config: &ReminderConfig, appointment: &AppointmentData) -> String {
        let pattern = match config.language() {
            Language::Spanish => "%A, %-d de %B de %Y",
            Language::Portuguese => "%A, %-d de %B de %Y",
            Language::English => "%A, %B %-d, %Y",
        };

        // Only date fields are rendered, so anchoring at UTC midnight is exact.
        let midnight = appointment.appointment_date.and_time(NaiveTime::default());
        Utc.from_utc_datetime(&midnight)
            .format_localized(pattern, config.date_locale())
            .to_string()
    }

    fn fields<'a>(
        &self,
        config: &'a ReminderConfig,
        appointment: &'a AppointmentData,
        language: Language,
    ) -> Fields<'a> {
        let time = match parse_appointment_time(&appointment.appointment_time) {
            Ok(t) => t.format("%H:%M").to_string(),
            Err(_) => appointment.appointment_time.trim().to_string(),
        };

        Fields {
            clinic: config.clinic_name.trim(),
            greeting_name: non_blank(&appointment.patient_name),
            date: self.format_long_date(config, appointment),
            time,
            treatment: appointment.treatment_type.display_name(language),
            practitioner: appointment.practitioner_name.as_deref().and_then(non_blank),
            contact: non_blank(&config.whatsapp_number),
        }
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn greeting(language: Language, name: Option<&str>) -> String {
    match (language, name) {
        (Language::Spanish, Some(name)) => format!("Hola {},", name),
        (Language::Spanish, None) => "Hola,".to_string(),
        (Language::Portuguese, Some(name)) => format!("Olá {},", name),
        (Language::Portuguese, None) => "Olá,".to_string(),
        (Language::English, Some(name)) => format!("Hello {},", name),
        (Language::English, None) => "Hello,".to_string(),
    }
}

fn with_practitioner(language: Language, practitioner: Option<&str>) -> String {
    match (language, practitioner) {
        (_, None) => String::new(),
        (Language::Spanish, Some(name)) => format!(" con {}", name),
        (Language::Portuguese, Some(name)) => format!(" com {}", name),
        (Language::English, Some(name)) => format!(" with {}", name),
    }
}

fn confirmation_prompt(language: Language) -> &'static str {
    match language {
        Language::Spanish => "Por favor responde SÍ para confirmar o NO si necesitas reagendar.",
        Language::Portuguese => "Por favor responda SIM para confirmar ou NÃO se precisar reagendar.",
        Language::English => "Please reply YES to confirm or NO if you need to reschedule.",
    }
}

fn contact_line(language: Language, contact: &str) -> String {
    match language {
        Language::Spanish => format!("Si tienes dudas, contáctanos al {}.", contact),
        Language::Portuguese => format!("Em caso de dúvidas, fale conosco pelo {}.", contact),
        Language::English => format!("Questions? Contact us at {}.", contact),
    }
}
