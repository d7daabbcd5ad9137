// libs/reminder-cell/src/services/schedule.rs
use std::sync::OnceLock;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use uuid::Uuid;

use crate::error::ReminderError;
use crate::models::ReminderSchedule;

/// Hour of day at which the day-based reminders go out.
pub const DAY_REMINDER_HOUR: u32 = 9;

const TWO_HOURS: i64 = 2;

fn time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").expect("time pattern is a valid regex")
    })
}

/// Parse a local wall-clock time (`H:MM`, `HH:MM` or `HH:MM:SS`).
pub fn parse_appointment_time(time: &str) -> Result<NaiveTime, ReminderError> {
    let invalid = || ReminderError::InvalidInput(format!("Invalid appointment time: {:?}", time));

    let caps = time_pattern().captures(time.trim()).ok_or_else(invalid)?;

    let field = |idx: usize| -> Result<u32, ReminderError> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse::<u32>().map_err(|_| invalid()),
            None => Ok(0),
        }
    };

    let hour = field(1)?;
    let minute = field(2)?;
    let second = field(3)?;

    if hour > 23 || minute > 59 || second > 59 {
        return Err(invalid());
    }

    NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(invalid)
}

/// Compute the four fire times for an appointment on `date` at local `time`.
///
/// Day-based reminders always go out at 09:00; the two-hour marks shift with
/// the appointment and roll across midnight.
pub fn calculate_reminder_schedule(
    appointment_id: Uuid,
    date: NaiveDate,
    time: &str,
) -> Result<ReminderSchedule, ReminderError> {
    let time_of_day = parse_appointment_time(time)?;
    let appointment_at = date.and_time(time_of_day);

    let day_reminder = NaiveTime::from_hms_opt(DAY_REMINDER_HOUR, 0, 0)
        .ok_or_else(|| ReminderError::InvalidInput("Invalid reminder hour".to_string()))?;

    let days_before = |days: u64| -> Result<NaiveDateTime, ReminderError> {
        date.checked_sub_days(chrono::Days::new(days))
            .map(|d| d.and_time(day_reminder))
            .ok_or_else(|| ReminderError::InvalidInput(format!("Date out of range: {}", date)))
    };

    let shifted = |hours: i64| -> Result<NaiveDateTime, ReminderError> {
        appointment_at
            .checked_add_signed(Duration::hours(hours))
            .ok_or_else(|| {
                ReminderError::InvalidInput(format!("Date out of range: {}", appointment_at))
            })
    };

    Ok(ReminderSchedule {
        appointment_id,
        three_days_before: days_before(3)?,
        one_day_before: days_before(1)?,
        two_hours_before: shifted(-TWO_HOURS)?,
        two_hours_after: shifted(TWO_HOURS)?,
    })
}
