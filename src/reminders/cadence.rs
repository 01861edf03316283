//! Reminder cadence: decides, for one subscription, whether a reminder is due.
//!
//! The decision only depends on the time left before expiry and the time elapsed since the
//! last reminder. Cadence is measured in days, compared as exact durations, so the 3.5 day
//! interval is 84 hours.

use chrono::{DateTime, Duration, Utc};

/// Band of time-to-expiry mapped to a minimum reminder interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderTier {
    /// 30 days or less left, expired subscriptions included.
    Imminent,
    /// More than 30 and up to 60 days left.
    Near,
    /// More than 60 and up to 90 days left.
    Approaching,
    /// More than 90 days left.
    Distant,
}

impl ReminderTier {
    pub fn for_remaining(remaining: Duration) -> ReminderTier {
        if remaining <= Duration::days(30) {
            ReminderTier::Imminent
        } else if remaining <= Duration::days(60) {
            ReminderTier::Near
        } else if remaining <= Duration::days(90) {
            ReminderTier::Approaching
        } else {
            ReminderTier::Distant
        }
    }

    pub fn interval(&self) -> Duration {
        match self {
            ReminderTier::Imminent => Duration::days(1),
            ReminderTier::Near => Duration::hours(84),
            ReminderTier::Approaching => Duration::days(7),
            ReminderTier::Distant => Duration::days(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A reminder is due. The caller stores `new_last_notification` and sends the email.
    Send {
        new_last_notification: DateTime<Utc>,
    },
    Skip,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ReminderError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A `last_notification` later than `now` gives a negative elapsed time and is skipped.
pub fn evaluate(
    now: DateTime<Utc>,
    expiry_date: DateTime<Utc>,
    last_notification: Option<DateTime<Utc>>,
) -> Decision {
    let tier = ReminderTier::for_remaining(expiry_date - now);

    match last_notification {
        Some(last_notification) if now - last_notification < tier.interval() => Decision::Skip,
        _ => Decision::Send {
            new_last_notification: now,
        },
    }
}

/// Parses an RFC 3339 timestamp received as text, e.g. in a request body.
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, ReminderError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| ReminderError::InvalidInput(format!("{} `{}`: {}", field, value, err)))
}
