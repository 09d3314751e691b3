use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub type ReminderId = i64;

/// A persisted reminder awaiting delivery. Immutable once stored; the only
/// mutation the system knows is deletion after the reminder has fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: ReminderId,
    /// Who asked for the reminder and gets addressed in the delivery text.
    pub author: String,
    /// Where the delivery goes, a nick or a channel name.
    pub target: String,
    /// Absolute UTC instant in whole epoch seconds.
    pub deadline: i64,
    pub body: Option<String>,
}

/// Insert input: a reminder that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewReminder {
    pub author: String,
    pub target: String,
    pub deadline: i64,
    pub body: Option<String>,
}

/// Renders an epoch-second deadline as local time in the configured zone,
/// e.g. `2038-01-19 04:14:08`.
pub fn pretty_timestamp(deadline: i64, timezone: Tz) -> String {
    match DateTime::<Utc>::from_timestamp(deadline, 0) {
        Some(instant) => instant
            .with_timezone(&timezone)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => deadline.to_string(),
    }
}
