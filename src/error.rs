use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid time. Please enter valid values! (hour {0} is outside 0-23)")]
    Hour(i64),
    #[error("Invalid time. Please enter valid values! (minute {0} is outside 0-59)")]
    Minute(i64),
    #[error("Invalid time. Please enter valid values! (second {0} is outside 0-59)")]
    Second(i64),
    #[error("{recurrence} alarms need a day")]
    MissingDay { recurrence: &'static str },
    #[error("day of week {0} is outside 0-6 (0 = Sunday)")]
    DayOfWeek(i64),
    #[error("day of month {0} is outside 1-31")]
    DayOfMonth(i64),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("audio output failed")]
    Device(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification output failed")]
    Output(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to read alarm file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to write alarm file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON at line {line}, column {column}: {message}")]
    Json {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("unsupported alarm file version {0}; expected version 1")]
    Version(u32),
    #[error("duplicate alarm id found: {0}")]
    DuplicateId(String),
    #[error("invalid time '{value}' for alarm '{id}', expected HH:MM:SS")]
    Time { id: String, value: String },
    #[error("alarm '{id}' is invalid: {reason}")]
    Invalid { id: String, reason: ValidationError },
    #[error("unable to serialize alarms: {0}")]
    Serialize(String),
}
