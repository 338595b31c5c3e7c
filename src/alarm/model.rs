use std::collections::HashSet;
use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::{StoreError, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub id: String,
    pub time: NaiveTime,
    pub is_active: bool,
    pub recurrence: Recurrence,
}

impl Alarm {
    pub fn new(time: NaiveTime, recurrence: Recurrence, created_unix_ms: i64) -> Self {
        Self {
            id: alarm_id(time, created_unix_ms),
            time,
            is_active: true,
            recurrence,
        }
    }

    /// Two alarms occupy the same slot when they share time and recurrence.
    pub fn same_slot(&self, other: &Alarm) -> bool {
        self.time == other.time && self.recurrence == other.recurrence
    }
}

pub(crate) fn alarm_id(time: NaiveTime, created_unix_ms: i64) -> String {
    format!(
        "{}_{}_{}_{}",
        time.hour(),
        time.minute(),
        time.second(),
        created_unix_ms
    )
}

/// Day fields live on the variant that needs them. `Unrecognized` keeps a
/// persisted tag this build does not understand so it survives a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    Once,
    Daily,
    Weekly { day_of_week: u8 },
    Monthly { day_of_month: u8 },
    Unrecognized(String),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RecurrenceKind {
    Once,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn from_kind(kind: RecurrenceKind, day: Option<i64>) -> Result<Self, ValidationError> {
        match kind {
            RecurrenceKind::Once => Ok(Recurrence::Once),
            RecurrenceKind::Daily => Ok(Recurrence::Daily),
            RecurrenceKind::Weekly => {
                let day = day.ok_or(ValidationError::MissingDay {
                    recurrence: "weekly",
                })?;
                let day_of_week = u8::try_from(day)
                    .ok()
                    .filter(|value| *value <= 6)
                    .ok_or(ValidationError::DayOfWeek(day))?;
                Ok(Recurrence::Weekly { day_of_week })
            }
            RecurrenceKind::Monthly => {
                let day = day.ok_or(ValidationError::MissingDay {
                    recurrence: "monthly",
                })?;
                let day_of_month = u8::try_from(day)
                    .ok()
                    .filter(|value| (1..=31).contains(value))
                    .ok_or(ValidationError::DayOfMonth(day))?;
                Ok(Recurrence::Monthly { day_of_month })
            }
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Recurrence::Once => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly { .. } => "weekly",
            Recurrence::Monthly { .. } => "monthly",
            Recurrence::Unrecognized(tag) => tag,
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::Weekly { day_of_week } => write!(f, "weekly (day {day_of_week})"),
            Recurrence::Monthly { day_of_month } => write!(f, "monthly (day {day_of_month})"),
            other => f.write_str(other.tag()),
        }
    }
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

pub fn validate_time(hour: i64, minute: i64, second: i64) -> Result<NaiveTime, ValidationError> {
    let hour_value = bounded(hour, 23).ok_or(ValidationError::Hour(hour))?;
    let minute_value = bounded(minute, 59).ok_or(ValidationError::Minute(minute))?;
    let second_value = bounded(second, 59).ok_or(ValidationError::Second(second))?;
    NaiveTime::from_hms_opt(hour_value, minute_value, second_value)
        .ok_or(ValidationError::Hour(hour))
}

fn bounded(value: i64, max: u32) -> Option<u32> {
    u32::try_from(value).ok().filter(|v| *v <= max)
}

/// Reads a form field the lenient way: leading sign and digits count,
/// anything else (including an empty field) is 0.
pub fn parse_time_field(input: &str) -> i64 {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return 0;
    }
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    if negative { -magnitude } else { magnitude }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmSettings {
    pub notifications_enabled: bool,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlarmDocument {
    pub settings: AlarmSettings,
    pub alarms: Vec<Alarm>,
}

pub fn parse_alarm_document(content: &str) -> Result<AlarmDocument, StoreError> {
    let raw =
        serde_json::from_str::<AlarmDocumentFile>(content).map_err(|err| StoreError::Json {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        })?;

    if raw.version != 1 {
        return Err(StoreError::Version(raw.version));
    }

    let mut ids = HashSet::new();
    let mut alarms = Vec::with_capacity(raw.alarms.len());
    for alarm in raw.alarms {
        if !ids.insert(alarm.id.clone()) {
            return Err(StoreError::DuplicateId(alarm.id));
        }
        let time = parse_local_time(&alarm.time).ok_or_else(|| StoreError::Time {
            id: alarm.id.clone(),
            value: alarm.time.clone(),
        })?;
        let recurrence = match alarm.recurrence.as_str() {
            "none" => Ok(Recurrence::Once),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Recurrence::from_kind(RecurrenceKind::Weekly, alarm.day_of_week),
            "monthly" => Recurrence::from_kind(RecurrenceKind::Monthly, alarm.day_of_month),
            other => Ok(Recurrence::Unrecognized(other.to_string())),
        }
        .map_err(|reason| StoreError::Invalid {
            id: alarm.id.clone(),
            reason,
        })?;

        alarms.push(Alarm {
            id: alarm.id,
            time,
            is_active: alarm.is_active,
            recurrence,
        });
    }

    Ok(AlarmDocument {
        settings: AlarmSettings {
            notifications_enabled: raw.settings.notifications_enabled,
        },
        alarms,
    })
}

pub fn render_alarm_document(
    alarms: &[Alarm],
    settings: &AlarmSettings,
) -> Result<String, StoreError> {
    let mut serialized_alarms = Vec::with_capacity(alarms.len());
    for alarm in alarms {
        let mut alarm_obj = Map::new();
        alarm_obj.insert("id".to_string(), Value::String(alarm.id.clone()));
        alarm_obj.insert("time".to_string(), Value::String(format_time(alarm.time)));
        alarm_obj.insert("is_active".to_string(), Value::Bool(alarm.is_active));
        alarm_obj.insert(
            "recurrence".to_string(),
            Value::String(alarm.recurrence.tag().to_string()),
        );
        match alarm.recurrence {
            Recurrence::Weekly { day_of_week } => {
                alarm_obj.insert("day_of_week".to_string(), Value::from(day_of_week));
            }
            Recurrence::Monthly { day_of_month } => {
                alarm_obj.insert("day_of_month".to_string(), Value::from(day_of_month));
            }
            _ => {}
        }
        serialized_alarms.push(Value::Object(alarm_obj));
    }

    let payload = json!({
        "version": 1,
        "settings": {
            "notifications_enabled": settings.notifications_enabled
        },
        "alarms": serialized_alarms,
    });
    let text = serde_json::to_string_pretty(&payload)
        .map_err(|err| StoreError::Serialize(err.to_string()))?;
    Ok(format!("{text}\n"))
}

fn parse_local_time(input: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(input, "%H:%M:%S").ok()
}

#[derive(Debug, Deserialize)]
struct AlarmDocumentFile {
    version: u32,
    #[serde(default)]
    settings: AlarmSettingsFile,
    #[serde(default)]
    alarms: Vec<AlarmFile>,
}

#[derive(Debug, Deserialize)]
struct AlarmSettingsFile {
    #[serde(default = "default_true")]
    notifications_enabled: bool,
}

impl Default for AlarmSettingsFile {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AlarmFile {
    id: String,
    time: String,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default = "default_recurrence")]
    recurrence: String,
    #[serde(default)]
    day_of_week: Option<i64>,
    #[serde(default)]
    day_of_month: Option<i64>,
}

fn default_true() -> bool {
    true
}

fn default_recurrence() -> String {
    "none".to_string()
}
