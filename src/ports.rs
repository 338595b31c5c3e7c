//! Side-effect boundaries of the alarm engine. The engine only talks to
//! sound and notification output through these traits; concrete adapters
//! live in [`crate::console`].

use chrono::NaiveTime;

use crate::error::{NotificationError, PlaybackError};

pub trait AudioOutput {
    /// Starts the alarm sound. Returns once playback is requested; a device
    /// failure discovered later is reported through the engine's
    /// `report_playback_failure`.
    fn play_alarm_sound(&mut self) -> Result<(), PlaybackError>;

    /// Stops and rewinds the alarm sound. Stopping silence is fine.
    fn stop_alarm_sound(&mut self);
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Permission {
    Undecided,
    Granted,
    Denied,
}

pub trait Notifier {
    fn request_permission(&mut self) -> Permission;

    fn permission(&self) -> Permission;

    /// Only called while permission is granted.
    fn show_notification(&mut self, text: &str, time: NaiveTime) -> Result<(), NotificationError>;
}
