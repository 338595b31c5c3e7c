use std::io::{self, Write};

use chrono::NaiveTime;

use crate::alarm::model::format_time;
use crate::error::{NotificationError, PlaybackError};
use crate::ports::{AudioOutput, Notifier, Permission};

const BELL: &[u8] = b"\x07";

/// Rings the terminal bell.
pub struct TerminalBell<W> {
    out: W,
    playing: bool,
}

impl TerminalBell<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            playing: false,
        }
    }

    #[cfg(test)]
    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

impl<W: Write> AudioOutput for TerminalBell<W> {
    fn play_alarm_sound(&mut self) -> Result<(), PlaybackError> {
        self.out.write_all(BELL)?;
        self.out.flush()?;
        self.playing = true;
        Ok(())
    }

    fn stop_alarm_sound(&mut self) {
        self.playing = false;
    }
}

/// Prints notifications as `[HH:MM:SS] text` lines. Permission follows the
/// `notifications_enabled` setting.
pub struct ConsoleNotifier<W> {
    out: W,
    enabled: bool,
    permission: Permission,
}

impl ConsoleNotifier<io::Stdout> {
    pub fn stdout(enabled: bool) -> Self {
        Self::new(io::stdout(), enabled)
    }
}

impl<W: Write> ConsoleNotifier<W> {
    pub fn new(out: W, enabled: bool) -> Self {
        Self {
            out,
            enabled,
            permission: Permission::Undecided,
        }
    }
}

impl<W: Write> Notifier for ConsoleNotifier<W> {
    fn request_permission(&mut self) -> Permission {
        if self.permission == Permission::Undecided {
            self.permission = if self.enabled {
                Permission::Granted
            } else {
                Permission::Denied
            };
        }
        self.permission
    }

    fn permission(&self) -> Permission {
        self.permission
    }

    fn show_notification(&mut self, text: &str, time: NaiveTime) -> Result<(), NotificationError> {
        writeln!(self.out, "[{}] {text}", format_time(time))?;
        self.out.flush()?;
        Ok(())
    }
}
