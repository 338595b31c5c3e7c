use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::ports::AudioOutput;
use crate::timer::{TimerEvent, TimerHandle, TimerQueue};

pub const SNOOZE_DELAY_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RingState {
    Idle,
    Ringing,
    Snoozed,
}

#[derive(Debug, Clone, Copy)]
struct PendingSnooze {
    handle: TimerHandle,
    until: NaiveDateTime,
}

/// Ringing flag plus the single outstanding snooze timer. Ringing wins when
/// both are set (an alarm fired while a snooze was pending).
#[derive(Debug)]
pub struct SnoozeController {
    ringing: bool,
    pending: Option<PendingSnooze>,
    delay: Duration,
}

impl Default for SnoozeController {
    fn default() -> Self {
        Self::new()
    }
}

impl SnoozeController {
    pub fn new() -> Self {
        Self {
            ringing: false,
            pending: None,
            delay: Duration::minutes(SNOOZE_DELAY_MINUTES),
        }
    }

    pub fn state(&self) -> RingState {
        if self.ringing {
            RingState::Ringing
        } else if self.pending.is_some() {
            RingState::Snoozed
        } else {
            RingState::Idle
        }
    }

    pub fn is_ringing(&self) -> bool {
        self.ringing
    }

    pub fn snoozed_until(&self) -> Option<NaiveDateTime> {
        self.pending.map(|pending| pending.until)
    }

    pub(crate) fn ring(&mut self) {
        self.ringing = true;
    }

    /// Drops the ringing flag without touching a pending snooze; used when a
    /// side effect fails.
    pub(crate) fn silence(&mut self) {
        self.ringing = false;
    }

    /// Stops the sound and cancels any pending snooze. No-op when idle.
    pub fn stop(&mut self, audio: &mut impl AudioOutput, timers: &mut TimerQueue) -> bool {
        if self.state() == RingState::Idle {
            return false;
        }
        audio.stop_alarm_sound();
        self.ringing = false;
        if let Some(pending) = self.pending.take() {
            timers.cancel(pending.handle);
            debug!(until = %pending.until, "pending snooze cancelled");
        }
        true
    }

    /// Stops the ringing and arms a fresh snooze timer, replacing any older
    /// one. Returns the snoozed-to time, or `None` when nothing is ringing.
    pub fn snooze(
        &mut self,
        now: NaiveDateTime,
        audio: &mut impl AudioOutput,
        timers: &mut TimerQueue,
    ) -> Option<NaiveDateTime> {
        if !self.ringing {
            return None;
        }
        self.stop(audio, timers);
        let handle = timers.schedule_once(now, self.delay, TimerEvent::SnoozeElapsed);
        let until = now + self.delay;
        self.pending = Some(PendingSnooze { handle, until });
        Some(until)
    }

    /// Consumes the pending snooze if `handle` is the live one and re-enters
    /// ringing. Stale handles yield `None`.
    pub fn take_expired(&mut self, handle: TimerHandle) -> Option<NaiveDateTime> {
        match self.pending {
            Some(pending) if pending.handle == handle => {
                self.pending = None;
                self.ringing = true;
                Some(pending.until)
            }
            _ => None,
        }
    }
}
