use chrono::{NaiveDateTime, NaiveTime, Timelike};
use tracing::{debug, info, warn};

use crate::alarm::model::{Alarm, Recurrence, format_time};
use crate::alarm::recurrence::should_fire;
use crate::alarm::registry::AlarmRegistry;
use crate::alarm::snooze::{RingState, SnoozeController};
use crate::alarm::store::AlarmStore;
use crate::error::{NotificationError, PlaybackError};
use crate::ports::{AudioOutput, Notifier, Permission};
use crate::timer::{TimerHandle, TimerQueue};

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TickOutcome {
    pub evaluated: usize,
    pub fired: Vec<String>,
    pub deactivated: usize,
    pub failures: usize,
    pub skipped: bool,
}

/// Active alarms matching `now`, in registry order.
pub fn due_alarms<'a>(
    alarms: &'a [Alarm],
    now: &'a NaiveDateTime,
) -> impl Iterator<Item = &'a Alarm> + 'a {
    alarms
        .iter()
        .filter(move |alarm| alarm.is_active && should_fire(alarm, now))
}

pub fn notification_text(time: NaiveTime) -> String {
    format!("Alarm! It is {}", format_time(time))
}

pub struct TriggerEngine<A, N> {
    audio: A,
    notifier: N,
    snooze: SnoozeController,
    last_evaluated: Option<NaiveDateTime>,
}

impl<A: AudioOutput, N: Notifier> TriggerEngine<A, N> {
    pub fn new(audio: A, notifier: N) -> Self {
        Self {
            audio,
            notifier,
            snooze: SnoozeController::new(),
            last_evaluated: None,
        }
    }

    pub fn request_permission(&mut self) -> Permission {
        let permission = self.notifier.request_permission();
        debug!(?permission, "notification permission");
        permission
    }

    pub fn state(&self) -> RingState {
        self.snooze.state()
    }

    pub fn is_ringing(&self) -> bool {
        self.snooze.is_ringing()
    }

    pub fn snoozed_until(&self) -> Option<NaiveDateTime> {
        self.snooze.snoozed_until()
    }

    /// One evaluation pass. Every fire of this tick, including its side
    /// effects and one-shot deactivation, completes before returning. A
    /// second tick inside an already evaluated wall-clock second is skipped.
    pub fn on_tick<S: AlarmStore>(
        &mut self,
        registry: &mut AlarmRegistry<S>,
        now: NaiveDateTime,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let second = now.with_nanosecond(0).unwrap_or(now);
        if self.last_evaluated == Some(second) {
            debug!(%second, "second already evaluated");
            outcome.skipped = true;
            return outcome;
        }
        self.last_evaluated = Some(second);

        outcome.evaluated = registry.alarms().iter().filter(|a| a.is_active).count();
        let due: Vec<Alarm> = due_alarms(registry.alarms(), &now).cloned().collect();

        for alarm in &due {
            if !self.fire(alarm) {
                outcome.failures += 1;
            }
            outcome.fired.push(alarm.id.clone());

            if alarm.recurrence == Recurrence::Once {
                match registry.deactivate(&alarm.id) {
                    Ok(changed) => {
                        if changed {
                            outcome.deactivated += 1;
                        }
                    }
                    Err(err) => {
                        warn!(alarm_id = %alarm.id, error = %err, "could not persist one-shot deactivation");
                        outcome.deactivated += 1;
                    }
                }
            }
        }
        outcome
    }

    pub fn stop(&mut self, timers: &mut TimerQueue) -> bool {
        let stopped = self.snooze.stop(&mut self.audio, timers);
        if stopped {
            info!("alarm stopped");
        }
        stopped
    }

    pub fn snooze(&mut self, now: NaiveDateTime, timers: &mut TimerQueue) -> Option<NaiveDateTime> {
        let until = self.snooze.snooze(now, &mut self.audio, timers);
        match until {
            Some(until) => info!(until = %format_time(until.time()), "alarm snoozed"),
            None => debug!("snooze ignored, nothing is ringing"),
        }
        until
    }

    /// Snooze timer expiry. Returns whether the alarm rang again.
    pub fn on_snooze_elapsed(&mut self, handle: TimerHandle) -> bool {
        let Some(until) = self.snooze.take_expired(handle) else {
            debug!(?handle, "stale snooze timer ignored");
            return false;
        };
        info!(time = %format_time(until.time()), "snooze over, ringing again");
        self.sound_and_notify(until.time());
        true
    }

    /// Asynchronous playback failure reported by the audio output after
    /// `play_alarm_sound` already returned.
    pub fn report_playback_failure(&mut self, err: &PlaybackError) {
        warn!(error = %err, "alarm sound failed");
        self.snooze.silence();
    }

    fn fire(&mut self, alarm: &Alarm) -> bool {
        info!(alarm_id = %alarm.id, time = %format_time(alarm.time), recurrence = %alarm.recurrence, "alarm fired");
        self.sound_and_notify(alarm.time)
    }

    fn sound_and_notify(&mut self, time: NaiveTime) -> bool {
        self.snooze.ring();
        let mut ok = true;
        if let Err(err) = self.audio.play_alarm_sound() {
            self.report_playback_failure(&err);
            ok = false;
        }
        if let Err(err) = self.notify(time) {
            warn!(error = %err, "alarm notification failed");
            self.snooze.silence();
            ok = false;
        }
        ok
    }

    fn notify(&mut self, time: NaiveTime) -> Result<(), NotificationError> {
        if self.notifier.permission() != Permission::Granted {
            debug!("notification skipped, permission not granted");
            return Ok(());
        }
        self.notifier
            .show_notification(&notification_text(time), time)
    }

    #[cfg(test)]
    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    #[cfg(test)]
    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }
}
