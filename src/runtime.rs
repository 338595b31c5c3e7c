use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;

use chrono::{Duration, NaiveDateTime, Timelike};
use tracing::{debug, info, warn};

use crate::alarm::engine::TriggerEngine;
use crate::alarm::model::format_time;
use crate::alarm::registry::AlarmRegistry;
use crate::alarm::snooze::RingState;
use crate::alarm::store::AlarmStore;
use crate::ports::{AudioOutput, Notifier};
use crate::time_provider::TimeProvider;
use crate::timer::{TimerEvent, TimerQueue};

pub const TICK_PERIOD_MS: i64 = 1_000;
/// Ticks land this far past each whole second so wake-up jitter stays
/// inside the second being evaluated.
pub const TICK_OFFSET_MS: i64 = 5;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Command {
    Stop,
    Snooze,
    Quit,
}

impl Command {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "s" | "stop" => Some(Command::Stop),
            "z" | "snooze" => Some(Command::Snooze),
            "q" | "quit" => Some(Command::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct StepOutcome {
    pub ticks: usize,
    pub fired: usize,
    pub snooze_rings: usize,
    pub state_change: Option<RingState>,
}

/// Ties the registry, engine and timers to one clock. Everything runs on
/// the caller's thread: timers are polled, then user commands are applied
/// between polls.
pub struct AlarmClock<S, A, N, C> {
    registry: AlarmRegistry<S>,
    engine: TriggerEngine<A, N>,
    timers: TimerQueue,
    clock: C,
    reported: RingState,
}

impl<S, A, N, C> AlarmClock<S, A, N, C>
where
    S: AlarmStore,
    A: AudioOutput,
    N: Notifier,
    C: TimeProvider,
{
    pub fn new(registry: AlarmRegistry<S>, mut engine: TriggerEngine<A, N>, clock: C) -> Self {
        engine.request_permission();
        let now = clock.now();
        let mut timers = TimerQueue::new();
        timers.schedule_once(now, Duration::zero(), TimerEvent::Tick);
        timers.schedule_repeating(
            first_aligned_tick(now),
            Duration::milliseconds(TICK_PERIOD_MS),
            TimerEvent::Tick,
        );
        let reported = engine.state();
        Self {
            registry,
            engine,
            timers,
            clock,
            reported,
        }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &AlarmRegistry<S> {
        &self.registry
    }

    #[cfg(test)]
    pub fn engine(&self) -> &TriggerEngine<A, N> {
        &self.engine
    }

    #[cfg(test)]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Dispatches every timer due at the current clock reading.
    pub fn step(&mut self) -> StepOutcome {
        let now = self.clock.now();
        let mut outcome = StepOutcome::default();
        for (handle, event) in self.timers.poll(now) {
            match event {
                TimerEvent::Tick => {
                    debug!(now = %format_time(now.time()), "tick");
                    let tick = self.engine.on_tick(&mut self.registry, now);
                    if tick.skipped {
                        continue;
                    }
                    outcome.ticks += 1;
                    outcome.fired += tick.fired.len();
                    if !tick.fired.is_empty() {
                        debug!(
                            evaluated = tick.evaluated,
                            deactivated = tick.deactivated,
                            failures = tick.failures,
                            "tick fired alarms"
                        );
                    }
                }
                TimerEvent::SnoozeElapsed => {
                    if self.engine.on_snooze_elapsed(handle) {
                        outcome.snooze_rings += 1;
                    }
                }
            }
        }
        outcome.state_change = self.report_state();
        outcome
    }

    /// Applies a user command. Returns `false` once the loop should end.
    pub fn handle(&mut self, command: Command) -> bool {
        let keep_running = match command {
            Command::Stop => {
                if !self.engine.stop(&mut self.timers) {
                    debug!("stop ignored, nothing is ringing");
                }
                true
            }
            Command::Snooze => {
                if self.engine.is_ringing() {
                    let now = self.clock.now();
                    self.engine.snooze(now, &mut self.timers);
                } else {
                    debug!("snooze ignored, nothing is ringing");
                }
                true
            }
            Command::Quit => {
                self.engine.stop(&mut self.timers);
                false
            }
        };
        self.report_state();
        keep_running
    }

    /// Announces ring state transitions so the stop/snooze controls are
    /// only offered while they apply.
    fn report_state(&mut self) -> Option<RingState> {
        let state = self.engine.state();
        if state == self.reported {
            return None;
        }
        self.reported = state;
        match state {
            RingState::Ringing => info!("alarm ringing, s = stop, z = snooze"),
            RingState::Snoozed => match self.engine.snoozed_until() {
                Some(until) => info!("snoozed until {}, s = stop", format_time(until.time())),
                None => info!("snoozed, s = stop"),
            },
            RingState::Idle => info!("alarm silenced"),
        }
        Some(state)
    }

    /// Runs until a `Quit` command arrives. A closed command channel keeps
    /// the clock running without input.
    pub fn run(&mut self, commands: Receiver<Command>) {
        info!(alarms = self.registry.len(), "alarm clock running");
        let mut input_open = true;
        loop {
            let step = self.step();
            if step.snooze_rings > 0 {
                debug!(fired = step.fired, "snoozed alarm rang again");
            }
            let wait = self.wait_until_next_timer();
            if !input_open {
                thread::sleep(wait);
                continue;
            }
            match commands.recv_timeout(wait) {
                Ok(command) => {
                    if !self.handle(command) {
                        info!("alarm clock stopped");
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("command input closed, running without controls");
                    input_open = false;
                }
            }
        }
    }

    #[cfg(test)]
    fn reported_state(&self) -> RingState {
        self.reported
    }

    fn wait_until_next_timer(&self) -> std::time::Duration {
        let now: NaiveDateTime = self.clock.now();
        self.timers
            .next_due()
            .and_then(|due| (due - now).to_std().ok())
            .unwrap_or(std::time::Duration::ZERO)
            .min(std::time::Duration::from_millis(TICK_PERIOD_MS.unsigned_abs()))
    }
}

fn first_aligned_tick(now: NaiveDateTime) -> NaiveDateTime {
    let second = now.with_nanosecond(0).unwrap_or(now);
    second + Duration::milliseconds(TICK_PERIOD_MS + TICK_OFFSET_MS)
}
