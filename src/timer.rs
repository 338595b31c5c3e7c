use chrono::{Duration, NaiveDateTime};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TimerEvent {
    Tick,
    SnoozeElapsed,
}

#[derive(Debug)]
struct Timer {
    handle: TimerHandle,
    due: NaiveDateTime,
    period: Option<Duration>,
    event: TimerEvent,
}

/// Virtual-time timer wheel. Nothing runs on its own: the owner calls
/// [`TimerQueue::poll`] with the current time and dispatches the expired
/// events itself, so a cancelled timer can never be delivered afterwards.
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: Vec<Timer>,
    next_id: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// First expiry is `first_due`, then every `period` (at least 1 ms).
    pub fn schedule_repeating(
        &mut self,
        first_due: NaiveDateTime,
        period: Duration,
        event: TimerEvent,
    ) -> TimerHandle {
        let period = period.max(Duration::milliseconds(1));
        self.push(first_due, Some(period), event)
    }

    pub fn schedule_once(
        &mut self,
        now: NaiveDateTime,
        delay: Duration,
        event: TimerEvent,
    ) -> TimerHandle {
        self.push(now + delay, None, event)
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.handle != handle);
        self.timers.len() != before
    }

    #[cfg(test)]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|timer| timer.handle == handle)
    }

    pub fn next_due(&self) -> Option<NaiveDateTime> {
        self.timers.iter().map(|timer| timer.due).min()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Returns every timer due at or before `now`, earliest first. One-shot
    /// timers are removed; repeating timers re-arm at the next period
    /// boundary after `now`, so missed periods are skipped rather than
    /// replayed.
    pub fn poll(&mut self, now: NaiveDateTime) -> Vec<(TimerHandle, TimerEvent)> {
        let mut expired = Vec::new();
        for timer in &mut self.timers {
            if timer.due > now {
                continue;
            }
            expired.push((timer.due, timer.handle, timer.event));
            if let Some(period) = timer.period {
                timer.due = next_boundary(timer.due, period, now);
            }
        }
        self.timers.retain(|timer| timer.due > now);
        expired.sort_by_key(|(due, handle, _)| (*due, *handle));
        expired
            .into_iter()
            .map(|(_, handle, event)| (handle, event))
            .collect()
    }

    fn push(
        &mut self,
        due: NaiveDateTime,
        period: Option<Duration>,
        event: TimerEvent,
    ) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.timers.push(Timer {
            handle,
            due,
            period,
            event,
        });
        handle
    }
}

fn next_boundary(due: NaiveDateTime, period: Duration, now: NaiveDateTime) -> NaiveDateTime {
    let next = due + period;
    if next > now {
        return next;
    }
    let step_ms = period.num_milliseconds().max(1);
    let behind_ms = (now - due).num_milliseconds();
    due + Duration::milliseconds(step_ms * (behind_ms / step_ms + 1))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .expect("date")
            .and_hms_opt(7, 0, 0)
            .expect("time")
    }

    #[test]
    fn one_shot_fires_once_at_due_time() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule_once(start(), Duration::minutes(5), TimerEvent::SnoozeElapsed);

        assert!(queue.poll(start() + Duration::seconds(299)).is_empty());
        assert!(queue.is_pending(handle));

        let fired = queue.poll(start() + Duration::minutes(5));
        assert_eq!(fired, vec![(handle, TimerEvent::SnoozeElapsed)]);
        assert!(!queue.is_pending(handle));
        assert!(queue.poll(start() + Duration::minutes(10)).is_empty());
    }

    #[test]
    fn cancelled_timer_is_never_delivered() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule_once(start(), Duration::seconds(1), TimerEvent::SnoozeElapsed);
        assert!(queue.cancel(handle));
        assert!(!queue.cancel(handle));
        assert!(queue.poll(start() + Duration::seconds(5)).is_empty());
    }

    #[test]
    fn repeating_timer_rearms_each_period() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule_repeating(start(), Duration::seconds(1), TimerEvent::Tick);

        assert_eq!(queue.poll(start()), vec![(handle, TimerEvent::Tick)]);
        assert!(queue.poll(start() + Duration::milliseconds(500)).is_empty());
        assert_eq!(
            queue.poll(start() + Duration::seconds(1)),
            vec![(handle, TimerEvent::Tick)]
        );
        assert_eq!(queue.next_due(), Some(start() + Duration::seconds(2)));
    }

    #[test]
    fn repeating_timer_skips_missed_periods() {
        let mut queue = TimerQueue::new();
        queue.schedule_repeating(start(), Duration::seconds(1), TimerEvent::Tick);
        queue.poll(start());

        let late = start() + Duration::milliseconds(4_300);
        assert_eq!(queue.poll(late).len(), 1);
        assert_eq!(queue.next_due(), Some(start() + Duration::seconds(5)));
    }

    #[test]
    fn expired_events_come_out_in_due_order() {
        let mut queue = TimerQueue::new();
        let later = queue.schedule_once(start(), Duration::seconds(3), TimerEvent::SnoozeElapsed);
        let tick = queue.schedule_repeating(
            start() + Duration::seconds(1),
            Duration::seconds(10),
            TimerEvent::Tick,
        );
        let fired = queue.poll(start() + Duration::seconds(4));
        assert_eq!(
            fired,
            vec![(tick, TimerEvent::Tick), (later, TimerEvent::SnoozeElapsed)]
        );
        assert_eq!(queue.len(), 1);
    }
}
