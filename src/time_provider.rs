use chrono::{Local, NaiveDateTime};

pub trait TimeProvider {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[cfg(test)]
pub struct ManualTimeProvider {
    now: std::cell::Cell<NaiveDateTime>,
}

#[cfg(test)]
impl ManualTimeProvider {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: std::cell::Cell::new(start),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

#[cfg(test)]
impl TimeProvider for ManualTimeProvider {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn system_provider_moves_forward() {
        let provider = SystemTimeProvider;
        let first = provider.now();
        thread::sleep(Duration::from_millis(2));
        let second = provider.now();
        assert!(second >= first);
    }

    #[test]
    fn manual_provider_advances_on_request() {
        let start = NaiveDate::from_ymd_opt(2026, 10, 19)
            .expect("date")
            .and_hms_opt(7, 29, 59)
            .expect("time");
        let provider = ManualTimeProvider::new(start);
        provider.advance(chrono::Duration::seconds(1));
        assert_eq!(provider.now(), start + chrono::Duration::seconds(1));
        provider.set(start);
        assert_eq!(provider.now(), start);
    }
}
