use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::alarm::model::{Alarm, Recurrence};

/// Decides whether `alarm` matches `now` at second granularity. Activity is
/// the caller's concern; unrecognized recurrences never match.
pub fn should_fire(alarm: &Alarm, now: &NaiveDateTime) -> bool {
    let Some(now_time) = now.time().with_nanosecond(0) else {
        return false;
    };
    if alarm.time != now_time {
        return false;
    }

    match &alarm.recurrence {
        Recurrence::Once | Recurrence::Daily => true,
        Recurrence::Weekly { day_of_week } => day_of_week_index(now) == *day_of_week,
        Recurrence::Monthly { day_of_month } => now.day() == u32::from(*day_of_month),
        Recurrence::Unrecognized(_) => false,
    }
}

/// 0 = Sunday through 6 = Saturday.
pub fn day_of_week_index(now: &NaiveDateTime) -> u8 {
    u8::try_from(now.weekday().num_days_from_sunday()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .expect("date")
            .and_hms_opt(h, mi, s)
            .expect("time")
    }

    fn alarm(recurrence: Recurrence) -> Alarm {
        Alarm::new(
            NaiveTime::from_hms_opt(7, 30, 0).expect("time"),
            recurrence,
            1,
        )
    }

    #[test]
    fn once_and_daily_match_on_time_only() {
        // 2026-10-19 is a Monday.
        let now = at(2026, 10, 19, 7, 30, 0);
        assert!(should_fire(&alarm(Recurrence::Once), &now));
        assert!(should_fire(&alarm(Recurrence::Daily), &now));
        assert!(should_fire(&alarm(Recurrence::Daily), &at(2027, 3, 2, 7, 30, 0)));
        assert!(!should_fire(&alarm(Recurrence::Daily), &at(2026, 10, 19, 7, 30, 1)));
        assert!(!should_fire(&alarm(Recurrence::Once), &at(2026, 10, 19, 7, 31, 0)));
    }

    #[test]
    fn sub_second_part_of_now_is_ignored() {
        let now = at(2026, 10, 19, 7, 30, 0) + chrono::Duration::milliseconds(750);
        assert!(should_fire(&alarm(Recurrence::Daily), &now));
    }

    #[test]
    fn weekly_needs_time_and_weekday() {
        let weekly = alarm(Recurrence::Weekly { day_of_week: 1 });
        assert!(should_fire(&weekly, &at(2026, 10, 19, 7, 30, 0)));
        // right time, Tuesday
        assert!(!should_fire(&weekly, &at(2026, 10, 20, 7, 30, 0)));
        // Monday, wrong time
        assert!(!should_fire(&weekly, &at(2026, 10, 19, 7, 30, 1)));
        // next Monday
        assert!(should_fire(&weekly, &at(2026, 10, 26, 7, 30, 0)));
    }

    #[test]
    fn sunday_is_day_zero() {
        let sunday = at(2026, 10, 18, 7, 30, 0);
        assert_eq!(day_of_week_index(&sunday), 0);
        assert_eq!(day_of_week_index(&at(2026, 10, 24, 0, 0, 0)), 6);
        assert!(should_fire(&alarm(Recurrence::Weekly { day_of_week: 0 }), &sunday));
    }

    #[test]
    fn monthly_needs_time_and_day_of_month() {
        let monthly = alarm(Recurrence::Monthly { day_of_month: 19 });
        assert!(should_fire(&monthly, &at(2026, 10, 19, 7, 30, 0)));
        assert!(should_fire(&monthly, &at(2026, 11, 19, 7, 30, 0)));
        assert!(!should_fire(&monthly, &at(2026, 10, 20, 7, 30, 0)));
        assert!(!should_fire(&monthly, &at(2026, 10, 19, 8, 30, 0)));
    }

    #[test]
    fn day_31_skips_short_months() {
        let monthly = alarm(Recurrence::Monthly { day_of_month: 31 });
        assert!(!should_fire(&monthly, &at(2026, 11, 30, 7, 30, 0)));
        assert!(should_fire(&monthly, &at(2026, 12, 31, 7, 30, 0)));
    }

    #[test]
    fn unrecognized_recurrence_never_fires() {
        let odd = alarm(Recurrence::Unrecognized("yearly".to_string()));
        assert!(!should_fire(&odd, &at(2026, 10, 19, 7, 30, 0)));
    }

    #[test]
    fn inactive_alarm_still_evaluates_as_pure_match() {
        let mut daily = alarm(Recurrence::Daily);
        daily.is_active = false;
        assert!(should_fire(&daily, &at(2026, 10, 19, 7, 30, 0)));
    }
}
