use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Source of "now". Injected everywhere a decision depends on the time so
/// tests can pin it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Attendance is keyed by the worker's local date, not the UTC date.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    pub struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self(Mutex::new(now))
        }

        pub fn set(&self, now: DateTime<Utc>) {
            *self.0.lock().unwrap() = now;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn local_date_can_differ_from_utc_date() {
        // 20:30 UTC is already 02:30 the next day in Dhaka (UTC+6)
        let instant = Utc.with_ymd_and_hms(2026, 3, 9, 20, 30, 0).unwrap();
        assert_eq!(
            local_date(instant, chrono_tz::Asia::Dhaka),
            NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
        );
        assert_eq!(
            local_date(instant, chrono_tz::UTC),
            NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
        );
    }
}
