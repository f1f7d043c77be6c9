//! Source of the current time and local zone

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Mutex;
use tally_core::models::Zone;

/// Provides "now" and the local time zone across the engine so that tests
/// can pin both.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;

    /// Zone used to turn instants into calendar dates and wall-clock times
    fn zone(&self) -> Zone;

    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.zone()).date_naive()
    }
}

#[derive(Debug, Default)]
pub struct SystemClock {
    zone: Zone,
}

impl SystemClock {
    pub fn new(zone: Zone) -> Self {
        Self { zone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn zone(&self) -> Zone {
        self.zone
    }
}

/// A clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    zone: Zone,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>, zone: Zone) -> Self {
        Self {
            now: Mutex::new(now),
            zone,
        }
    }

    /// A UTC clock pinned at `now`
    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Zone::utc())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.lock();
        *now += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned lock still holds a valid instant
        self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }

    fn zone(&self) -> Zone {
        self.zone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let clock = ManualClock::utc(start);

        clock.advance(chrono::Duration::seconds(5));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(5));
    }

    #[test]
    fn test_today_uses_offset() {
        let late = Utc.with_ymd_and_hms(2024, 1, 15, 23, 0, 0).unwrap();
        let clock = ManualClock::new(late, Zone::Fixed(FixedOffset::east_opt(3 * 3600).unwrap()));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
    }

    #[test]
    fn test_today_in_named_zone() {
        // 02:00 UTC on the 15th is still the 14th in New York
        let early = Utc.with_ymd_and_hms(2024, 7, 15, 2, 0, 0).unwrap();
        let clock = ManualClock::new(early, Zone::parse("America/New_York").unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 7, 14).unwrap());
    }
}
