//! Time zone used to turn instants into calendar dates and wall-clock times

use crate::{Error, Result};
use chrono::{
    FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
};
use chrono_tz::Tz;

/// The user's zone. Offsets are looked up per instant, so dates on the other
/// side of a daylight saving change resolve with their own offset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Zone {
    /// Whatever the operating system says
    #[default]
    Local,
    /// IANA zone, e.g. `Europe/Berlin`
    Named(Tz),
    Fixed(FixedOffset),
}

impl Zone {
    pub fn utc() -> Self {
        Zone::Named(Tz::UTC)
    }

    /// Parse an IANA zone name
    pub fn parse(name: &str) -> Result<Self> {
        name.trim()
            .parse::<Tz>()
            .map(Zone::Named)
            .map_err(|_| Error::Validation(format!("Unknown time zone '{}'", name)))
    }
}

impl TimeZone for Zone {
    type Offset = FixedOffset;

    fn from_offset(offset: &FixedOffset) -> Self {
        Zone::Fixed(*offset)
    }

    fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
        self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
    }

    fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
        match self {
            Zone::Local => Local.offset_from_local_datetime(local),
            Zone::Named(tz) => tz.offset_from_local_datetime(local).map(|o| o.fix()),
            Zone::Fixed(offset) => LocalResult::Single(*offset),
        }
    }

    fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
        self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
    }

    fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
        match self {
            Zone::Local => Local.offset_from_utc_datetime(utc),
            Zone::Named(tz) => tz.offset_from_utc_datetime(utc).fix(),
            Zone::Fixed(offset) => *offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_named_zone_follows_dst() {
        let zone = Zone::parse("America/New_York").unwrap();
        let winter = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2024, 7, 15, 13, 0, 0).unwrap();

        assert_eq!(winter.with_timezone(&zone).format("%H:%M").to_string(), "09:00");
        assert_eq!(summer.with_timezone(&zone).format("%H:%M").to_string(), "09:00");
    }

    #[test]
    fn test_unknown_zone_rejected() {
        assert!(matches!(Zone::parse("Mars/Olympus"), Err(Error::Validation(_))));
    }
}
