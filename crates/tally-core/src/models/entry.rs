//! Time entry data model

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A durable record of worked time against a company
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeEntry {
    pub id: String,
    pub company_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Whole minutes, rounded to the nearest minute
    #[serde(rename = "duration")]
    pub duration_minutes: u64,
    pub is_manual: bool,
    pub date: NaiveDate,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the `time_entries` collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTimeEntry {
    pub company_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_minutes: u64,
    pub is_manual: bool,
    pub date: NaiveDate,
    pub user_id: String,
}

/// Partial update for a time entry row
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u64>,
}

/// Minutes between two instants, rounded half up.
///
/// Fails when `end` is before `start`.
pub fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<u64> {
    if end < start {
        return Err(Error::Validation(
            "End time must not be before start time".to_string(),
        ));
    }
    Ok(rounded_minutes(start, end))
}

/// Half-up minutes for `end >= start`, 0 otherwise
fn rounded_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    let millis = end.signed_duration_since(start).num_milliseconds().max(0);
    ((millis + 30_000) / 60_000) as u64
}

/// Resolve a wall-clock date and time in `tz` to an absolute instant, using
/// the offset in force on that date.
///
/// A time repeated by a backwards clock change resolves to its first
/// occurrence; a time skipped by a forwards change is an error.
pub fn local_instant<Tz: TimeZone>(
    date: NaiveDate,
    time: NaiveTime,
    tz: &Tz,
) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            Error::Validation(format!("{} {} does not exist in the local time zone", date, time))
        })
}

impl NewTimeEntry {
    /// Entry for a timer that ran from `start` to `end`.
    ///
    /// The calendar date is the date of `start` in `tz`. An `end` earlier
    /// than `start` (clock moved backwards) is clamped to `start`.
    pub fn tracked<Tz: TimeZone>(
        company_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tz: &Tz,
        user_id: String,
    ) -> Self {
        let end = end.max(start);

        Self {
            company_id,
            start_time: start,
            end_time: end,
            duration_minutes: rounded_minutes(start, end),
            is_manual: false,
            date: start.with_timezone(tz).date_naive(),
            user_id,
        }
    }

    /// Entry for a manually recorded interval on a single calendar day
    pub fn manual<Tz: TimeZone>(
        company_id: String,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        tz: &Tz,
        user_id: String,
    ) -> Result<Self> {
        let start_time = local_instant(date, start, tz)?;
        let end_time = local_instant(date, end, tz)?;
        let duration = duration_minutes(start_time, end_time)?;

        Ok(Self {
            company_id,
            start_time,
            end_time,
            duration_minutes: duration,
            is_manual: true,
            date,
            user_id,
        })
    }
}

impl TimeEntry {
    /// "Manual" or "Tracked"
    pub fn kind_label(&self) -> &'static str {
        if self.is_manual {
            "Manual"
        } else {
            "Tracked"
        }
    }

    /// Apply a patch that the gateway has already accepted
    pub fn apply(&mut self, patch: &EntryPatch) {
        if let Some(start) = patch.start_time {
            self.start_time = start;
        }
        if let Some(end) = patch.end_time {
            self.end_time = end;
        }
        if let Some(duration) = patch.duration_minutes {
            self.duration_minutes = duration;
        }
    }
}

impl EntryPatch {
    /// New start/end pair with the duration recomputed
    pub fn retimed(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        let duration = duration_minutes(start, end)?;
        Ok(Self {
            start_time: Some(start),
            end_time: Some(end),
            duration_minutes: Some(duration),
        })
    }
}
