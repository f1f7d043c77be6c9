//! Human-readable renderings of dates, times and durations

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::fmt::Display;

/// `"<H>h <M>m"` for a minute count
pub fn format_duration(minutes: u64) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// `"<H>h <M>m <S>s"` for a running timer
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{}h {}m {}s", hours, minutes, secs)
}

/// e.g. `"Mon, Jan 15, 2024"`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%a, %b %-d, %Y").to_string()
}

/// e.g. `"09:00 AM"`, with the offset `tz` had at `instant`
pub fn format_time<Tz>(instant: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    instant.with_timezone(tz).format("%I:%M %p").to_string()
}

pub fn export_file_name(today: NaiveDate) -> String {
    format!("time-tracker-export-{}.csv", today.format("%Y-%m-%d"))
}
