//! CSV export of time entries grouped by company

use crate::{
    format::{format_date, format_duration, format_time},
    models::{Company, TimeEntry},
    Error, Result,
};
use chrono::TimeZone;
use std::fmt::Display;
use serde::Serialize;
use std::io::Write;

const HEADER: [&str; 6] = ["Company", "Date", "Start Time", "End Time", "Duration", "Type"];

/// One exported row
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    company: &'a str,
    date: String,
    start_time: String,
    end_time: String,
    duration: String,
    kind: &'static str,
}

impl<'a> ExportRow<'a> {
    fn new<Tz>(company: &'a Company, entry: &TimeEntry, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            company: &company.name,
            date: format_date(entry.date),
            start_time: format_time(entry.start_time, tz),
            end_time: format_time(entry.end_time, tz),
            duration: format_duration(entry.duration_minutes),
            kind: entry.kind_label(),
        }
    }
}

/// Write the header and one row per entry, companies in the given order and
/// entries in their given order within each company. Entries whose company is
/// not in `companies` are left out.
///
/// Every field is quoted; quotes inside a field are doubled. Returns the
/// number of entry rows written.
pub fn write_csv<W, Tz>(
    writer: W,
    companies: &[Company],
    entries: &[TimeEntry],
    tz: &Tz,
) -> Result<usize>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    writer.write_record(HEADER)?;

    let mut rows = 0;
    for company in companies {
        for entry in entries.iter().filter(|e| e.company_id == company.id) {
            writer.serialize(ExportRow::new(company, entry, tz))?;
            rows += 1;
        }
    }

    writer.flush()?;
    Ok(rows)
}

/// Render the whole export as a string
pub fn export_csv<Tz>(companies: &[Company], entries: &[TimeEntry], tz: &Tz) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut buffer = Vec::new();
    write_csv(&mut buffer, companies, entries, tz)?;
    String::from_utf8(buffer).map_err(|e| Error::InvalidData(format!("Export not UTF-8: {}", e)))
}
