use crate::error::Result;
use crate::format;
use crate::store::WorkoutRecord;
use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use std::io::Write;

/// Medium date with short time, e.g. `Oct 19, 2026, 2:05 PM`
pub fn date_text<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%b %-d, %Y, %-I:%M %p").to_string()
}

/// One history line: mode, date, reps, duration
pub fn row_text(record: &WorkoutRecord) -> String {
    format!(
        "{:<5} {:<24} {:>4} reps  {:>7}",
        record.mode,
        date_text(&record.timestamp.with_timezone(&Local)),
        record.completed_reps,
        format::abbreviated(record.duration_secs),
    )
}

const CSV_HEADER: [&str; 7] = [
    "id",
    "timestamp",
    "mode",
    "target_value",
    "completed_reps",
    "duration_secs",
    "average_form_score",
];

#[derive(Serialize)]
struct CsvRow<'a> {
    id: String,
    timestamp: String,
    mode: &'a str,
    target_value: u32,
    completed_reps: u32,
    duration_secs: f64,
    average_form_score: Option<f64>,
}

/// Write records as CSV with a header row. Returns the number of rows.
pub fn export_csv<W, I>(records: I, out: W) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = Result<WorkoutRecord>>,
{
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    wtr.write_record(CSV_HEADER)?;

    let mut rows = 0;
    for record in records {
        let record = record?;
        wtr.serialize(CsvRow {
            id: record.id.to_string(),
            timestamp: record.timestamp.to_rfc3339(),
            mode: record.mode.as_str(),
            target_value: record.target_value,
            completed_reps: record.completed_reps,
            duration_secs: record.duration_secs,
            average_form_score: record.average_form_score,
        })?;
        rows += 1;
    }
    wtr.flush()?;
    Ok(rows)
}
