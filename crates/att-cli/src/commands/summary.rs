//! Summary command for per-employee daily worked and break time.

use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;
use att_core::{
    AttendanceQuery, AttendanceRecord, DailySummary, EmployeeId, SummaryPolicy, bucketize,
    summarize_all,
};
use att_db::Database;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// A daily summary with the employee's display name.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub employee_name: String,
    #[serde(flatten)]
    pub summary: DailySummary,
}

/// Summarizes `records` as of `now`, one row per employee and day.
pub fn summarize_records(
    records: &[AttendanceRecord],
    now: DateTime<FixedOffset>,
    policy: &SummaryPolicy,
) -> Vec<SummaryRow> {
    let names: HashMap<EmployeeId, &str> = records
        .iter()
        .map(|r| (r.event.employee_id, r.employee_name.as_str()))
        .collect();
    summarize_all(&bucketize(records), now, policy)
        .into_iter()
        .map(|summary| SummaryRow {
            employee_name: names
                .get(&summary.employee_id)
                .copied()
                .unwrap_or_default()
                .to_string(),
            summary,
        })
        .collect()
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    query: &AttendanceQuery,
    now: DateTime<FixedOffset>,
    policy: &SummaryPolicy,
    json: bool,
) -> Result<()> {
    // Summaries need whole days, so the listing limit does not apply.
    let query = AttendanceQuery {
        limit: None,
        ..query.clone()
    };
    let records = db.list_attendance(&query)?;
    let rows = summarize_records(&records, now, policy);

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&rows)?)?;
        return Ok(());
    }
    write_table(writer, &rows)
}

fn write_table<W: Write>(writer: &mut W, rows: &[SummaryRow]) -> Result<()> {
    if rows.is_empty() {
        writeln!(writer, "No attendance events.")?;
        return Ok(());
    }

    let name_width = rows
        .iter()
        .map(|row| row.employee_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("EMPLOYEE".len());

    writeln!(
        writer,
        "{:<10}  {:<name_width$}  {:<8}  {:<8}  {:>6}  {:>6}",
        "DATE", "EMPLOYEE", "FIRST IN", "LAST OUT", "BREAK", "WORKED"
    )?;
    for row in rows {
        let summary = &row.summary;
        let first_in = summary
            .first_checkin
            .map_or_else(|| "-".to_string(), |t| t.format("%H:%M:%S").to_string());
        let last_out = summary
            .last_checkout
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        writeln!(
            writer,
            "{:<10}  {:<name_width$}  {:<8}  {:<8}  {:>6}  {:>6}",
            summary.date,
            row.employee_name,
            first_in,
            last_out,
            format_hours(summary.break_seconds),
            format_hours(summary.worked_seconds),
        )?;
    }
    Ok(())
}

/// Formats seconds as `Hh MMm`.
fn format_hours(seconds: i64) -> String {
    let minutes = seconds.max(0) / 60;
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use att_core::{FixedClock, RecorderPolicy, Status};
    use att_db::NewEmployee;

    use super::*;
    use crate::commands::ingest;

    fn seeded() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        for (name, identifier) in [("Jo", "BEAC01"), ("Ana Ruiz", "BEAC02")] {
            db.insert_employee(&NewEmployee {
                name: name.to_string(),
                identifier: identifier.to_string(),
                active: true,
                role: None,
                department: None,
                external_id: None,
            })
            .unwrap();
        }
        for (identifier, at, status) in [
            ("BEAC01", "2025-01-06T09:00:00Z", Status::Checkin),
            ("BEAC01", "2025-01-06T12:00:00Z", Status::Checkout),
            ("BEAC01", "2025-01-06T13:10:00Z", Status::Checkin),
            ("BEAC01", "2025-01-06T17:30:00Z", Status::Checkout),
            ("BEAC02", "2025-01-06T08:45:00Z", Status::Checkin),
            ("BEAC01", "2025-01-07T09:00:00Z", Status::Checkin),
            ("BEAC01", "2025-01-07T12:00:00Z", Status::Checkout),
        ] {
            let clock = FixedClock::parse(at).unwrap();
            ingest::record(&mut db, &clock, &RecorderPolicy::default(), identifier, Some(status))
                .unwrap();
        }
        db
    }

    fn now(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    #[test]
    fn table_shows_pending_today_and_closed_past_days() {
        let db = seeded();
        let mut output = Vec::new();
        run(
            &mut output,
            &db,
            &AttendanceQuery::default(),
            now("2025-01-07T15:00:00Z"),
            &SummaryPolicy::default(),
            false,
        )
        .unwrap();
        insta::assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        DATE        EMPLOYEE  FIRST IN  LAST OUT   BREAK  WORKED
        2025-01-06  Jo        09:00:00  17:30:00  1h 10m  7h 20m
        2025-01-07  Jo        09:00:00  pending   0h 00m  3h 00m
        2025-01-06  Ana Ruiz  08:45:00  -         0h 00m  0h 00m
        ");
    }

    #[test]
    fn rows_carry_employee_names() {
        let db = seeded();
        let records = db.list_attendance(&AttendanceQuery::default()).unwrap();
        let rows = summarize_records(&records, now("2025-01-10T00:00:00Z"), &SummaryPolicy::default());
        let names: Vec<_> = rows.iter().map(|r| r.employee_name.as_str()).collect();
        assert_eq!(names, vec!["Jo", "Jo", "Ana Ruiz"]);

        let json = serde_json::to_value(&rows[1]).unwrap();
        assert_eq!(json["last_checkout"], "12:00:00");
        assert_eq!(json["worked_seconds"], 3 * 3600);
    }

    #[test]
    fn format_hours_pads_minutes() {
        assert_eq!(format_hours(0), "0h 00m");
        assert_eq!(format_hours(7 * 3600 + 5 * 60 + 59), "7h 05m");
        assert_eq!(format_hours(-30), "0h 00m");
    }
}
