//! Events command for listing attendance records.

use std::io::Write;

use anyhow::Result;
use att_core::{
    Annotation, AttendanceQuery, AttendanceRecord, BreakPolicy, annotate_all, bucketize,
};
use att_db::Database;
use serde::Serialize;

/// Display form of an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationView {
    pub break_label: Option<&'static str>,
    pub break_duration: Option<String>,
    pub break_seconds: Option<i64>,
    pub first_of_day: bool,
    pub last_of_day: bool,
    pub label: Option<String>,
}

impl From<&Annotation> for AnnotationView {
    fn from(annotation: &Annotation) -> Self {
        Self {
            break_label: annotation.break_label(),
            break_duration: annotation.break_duration(),
            break_seconds: annotation.break_info.map(|info| info.seconds),
            first_of_day: annotation.first_of_day,
            last_of_day: annotation.last_of_day,
            label: annotation.label(),
        }
    }
}

/// An attendance record, optionally with its annotation.
#[derive(Debug, Clone, Serialize)]
pub struct EventRow {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<AnnotationView>,
}

/// Pairs records with annotations, keeping the input order.
///
/// Annotations are computed over the given records only, so a limited listing
/// may miss breaks whose checkout fell outside the limit.
pub fn annotate_records(records: Vec<AttendanceRecord>, policy: &BreakPolicy) -> Vec<EventRow> {
    let annotations = annotate_all(&bucketize(&records), policy);
    records
        .into_iter()
        .map(|record| {
            let annotation = annotations
                .get(&record.event.id)
                .map(AnnotationView::from);
            EventRow { record, annotation }
        })
        .collect()
}

/// Wraps records as rows, annotated when `annotate` is set.
pub fn event_rows(
    records: Vec<AttendanceRecord>,
    annotate: bool,
    policy: &BreakPolicy,
) -> Vec<EventRow> {
    if annotate {
        return annotate_records(records, policy);
    }
    records
        .into_iter()
        .map(|record| EventRow {
            record,
            annotation: None,
        })
        .collect()
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    query: &AttendanceQuery,
    annotate: bool,
    policy: &BreakPolicy,
    json: bool,
) -> Result<()> {
    let records = db.list_attendance(query)?;
    let rows = event_rows(records, annotate, policy);

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&rows)?)?;
        return Ok(());
    }

    if rows.is_empty() {
        writeln!(writer, "No attendance events.")?;
        return Ok(());
    }

    for row in &rows {
        let event = &row.record.event;
        let mut line = format!(
            "{} {}  {:<8}  {}",
            event.bucket_date(),
            event.time_of_day().format("%H:%M:%S"),
            event.status.as_str(),
            row.record.employee_name,
        );
        if let Some(label) = row.annotation.as_ref().and_then(|a| a.label.as_deref()) {
            line.push_str("  ");
            line.push_str(label);
        }
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use att_core::{FixedClock, RecorderPolicy, Status};
    use att_db::NewEmployee;

    use super::*;
    use crate::commands::ingest;

    fn seeded() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_employee(&NewEmployee {
            name: "Jo".to_string(),
            identifier: "BEAC01".to_string(),
            active: true,
            role: None,
            department: None,
            external_id: None,
        })
        .unwrap();
        for (at, status) in [
            ("2025-01-06T09:00:00Z", Status::Checkin),
            ("2025-01-06T12:00:00Z", Status::Checkout),
            ("2025-01-06T12:07:00Z", Status::Checkin),
            ("2025-01-06T17:00:00Z", Status::Checkout),
        ] {
            let clock = FixedClock::parse(at).unwrap();
            ingest::record(&mut db, &clock, &RecorderPolicy::default(), "BEAC01", Some(status))
                .unwrap();
        }
        db
    }

    fn render(db: &Database, annotate: bool) -> String {
        let mut output = Vec::new();
        run(
            &mut output,
            db,
            &AttendanceQuery::default(),
            annotate,
            &BreakPolicy::default(),
            false,
        )
        .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn annotated_listing_is_most_recent_first() {
        let db = seeded();
        insta::assert_snapshot!(render(&db, true), @r"
        2025-01-06 17:00:00  checkout  Jo  Last of day
        2025-01-06 12:07:00  checkin   Jo  Break (7m)
        2025-01-06 12:00:00  checkout  Jo
        2025-01-06 09:00:00  checkin   Jo  First of day
        ");
    }

    #[test]
    fn plain_listing_has_no_labels() {
        let db = seeded();
        assert!(!render(&db, false).contains("First of day"));
    }

    #[test]
    fn empty_listing_says_so() {
        let db = Database::open_in_memory().unwrap();
        insta::assert_snapshot!(render(&db, false), @"No attendance events.");
    }

    #[test]
    fn json_rows_flatten_record_and_annotation() {
        let db = seeded();
        let records = db.list_attendance(&AttendanceQuery::default()).unwrap();
        let rows = annotate_records(records, &BreakPolicy::default());
        let value = serde_json::to_value(&rows).unwrap();
        assert_eq!(value[1]["employee_name"], "Jo");
        assert_eq!(value[1]["annotation"]["break_label"], "Break");
        assert_eq!(value[1]["annotation"]["break_duration"], "7m");
        assert!(value[2].get("annotation").is_none());
    }
}
