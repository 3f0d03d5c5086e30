//! Flat CSV rendering of annotated attendance records.

use std::io;

use chrono::NaiveDate;

use crate::breaks::{BreakPolicy, annotate_all};
use crate::bucket::bucketize;
use crate::error::AttendanceResult;
use crate::status::Status;
use crate::types::{AttendanceQuery, AttendanceRecord, EmployeeId, ValidationError, YearMonth};

/// Column headers, in output order.
pub const EXPORT_HEADERS: [&str; 10] = [
    "Date",
    "Time",
    "Employee",
    "Status",
    "Break Type",
    "Break Duration",
    "First Of Day",
    "Last Of Day",
    "Device Identifier",
    "Employee ID",
];

/// Filters accepted by an export. A date or a month is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportFilter {
    pub date: Option<NaiveDate>,
    pub month: Option<YearMonth>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub status: Option<Status>,
    pub employee_id: Option<EmployeeId>,
}

impl ExportFilter {
    pub const fn validate(&self) -> Result<(), ValidationError> {
        if self.date.is_none() && self.month.is_none() {
            return Err(ValidationError::MissingExportFilter);
        }
        Ok(())
    }

    /// `attendance-<date>.csv`, or `attendance-<month>.csv` without a date.
    pub fn filename(&self) -> String {
        let base = match (self.date, self.month) {
            (Some(date), _) => date.to_string(),
            (None, Some(month)) => month.to_string(),
            (None, None) => "attendance".to_string(),
        };
        format!("attendance-{base}.csv")
    }

    /// The equivalent unlimited record query.
    pub fn to_query(&self) -> AttendanceQuery {
        AttendanceQuery {
            date: self.date,
            month: self.month,
            employee_id: self.employee_id,
            status: self.status,
            department: self.department.clone(),
            role: self.role.clone(),
            limit: None,
        }
    }
}

/// Renders the matching records as CSV, one row per event.
///
/// Records outside the filter are dropped before annotation, so breaks and
/// day boundaries reflect only the exported rows. Rows are ordered by date,
/// time, then event id. The header row is bare; every data field is quoted.
pub fn render_csv(
    filter: &ExportFilter,
    records: &[AttendanceRecord],
    policy: &BreakPolicy,
) -> AttendanceResult<String> {
    filter.validate()?;

    let query = filter.to_query();
    let mut rows: Vec<AttendanceRecord> = records
        .iter()
        .filter(|record| query.matches(record))
        .cloned()
        .collect();
    rows.sort_by(|a, b| {
        let (a, b) = (&a.event, &b.event);
        (a.bucket_date(), a.time_of_day(), a.id).cmp(&(b.bucket_date(), b.time_of_day(), b.id))
    });

    let annotations = annotate_all(&bucketize(&rows), policy);

    let mut header = EXPORT_HEADERS.join(",").into_bytes();
    header.push(b'\n');
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(header);

    for record in &rows {
        let event = &record.event;
        let annotation = annotations.get(&event.id).cloned().unwrap_or_default();
        writer.write_record([
            event.bucket_date().to_string(),
            event.time_of_day().format("%H:%M:%S").to_string(),
            record.employee_name.clone(),
            event.status.to_string(),
            annotation.break_label().unwrap_or_default().to_string(),
            annotation.break_duration().unwrap_or_default(),
            flag(annotation.first_of_day).to_string(),
            flag(annotation.last_of_day).to_string(),
            event.identifier.clone(),
            record.employee_external_id.clone().unwrap_or_default(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    let text = String::from_utf8(bytes)
        .map_err(|err| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, err)))?;
    Ok(text)
}

const fn flag(set: bool) -> &'static str {
    if set { "yes" } else { "" }
}
