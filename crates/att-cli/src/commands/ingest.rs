//! Ingest command for recording beacon detections.

use std::io::Write;

use anyhow::Result;
use att_core::{
    AttendanceError, Clock, Identifier, RecordOutcome, RecordedAttendance, RecorderPolicy, Status,
    ingest_detection,
};
use att_db::Database;
use serde::Serialize;

/// JSON body returned for an ingestion, over HTTP and with `--json`.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub deduped: bool,
    #[serde(flatten)]
    pub attendance: Option<RecordedAttendance>,
}

impl From<RecordOutcome> for IngestResponse {
    fn from(outcome: RecordOutcome) -> Self {
        match outcome {
            RecordOutcome::Deduped => Self {
                success: true,
                deduped: true,
                attendance: None,
            },
            RecordOutcome::Recorded(attendance) => Self {
                success: true,
                deduped: false,
                attendance: Some(attendance),
            },
        }
    }
}

/// Resolves and records one detection.
pub fn record(
    db: &mut Database,
    clock: &dyn Clock,
    policy: &RecorderPolicy,
    identifier: &str,
    action: Option<Status>,
) -> Result<RecordOutcome, AttendanceError> {
    let identifier = Identifier::new(identifier)?;
    ingest_detection(db, clock, policy, &identifier, action)
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    clock: &dyn Clock,
    policy: &RecorderPolicy,
    identifier: &str,
    action: Option<Status>,
    json: bool,
) -> Result<()> {
    let outcome = record(db, clock, policy, identifier, action)?;

    if json {
        let response = IngestResponse::from(outcome);
        writeln!(writer, "{}", serde_json::to_string_pretty(&response)?)?;
        return Ok(());
    }

    match outcome {
        RecordOutcome::Deduped => {
            let status = action.unwrap_or_default();
            writeln!(
                writer,
                "Duplicate {status} within the dedup window; nothing recorded."
            )?;
        }
        RecordOutcome::Recorded(recorded) => {
            let details = &recorded.timestamp_details;
            writeln!(
                writer,
                "Recorded {} for {} (#{}) at {} {} ({})",
                recorded.status,
                recorded.employee_name,
                recorded.employee_id,
                details.date,
                details.time.format("%H:%M:%S"),
                details.weekday,
            )?;
        }
    }
    Ok(())
}
