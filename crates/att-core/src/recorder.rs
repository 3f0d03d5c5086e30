//! Recording of attendance events with a trailing dedup window.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::error::{AttendanceError, AttendanceResult};
use crate::resolver::{EmployeeDirectory, resolve_employee};
use crate::status::Status;
use crate::types::{
    CalendarFields, CompanyCode, Employee, EmployeeId, EventId, Identifier, NewAttendanceEvent,
};

/// Write access to the attendance log.
pub trait EventStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the most recent event for `employee_id` with `status` recorded at
    /// or after `since`.
    fn find_recent_event(
        &self,
        employee_id: EmployeeId,
        status: Status,
        since: DateTime<Utc>,
    ) -> Result<Option<EventId>, Self::Error>;

    /// Persists a new event and returns its id.
    fn insert_event(&mut self, event: &NewAttendanceEvent) -> Result<EventId, Self::Error>;

    /// Persists `event` unless a same-employee, same-status event was recorded
    /// at or after `since`. Returns `None` when suppressed.
    ///
    /// The default implementation checks and then inserts; two concurrent
    /// callers can both pass the check. Stores that can express a conditional
    /// insert should override it.
    fn insert_unless_recent(
        &mut self,
        event: &NewAttendanceEvent,
        since: DateTime<Utc>,
    ) -> Result<Option<EventId>, Self::Error> {
        if self
            .find_recent_event(event.employee_id, event.status, since)?
            .is_some()
        {
            return Ok(None);
        }
        self.insert_event(event).map(Some)
    }
}

/// Tunables for recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderPolicy {
    /// Same-status repeats inside this trailing window are suppressed.
    pub dedup_window: Duration,
    pub company_code: CompanyCode,
}

impl Default for RecorderPolicy {
    fn default() -> Self {
        Self {
            dedup_window: Duration::seconds(60),
            company_code: CompanyCode::default(),
        }
    }
}

/// Employee display attributes plus the stored timestamp breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedAttendance {
    pub event_id: EventId,
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub employee_role: Option<String>,
    pub employee_department: Option<String>,
    pub employee_external_id: Option<String>,
    pub status: Status,
    pub recorded_at: DateTime<Utc>,
    pub timestamp_details: CalendarFields,
}

/// Result of a recording attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A same-status event already exists inside the dedup window.
    Deduped,
    Recorded(RecordedAttendance),
}

impl RecordOutcome {
    pub const fn is_deduped(&self) -> bool {
        matches!(self, Self::Deduped)
    }
}

/// Records a detection for an already-resolved employee.
///
/// `status` defaults to [`Status::Checkin`]. Calendar fields are derived from
/// the clock, never from anything the device reported.
pub fn record_attendance<S>(
    store: &mut S,
    clock: &dyn Clock,
    policy: &RecorderPolicy,
    employee: &Employee,
    identifier: &Identifier,
    status: Option<Status>,
) -> AttendanceResult<RecordOutcome>
where
    S: EventStore + ?Sized,
{
    let status = status.unwrap_or_default();
    let now = clock.now();
    let recorded_at = now.with_timezone(&Utc);
    let calendar = CalendarFields::from_instant(now);

    let event = NewAttendanceEvent {
        employee_id: employee.id,
        status,
        identifier: identifier.clone(),
        company_code: policy.company_code.clone(),
        recorded_at,
        calendar: calendar.clone(),
    };

    let since = recorded_at - policy.dedup_window;
    let Some(event_id) = store
        .insert_unless_recent(&event, since)
        .map_err(AttendanceError::storage)?
    else {
        tracing::debug!(employee_id = %employee.id, %status, "detection deduped");
        return Ok(RecordOutcome::Deduped);
    };

    tracing::info!(
        employee_id = %employee.id,
        employee = %employee.name,
        %status,
        recorded_at = %recorded_at,
        "attendance recorded"
    );

    Ok(RecordOutcome::Recorded(RecordedAttendance {
        event_id,
        employee_id: employee.id,
        employee_name: employee.name.clone(),
        employee_role: employee.role.clone(),
        employee_department: employee.department.clone(),
        employee_external_id: employee.external_id.clone(),
        status,
        recorded_at,
        timestamp_details: calendar,
    }))
}

/// Resolves `identifier` and records the detection.
pub fn ingest_detection<S>(
    store: &mut S,
    clock: &dyn Clock,
    policy: &RecorderPolicy,
    identifier: &Identifier,
    status: Option<Status>,
) -> AttendanceResult<RecordOutcome>
where
    S: EmployeeDirectory + EventStore + ?Sized,
{
    let employee = resolve_employee(&*store, identifier)?;
    record_attendance(store, clock, policy, &employee, identifier, status)
}
