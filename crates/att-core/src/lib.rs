//! Core domain logic for beacon attendance.
//!
//! This crate contains the fundamental types and logic for:
//! - Resolution: mapping a device identifier to an active employee
//! - Recording: persisting detections with a trailing dedup window
//! - Analytics: bucketing events per employee and day, classifying breaks,
//!   and deriving daily summaries and CSV exports
//!
//! Storage is reached through the [`EmployeeDirectory`] and [`EventStore`]
//! traits; everything downstream of the event log is pure.

pub mod breaks;
pub mod bucket;
pub mod clock;
pub mod codec;
mod error;
pub mod export;
mod recorder;
mod resolver;
pub mod status;
pub mod summary;
pub mod types;

pub use breaks::{Annotation, Annotations, BreakKind, BreakPolicy, annotate_all, annotate_bucket};
pub use bucket::{Bucket, BucketKey, bucketize};
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{DecodeError, decode_identifier, encode_identifier, provision_identifier};
pub use error::{AttendanceError, AttendanceResult, ErrorKind, StorageSource};
pub use export::{EXPORT_HEADERS, ExportFilter, render_csv};
pub use recorder::{
    EventStore, RecordOutcome, RecordedAttendance, RecorderPolicy, ingest_detection,
    record_attendance,
};
pub use resolver::{EmployeeDirectory, resolve_employee};
pub use status::{Status, UnknownStatus};
pub use summary::{DailySummary, LastCheckout, SummaryPolicy, summarize_all, summarize_bucket};
pub use types::{
    AttendanceEvent, AttendanceQuery, AttendanceRecord, CalendarFields, CompanyCode, Employee,
    EmployeeId, EventId, Identifier, NewAttendanceEvent, ValidationError, YearMonth, parse_date,
};
