//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::Status;

/// Validation errors for core types and caller-supplied filters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A date filter was not in `YYYY-MM-DD` form.
    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },

    /// A month filter was not in `YYYY-MM` form.
    #[error("invalid month '{value}', expected YYYY-MM")]
    InvalidMonth { value: String },

    /// Export was requested without a date or month filter.
    #[error("provide either a date (YYYY-MM-DD) or a month (YYYY-MM) filter")]
    MissingExportFilter,

    /// An explicitly requested identifier is already assigned.
    #[error("identifier '{identifier}' is already assigned to another employee")]
    IdentifierTaken { identifier: String },

    /// No unique identifier could be derived from the employee name.
    #[error("unable to derive a unique identifier for '{name}'")]
    NoUniqueIdentifier { name: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new value after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Generates a row-id newtype over `i64`.
macro_rules! define_row_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Returns the raw row id.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

define_string_id!(
    /// A device-advertised identifier.
    ///
    /// Beacons advertise either the employee's provisioned identifier or the
    /// byte-pair hex encoding of the employee's display name.
    Identifier, "identifier"
);

define_string_id!(
    /// Company code stamped onto every recorded event.
    CompanyCode, "company code"
);

/// Company code used when none is configured.
pub const DEFAULT_COMPANY_CODE: &str = "D7E1A3F4";

impl Default for CompanyCode {
    fn default() -> Self {
        Self(DEFAULT_COMPANY_CODE.to_string())
    }
}

define_row_id!(
    /// Storage id of an employee.
    EmployeeId
);

define_row_id!(
    /// Storage id of a recorded attendance event.
    EventId
);

/// An employee as exposed by the employee-management collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub identifier: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Badge number or HR system id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// Calendar breakdown of a recording instant, in the recorder's local offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFields {
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// English weekday name, e.g. `Monday`.
    pub weekday: String,
    /// English month name, e.g. `January`.
    pub month: String,
    pub year: i32,
}

impl CalendarFields {
    /// Derives the breakdown from a local instant.
    pub fn from_instant(instant: DateTime<FixedOffset>) -> Self {
        let local = instant.naive_local();
        Self {
            date: local.date(),
            // Whole seconds only, matching the stored `HH:MM:SS` form.
            time: NaiveTime::from_num_seconds_from_midnight_opt(
                local.time().num_seconds_from_midnight(),
                0,
            )
            .unwrap_or_else(|| local.time()),
            weekday: local.format("%A").to_string(),
            month: local.format("%B").to_string(),
            year: local.year(),
        }
    }
}

/// A recorded attendance event.
///
/// The calendar fields are optional because older rows may lack them; analytics
/// fall back to the UTC components of `recorded_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: EventId,
    pub employee_id: EmployeeId,
    pub status: Status,
    pub recorded_at: DateTime<Utc>,
    /// The identifier the device advertised when this event was recorded.
    pub identifier: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub weekday: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl AttendanceEvent {
    /// Calendar date used for bucketing.
    pub fn bucket_date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| self.recorded_at.date_naive())
    }

    /// Time of day used for display.
    pub fn time_of_day(&self) -> NaiveTime {
        self.time.unwrap_or_else(|| self.recorded_at.time())
    }
}

impl AsRef<Self> for AttendanceEvent {
    fn as_ref(&self) -> &Self {
        self
    }
}

/// An attendance event joined with the employee's display attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(flatten)]
    pub event: AttendanceEvent,
    pub company_code: String,
    pub employee_name: String,
    #[serde(default)]
    pub employee_role: Option<String>,
    #[serde(default)]
    pub employee_department: Option<String>,
    #[serde(default)]
    pub employee_external_id: Option<String>,
}

impl AsRef<AttendanceEvent> for AttendanceRecord {
    fn as_ref(&self) -> &AttendanceEvent {
        &self.event
    }
}

/// A new event ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendanceEvent {
    pub employee_id: EmployeeId,
    pub status: Status,
    pub identifier: Identifier,
    pub company_code: CompanyCode,
    pub recorded_at: DateTime<Utc>,
    pub calendar: CalendarFields,
}

/// A calendar month filter in `YYYY-MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Returns `true` if `date` falls within this month.
    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidMonth {
            value: s.to_string(),
        };
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }
}

/// Parses a `YYYY-MM-DD` date filter.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        value: value.to_string(),
    })
}

/// Filters for listing attendance records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceQuery {
    pub date: Option<NaiveDate>,
    pub month: Option<YearMonth>,
    pub employee_id: Option<EmployeeId>,
    pub status: Option<Status>,
    pub department: Option<String>,
    pub role: Option<String>,
    /// Maximum number of rows; `None` returns every match.
    pub limit: Option<u32>,
}

impl AttendanceQuery {
    /// Returns `true` if `record` satisfies every filter except `limit`.
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        let date = record.event.bucket_date();
        self.date.is_none_or(|d| d == date)
            && self.month.is_none_or(|m| m.contains(date))
            && self.employee_id.is_none_or(|id| id == record.event.employee_id)
            && self.status.is_none_or(|s| s == record.event.status)
            && self
                .department
                .as_deref()
                .is_none_or(|d| record.employee_department.as_deref() == Some(d))
            && self
                .role
                .as_deref()
                .is_none_or(|r| record.employee_role.as_deref() == Some(r))
    }
}
