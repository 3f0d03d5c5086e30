//! Storage layer for beacon attendance.
//!
//! Provides persistence for employees and attendance records using `rusqlite`,
//! and implements the [`EmployeeDirectory`] and [`EventStore`] seams from
//! `att-core`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. The HTTP server keeps it
//! behind a `Mutex`.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! `recorded_at` is stored as TEXT in RFC 3339 UTC with millisecond precision
//! (e.g., `2025-01-06T09:03:27.000Z`). The fixed width keeps lexicographic
//! ordering equal to chronological ordering, which the dedup window relies on.
//!
//! ## Calendar Columns
//!
//! `date`, `time`, `day_of_week`, `month` and `year` hold the recorder's local
//! breakdown of `recorded_at`. Rows written by older versions may lack them;
//! reads fall back to the UTC date of `recorded_at`.
//!
//! ## Malformed Rows
//!
//! Listing queries skip rows that fail to parse and log a warning instead of
//! failing the whole query.

use std::path::Path;

use att_core::{
    AttendanceEvent, AttendanceQuery, AttendanceRecord, Employee, EmployeeDirectory, EmployeeId,
    EventId, EventStore, NewAttendanceEvent, Status, UnknownStatus,
};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::Serialize;
use thiserror::Error;

/// Date expression used for bucketing and date filters.
const RECORD_DATE: &str = "COALESCE(ar.date, substr(ar.recorded_at, 1, 10))";

const RECORD_COLUMNS: &str = "
    ar.id, ar.employee_id, ar.status, ar.recorded_at, ar.identifier,
    ar.date, ar.time, ar.day_of_week, ar.month, ar.year, ar.company_code,
    e.name, e.role, e.department, e.external_id
";

const EMPLOYEE_COLUMNS: &str = "id, name, identifier, is_active, role, department, external_id";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for attendance record {record_id}: {timestamp}")]
    TimestampParse {
        record_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored column could not be interpreted.
    #[error("invalid attendance record {record_id}: {message}")]
    InvalidRecord { record_id: i64, message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// An employee ready to be stored. The identifier must already be provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployee {
    pub name: String,
    pub identifier: String,
    pub active: bool,
    pub role: Option<String>,
    pub department: Option<String>,
    pub external_id: Option<String>,
}

/// Attendance counters for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    pub date: NaiveDate,
    pub today_checkins: u64,
    /// Employees with a checkin on `date` that no later checkout on `date` closed.
    pub currently_present: u64,
    pub total_employees: u64,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS employees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                identifier TEXT NOT NULL UNIQUE,
                is_active INTEGER NOT NULL DEFAULT 1,
                role TEXT,
                department TEXT,
                external_id TEXT,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_employees_name ON employees(name COLLATE NOCASE);

            -- Attendance records: one row per accepted detection
            -- recorded_at: RFC 3339 UTC with milliseconds
            -- date/time/day_of_week/month/year: recorder-local breakdown
            CREATE TABLE IF NOT EXISTS attendance_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                employee_id INTEGER NOT NULL,
                company_code TEXT NOT NULL,
                identifier TEXT NOT NULL,
                status TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                day_of_week TEXT,
                date TEXT,
                time TEXT,
                month TEXT,
                year INTEGER,
                FOREIGN KEY (employee_id) REFERENCES employees(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_attendance_dedup
                ON attendance_records(employee_id, status, recorded_at);
            CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance_records(date);
            CREATE INDEX IF NOT EXISTS idx_attendance_recorded ON attendance_records(recorded_at);
            ",
        )?;
        Ok(())
    }

    /// Inserts an employee and returns it with its assigned id.
    pub fn insert_employee(&mut self, employee: &NewEmployee) -> Result<Employee, DbError> {
        self.conn.execute(
            "
            INSERT INTO employees (name, identifier, is_active, role, department, external_id)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![
                employee.name,
                employee.identifier,
                employee.active,
                employee.role,
                employee.department,
                employee.external_id,
            ],
        )?;
        Ok(Employee {
            id: EmployeeId(self.conn.last_insert_rowid()),
            name: employee.name.clone(),
            identifier: employee.identifier.clone(),
            active: employee.active,
            role: employee.role.clone(),
            department: employee.department.clone(),
            external_id: employee.external_id.clone(),
        })
    }

    /// Returns `true` if any employee, active or not, holds `identifier`.
    pub fn identifier_exists(&self, identifier: &str) -> Result<bool, DbError> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE identifier = ?)",
            [identifier],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Lists all employees ordered by name then ID.
    pub fn list_employees(&self) -> Result<Vec<Employee>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY name COLLATE NOCASE ASC, id ASC"
        ))?;
        let rows = stmt.query_map([], employee_from_row)?;
        let mut employees = Vec::new();
        for row in rows {
            employees.push(row?);
        }
        Ok(employees)
    }

    /// Lists attendance records matching `query`, most recent first.
    pub fn list_attendance(&self, query: &AttendanceQuery) -> Result<Vec<AttendanceRecord>, DbError> {
        let mut sql = format!(
            "
            SELECT {RECORD_COLUMNS}
            FROM attendance_records ar
            JOIN employees e ON ar.employee_id = e.id
            WHERE 1=1
            "
        );
        let mut values: Vec<Value> = Vec::new();

        if let Some(date) = query.date {
            sql.push_str(&format!(" AND {RECORD_DATE} = ?"));
            values.push(Value::Text(date.to_string()));
        }
        if let Some(month) = query.month {
            sql.push_str(&format!(" AND {RECORD_DATE} LIKE ?"));
            values.push(Value::Text(format!("{month}-%")));
        }
        if let Some(employee_id) = query.employee_id {
            sql.push_str(" AND ar.employee_id = ?");
            values.push(Value::Integer(employee_id.get()));
        }
        if let Some(status) = query.status {
            sql.push_str(" AND ar.status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(department) = &query.department {
            sql.push_str(" AND e.department = ?");
            values.push(Value::Text(department.clone()));
        }
        if let Some(role) = &query.role {
            sql.push_str(" AND e.role = ?");
            values.push(Value::Text(role.clone()));
        }

        // SQLite treats a negative limit as unbounded.
        sql.push_str(" ORDER BY ar.recorded_at DESC, ar.id DESC LIMIT ?");
        values.push(Value::Integer(query.limit.map_or(-1, i64::from)));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), RawRecord::from_row)?;
        let mut records = Vec::new();
        for row in rows {
            let raw = row?;
            match raw.into_record() {
                Ok(record) => records.push(record),
                Err(error) => {
                    tracing::warn!(%error, "skipping malformed attendance record");
                }
            }
        }
        Ok(records)
    }

    /// Lists one employee's attendance records, most recent first.
    pub fn list_employee_attendance(
        &self,
        employee_id: EmployeeId,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, DbError> {
        self.list_attendance(&AttendanceQuery {
            employee_id: Some(employee_id),
            limit: Some(limit),
            ..AttendanceQuery::default()
        })
    }

    /// Computes attendance counters for `date`.
    pub fn attendance_stats(&self, date: NaiveDate) -> Result<AttendanceStats, DbError> {
        let day = date.to_string();
        let today_checkins: i64 = self.conn.query_row(
            &format!(
                "
                SELECT COUNT(*)
                FROM attendance_records ar
                WHERE {RECORD_DATE} = ?1 AND ar.status = 'checkin'
                "
            ),
            [&day],
            |row| row.get(0),
        )?;
        let currently_present: i64 = self.conn.query_row(
            &format!(
                "
                SELECT COUNT(DISTINCT ar.employee_id)
                FROM attendance_records ar
                WHERE {RECORD_DATE} = ?1
                  AND ar.status = 'checkin'
                  AND NOT EXISTS (
                      SELECT 1 FROM attendance_records later
                      WHERE later.employee_id = ar.employee_id
                        AND COALESCE(later.date, substr(later.recorded_at, 1, 10)) = ?1
                        AND later.status = 'checkout'
                        AND later.recorded_at > ar.recorded_at
                  )
                "
            ),
            [&day],
            |row| row.get(0),
        )?;
        let total_employees: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM employees WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;

        Ok(AttendanceStats {
            date,
            today_checkins: today_checkins.unsigned_abs(),
            currently_present: currently_present.unsigned_abs(),
            total_employees: total_employees.unsigned_abs(),
        })
    }
}

impl EmployeeDirectory for Database {
    type Error = DbError;

    fn find_active_by_identifier(&self, identifier: &str) -> Result<Option<Employee>, DbError> {
        let employee = self
            .conn
            .query_row(
                &format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees
                     WHERE identifier = ? AND is_active = 1
                     LIMIT 1"
                ),
                [identifier],
                employee_from_row,
            )
            .optional()?;
        Ok(employee)
    }

    /// Case folding follows SQLite's `LOWER`, which only folds ASCII.
    fn find_active_by_name(&self, name: &str) -> Result<Option<Employee>, DbError> {
        let employee = self
            .conn
            .query_row(
                &format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees
                     WHERE LOWER(name) = LOWER(?) AND is_active = 1
                     ORDER BY id ASC
                     LIMIT 1"
                ),
                [name],
                employee_from_row,
            )
            .optional()?;
        Ok(employee)
    }
}

impl EventStore for Database {
    type Error = DbError;

    fn find_recent_event(
        &self,
        employee_id: EmployeeId,
        status: Status,
        since: DateTime<Utc>,
    ) -> Result<Option<EventId>, DbError> {
        let id = self
            .conn
            .query_row(
                "
                SELECT id FROM attendance_records
                WHERE employee_id = ? AND status = ? AND recorded_at >= ?
                ORDER BY recorded_at DESC, id DESC
                LIMIT 1
                ",
                params![employee_id.get(), status.as_str(), format_timestamp(since)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(EventId))
    }

    fn insert_event(&mut self, event: &NewAttendanceEvent) -> Result<EventId, DbError> {
        let calendar = &event.calendar;
        self.conn.execute(
            "
            INSERT INTO attendance_records
            (employee_id, company_code, identifier, status, recorded_at,
             day_of_week, date, time, month, year)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                event.employee_id.get(),
                event.company_code.as_str(),
                event.identifier.as_str(),
                event.status.as_str(),
                format_timestamp(event.recorded_at),
                calendar.weekday,
                calendar.date.to_string(),
                format_time(calendar.time),
                calendar.month,
                calendar.year,
            ],
        )?;
        Ok(EventId(self.conn.last_insert_rowid()))
    }

    /// Checks the window and inserts in a single statement, so concurrent
    /// writers on the same database cannot both pass the check.
    fn insert_unless_recent(
        &mut self,
        event: &NewAttendanceEvent,
        since: DateTime<Utc>,
    ) -> Result<Option<EventId>, DbError> {
        let calendar = &event.calendar;
        let inserted = self.conn.execute(
            "
            INSERT INTO attendance_records
            (employee_id, company_code, identifier, status, recorded_at,
             day_of_week, date, time, month, year)
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10
            WHERE NOT EXISTS (
                SELECT 1 FROM attendance_records
                WHERE employee_id = ?1 AND status = ?4 AND recorded_at >= ?11
            )
            ",
            params![
                event.employee_id.get(),
                event.company_code.as_str(),
                event.identifier.as_str(),
                event.status.as_str(),
                format_timestamp(event.recorded_at),
                calendar.weekday,
                calendar.date.to_string(),
                format_time(calendar.time),
                calendar.month,
                calendar.year,
                format_timestamp(since),
            ],
        )?;
        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(EventId(self.conn.last_insert_rowid())))
    }
}

fn employee_from_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: EmployeeId(row.get(0)?),
        name: row.get(1)?,
        identifier: row.get(2)?,
        active: row.get(3)?,
        role: row.get(4)?,
        department: row.get(5)?,
        external_id: row.get(6)?,
    })
}

/// Attendance row as stored, before parsing.
#[derive(Debug)]
struct RawRecord {
    id: i64,
    employee_id: i64,
    status: String,
    recorded_at: String,
    identifier: String,
    date: Option<String>,
    time: Option<String>,
    weekday: Option<String>,
    month: Option<String>,
    year: Option<i32>,
    company_code: String,
    employee_name: String,
    employee_role: Option<String>,
    employee_department: Option<String>,
    employee_external_id: Option<String>,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            employee_id: row.get(1)?,
            status: row.get(2)?,
            recorded_at: row.get(3)?,
            identifier: row.get(4)?,
            date: row.get(5)?,
            time: row.get(6)?,
            weekday: row.get(7)?,
            month: row.get(8)?,
            year: row.get(9)?,
            company_code: row.get(10)?,
            employee_name: row.get(11)?,
            employee_role: row.get(12)?,
            employee_department: row.get(13)?,
            employee_external_id: row.get(14)?,
        })
    }

    fn into_record(self) -> Result<AttendanceRecord, DbError> {
        let record_id = self.id;
        let invalid = |message: String| DbError::InvalidRecord { record_id, message };

        let status: Status = self
            .status
            .parse()
            .map_err(|err: UnknownStatus| invalid(err.to_string()))?;
        let recorded_at = parse_timestamp(&self.recorded_at, record_id)?;
        let date = self
            .date
            .as_deref()
            .map(|value| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|_| invalid(format!("invalid date '{value}'")))
            })
            .transpose()?;
        let time = self
            .time
            .as_deref()
            .map(|value| {
                NaiveTime::parse_from_str(value, "%H:%M:%S")
                    .map_err(|_| invalid(format!("invalid time '{value}'")))
            })
            .transpose()?;

        Ok(AttendanceRecord {
            event: AttendanceEvent {
                id: EventId(record_id),
                employee_id: EmployeeId(self.employee_id),
                status,
                recorded_at,
                identifier: self.identifier,
                date,
                time,
                weekday: self.weekday,
                month: self.month,
                year: self.year,
            },
            company_code: self.company_code,
            employee_name: self.employee_name,
            employee_role: self.employee_role,
            employee_department: self.employee_department,
            employee_external_id: self.employee_external_id,
        })
    }
}

fn parse_timestamp(timestamp: &str, record_id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            record_id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}
