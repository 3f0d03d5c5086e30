//! Command-line argument definitions.

use std::path::PathBuf;

use att_core::{
    AttendanceQuery, EmployeeId, ExportFilter, Status, ValidationError, YearMonth, parse_date,
};
use clap::{Args, Parser, Subcommand};

/// Beacon attendance tracker.
///
/// Records check-in and check-out detections from proximity beacons and
/// derives breaks, daily summaries and CSV exports from the event log.
#[derive(Debug, Parser)]
#[command(name = "att", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record a beacon detection.
    Ingest {
        /// Identifier advertised by the device.
        identifier: String,

        /// Attendance action (defaults to checkin).
        #[arg(long, value_parser = parse_status)]
        action: Option<Status>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List attendance events, most recent first.
    Events {
        #[command(flatten)]
        filters: RecordFilters,

        /// Maximum number of events (defaults to the configured query limit).
        #[arg(long)]
        limit: Option<u32>,

        /// Include break and first/last-of-day annotations.
        #[arg(long)]
        annotate: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show worked and break time per employee and day.
    Summary {
        #[command(flatten)]
        filters: RecordFilters,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export annotated events as CSV.
    Export {
        #[command(flatten)]
        filters: RecordFilters,

        /// Write to this file, or into this directory using the default name.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show today's attendance counters.
    Stats {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage employees.
    #[command(subcommand)]
    Employees(EmployeesAction),

    /// Serve the HTTP API.
    Serve {
        /// Address to bind (overrides the configured address).
        #[arg(long)]
        bind: Option<String>,
    },
}

/// Record filters shared by listing, summary and export.
#[derive(Debug, Clone, Default, Args)]
pub struct RecordFilters {
    /// Calendar date (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<String>,

    /// Calendar month (YYYY-MM).
    #[arg(long)]
    pub month: Option<String>,

    /// Employee id.
    #[arg(long)]
    pub employee: Option<i64>,

    /// Only checkin or checkout events.
    #[arg(long, value_parser = parse_status)]
    pub status: Option<Status>,

    /// Employee department.
    #[arg(long)]
    pub department: Option<String>,

    /// Employee role.
    #[arg(long)]
    pub role: Option<String>,
}

impl RecordFilters {
    /// Builds a record query, validating the date and month.
    pub fn to_query(&self, limit: Option<u32>) -> Result<AttendanceQuery, ValidationError> {
        Ok(AttendanceQuery {
            date: self.date.as_deref().map(parse_date).transpose()?,
            month: self
                .month
                .as_deref()
                .map(str::parse::<YearMonth>)
                .transpose()?,
            employee_id: self.employee.map(EmployeeId),
            status: self.status,
            department: self.department.clone(),
            role: self.role.clone(),
            limit,
        })
    }

    /// Builds an export filter; a date or month is required.
    pub fn to_export_filter(&self) -> Result<ExportFilter, ValidationError> {
        let query = self.to_query(None)?;
        let filter = ExportFilter {
            date: query.date,
            month: query.month,
            department: query.department,
            role: query.role,
            status: query.status,
            employee_id: query.employee_id,
        };
        filter.validate()?;
        Ok(filter)
    }
}

/// Employee subcommands.
#[derive(Debug, Subcommand)]
pub enum EmployeesAction {
    /// Add an employee, deriving the identifier from the name if not given.
    Add {
        /// Display name.
        name: String,

        /// Explicit device identifier.
        #[arg(long)]
        identifier: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        department: Option<String>,

        /// Badge number or HR system id.
        #[arg(long)]
        external_id: Option<String>,

        /// Store the employee as inactive.
        #[arg(long)]
        inactive: bool,
    },

    /// List employees.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn parse_status(value: &str) -> Result<Status, String> {
    value.parse().map_err(|err: att_core::UnknownStatus| err.to_string())
}
