//! Source of the current instant.
//!
//! Dedup windows, "today" detection and the pending-day rule all read the
//! clock, so every entry point takes it as an explicit dependency.

use chrono::{DateTime, FixedOffset, Local};

/// Supplies the current local instant.
pub trait Clock: Send + Sync {
    /// Returns the current instant in the local offset used for calendar fields.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<FixedOffset>);

impl FixedClock {
    pub const fn new(instant: DateTime<FixedOffset>) -> Self {
        Self(instant)
    }

    /// Parses an RFC 3339 instant.
    pub fn parse(rfc3339: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(rfc3339).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
