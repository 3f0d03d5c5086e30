//! Per-bucket daily summaries.
//!
//! Summaries are derived on every read and never stored. The caller passes a
//! single `now` snapshot so that every bucket in one query agrees on what
//! "today" is.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use rayon::prelude::*;
use serde::{Serialize, Serializer};

use crate::breaks::walk;
use crate::bucket::{Bucket, BucketKey};
use crate::status::Status;
use crate::types::{AttendanceEvent, EmployeeId};

/// Local wall-clock time after which today's last checkout is shown as final.
pub const DEFAULT_DAY_CLOSE: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 0) {
    Some(time) => time,
    None => unreachable!(),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryPolicy {
    pub day_close: NaiveTime,
}

impl Default for SummaryPolicy {
    fn default() -> Self {
        Self {
            day_close: DEFAULT_DAY_CLOSE,
        }
    }
}

/// Last checkout of a bucket as it should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastCheckout {
    /// Today's bucket before day close; a later checkout may still arrive.
    Pending,
    At(NaiveTime),
}

impl fmt::Display for LastCheckout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::At(time) => write!(f, "{}", time.format("%H:%M:%S")),
        }
    }
}

impl Serialize for LastCheckout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub first_checkin: Option<NaiveTime>,
    pub last_checkout: Option<LastCheckout>,
    pub break_seconds: i64,
    pub worked_seconds: i64,
}

impl DailySummary {
    pub const fn key(&self) -> BucketKey {
        BucketKey {
            employee_id: self.employee_id,
            date: self.date,
        }
    }
}

/// Summarizes one bucket as of `now`.
///
/// Worked time runs from the first checkin to the effective end, less breaks.
/// On today's bucket the effective end is `now`; a checkout not yet followed by
/// a checkin counts as a break in progress. On any other date the effective end
/// is the last checkout, and a day without one has no worked time.
pub fn summarize_bucket<E: AsRef<AttendanceEvent>>(
    bucket: &Bucket<'_, E>,
    now: DateTime<FixedOffset>,
    policy: &SummaryPolicy,
) -> DailySummary {
    let walk = walk(bucket.iter());
    let first_checkin = bucket.iter().find(|e| e.status == Status::Checkin);
    let last_checkout = bucket.iter().rev().find(|e| e.status == Status::Checkout);

    let local_now = now.naive_local();
    let is_today = bucket.key.date == local_now.date();
    let now_utc = now.with_timezone(&Utc);
    let break_seconds = walk.total_break_seconds();

    let worked_seconds = first_checkin.map_or(0, |first| {
        let (end, in_progress) = if is_today {
            let open_break = walk
                .open_checkout_at
                .map_or(0, |checkout_at| (now_utc - checkout_at).num_seconds());
            (Some(now_utc), open_break)
        } else {
            (last_checkout.map(|e| e.recorded_at), 0)
        };
        end.map_or(0, |end| {
            let span = (end - first.recorded_at).num_seconds();
            (span - break_seconds - in_progress).max(0)
        })
    });

    let day_closed = !is_today || local_now >= bucket.key.date.and_time(policy.day_close);
    let last_checkout = last_checkout.map(|event| {
        if day_closed {
            LastCheckout::At(event.time_of_day())
        } else {
            LastCheckout::Pending
        }
    });

    DailySummary {
        employee_id: bucket.key.employee_id,
        date: bucket.key.date,
        first_checkin: first_checkin.map(AttendanceEvent::time_of_day),
        last_checkout,
        break_seconds,
        worked_seconds,
    }
}

/// Summarizes every bucket in parallel, preserving bucket order.
pub fn summarize_all<E>(
    buckets: &[Bucket<'_, E>],
    now: DateTime<FixedOffset>,
    policy: &SummaryPolicy,
) -> Vec<DailySummary>
where
    E: AsRef<AttendanceEvent> + Sync,
{
    buckets
        .par_iter()
        .map(|bucket| summarize_bucket(bucket, now, policy))
        .collect()
}
