//! Grouping of events into per-employee, per-day buckets.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::{AttendanceEvent, EmployeeId};

/// Identity of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BucketKey {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
}

/// One employee's events on one calendar date, ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket<'a, E> {
    pub key: BucketKey,
    pub events: Vec<&'a E>,
}

impl<E: AsRef<AttendanceEvent>> Bucket<'_, E> {
    /// Iterates the underlying events in order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &AttendanceEvent> + '_ {
        self.events.iter().map(|e| event_of(*e))
    }

    /// The chronologically last event.
    pub fn last(&self) -> Option<&AttendanceEvent> {
        self.events.last().map(|e| event_of(*e))
    }
}

/// Groups events by `(employee, date)` and orders each group by timestamp.
///
/// Buckets come back ordered by key. Events sharing a timestamp keep id order,
/// so the result does not depend on input order.
pub fn bucketize<E: AsRef<AttendanceEvent>>(events: &[E]) -> Vec<Bucket<'_, E>> {
    let mut groups: BTreeMap<BucketKey, Vec<&E>> = BTreeMap::new();
    for event in events {
        let inner = event_of(event);
        let key = BucketKey {
            employee_id: inner.employee_id,
            date: inner.bucket_date(),
        };
        groups.entry(key).or_default().push(event);
    }

    groups
        .into_iter()
        .map(|(key, mut events)| {
            events.sort_by(|a, b| {
                let (a, b) = (event_of(*a), event_of(*b));
                a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id))
            });
            Bucket { key, events }
        })
        .collect()
}

fn event_of<E: AsRef<AttendanceEvent>>(event: &E) -> &AttendanceEvent {
    event.as_ref()
}
