//! Break classification and day-boundary annotations.
//!
//! A break is the gap between a checkout and the next checkin in the same
//! bucket. Annotations are keyed by event id and computed afresh on each read.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::bucket::Bucket;
use crate::status::Status;
use crate::types::{AttendanceEvent, EventId};

/// Joins a break label and day-boundary markers in [`Annotation::label`].
pub const ANNOTATION_SEPARATOR: &str = " | ";

pub const FIRST_OF_DAY: &str = "First of day";
pub const LAST_OF_DAY: &str = "Last of day";

/// Thresholds separating break kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakPolicy {
    /// Gaps shorter than this are short breaks.
    pub short_break_under: Duration,
    /// Gaps at least this long are lunch breaks.
    pub lunch_break_from: Duration,
}

impl Default for BreakPolicy {
    fn default() -> Self {
        Self {
            short_break_under: Duration::seconds(300),
            lunch_break_from: Duration::seconds(600),
        }
    }
}

/// Classification of a checkout-to-checkin gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    Short,
    Regular,
    Lunch,
}

impl BreakKind {
    pub fn classify(gap_seconds: i64, policy: &BreakPolicy) -> Self {
        if gap_seconds < policy.short_break_under.num_seconds() {
            Self::Short
        } else if gap_seconds >= policy.lunch_break_from.num_seconds() {
            Self::Lunch
        } else {
            Self::Regular
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Short => "Short break",
            Self::Regular => "Break",
            Self::Lunch => "Lunch break",
        }
    }
}

/// A classified break attached to the checkin that ended it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakInfo {
    pub kind: BreakKind,
    pub seconds: i64,
}

/// Per-event annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Annotation {
    #[serde(rename = "break", skip_serializing_if = "Option::is_none")]
    pub break_info: Option<BreakInfo>,
    pub first_of_day: bool,
    pub last_of_day: bool,
}

impl Annotation {
    pub fn break_label(&self) -> Option<&'static str> {
        self.break_info.map(|info| info.kind.label())
    }

    pub fn break_duration(&self) -> Option<String> {
        self.break_info.map(|info| format_break_duration(info.seconds))
    }

    /// Combined display label, e.g. `"Lunch break (17m) | Last of day"`.
    pub fn label(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(info) = self.break_info {
            parts.push(format!(
                "{} ({})",
                info.kind.label(),
                format_break_duration(info.seconds)
            ));
        }
        if self.first_of_day {
            parts.push(FIRST_OF_DAY.to_string());
        }
        if self.last_of_day {
            parts.push(LAST_OF_DAY.to_string());
        }
        (!parts.is_empty()).then(|| parts.join(ANNOTATION_SEPARATOR))
    }
}

/// Annotations keyed by event id.
pub type Annotations = BTreeMap<EventId, Annotation>;

/// Formats whole minutes and seconds, omitting a zero component.
///
/// `"7m"`, `"2m 30s"`, `"45s"`; negative input renders as `"0s"`.
pub fn format_break_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (minutes, rest) = (seconds / 60, seconds % 60);
    match (minutes, rest) {
        (0, s) => format!("{s}s"),
        (m, 0) => format!("{m}m"),
        (m, s) => format!("{m}m {s}s"),
    }
}

/// A checkin that closed a break, with the gap in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakGap {
    pub checkin_id: EventId,
    pub seconds: i64,
}

/// Folded view of one ordered bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakWalk {
    pub gaps: Vec<BreakGap>,
    pub first_checkin: Option<EventId>,
    pub last_checkout: Option<EventId>,
    /// Timestamp of a checkout not yet followed by a checkin.
    pub open_checkout_at: Option<DateTime<Utc>>,
}

impl BreakWalk {
    /// Folds one event into the walk.
    #[must_use]
    pub fn step(mut self, event: &AttendanceEvent) -> Self {
        match event.status {
            Status::Checkin => {
                if let Some(checkout_at) = self.open_checkout_at.take() {
                    self.gaps.push(BreakGap {
                        checkin_id: event.id,
                        seconds: (event.recorded_at - checkout_at).num_seconds(),
                    });
                }
                self.first_checkin.get_or_insert(event.id);
            }
            Status::Checkout => {
                self.open_checkout_at = Some(event.recorded_at);
                self.last_checkout = Some(event.id);
            }
        }
        self
    }

    pub fn total_break_seconds(&self) -> i64 {
        self.gaps.iter().map(|gap| gap.seconds).sum()
    }
}

/// Walks events in order, pairing each checkin with the preceding open checkout.
pub fn walk<'a>(events: impl IntoIterator<Item = &'a AttendanceEvent>) -> BreakWalk {
    events.into_iter().fold(BreakWalk::default(), BreakWalk::step)
}

/// Annotates one bucket.
pub fn annotate_bucket<E: AsRef<AttendanceEvent>>(
    bucket: &Bucket<'_, E>,
    policy: &BreakPolicy,
) -> Annotations {
    let walk = walk(bucket.iter());
    let mut annotations = Annotations::new();

    for gap in &walk.gaps {
        annotations.entry(gap.checkin_id).or_default().break_info = Some(BreakInfo {
            kind: BreakKind::classify(gap.seconds, policy),
            seconds: gap.seconds,
        });
    }
    if let Some(id) = walk.first_checkin {
        annotations.entry(id).or_default().first_of_day = true;
    }
    if let Some(id) = walk.last_checkout {
        annotations.entry(id).or_default().last_of_day = true;
    }

    annotations
}

/// Annotates every bucket.
pub fn annotate_all<E: AsRef<AttendanceEvent>>(
    buckets: &[Bucket<'_, E>],
    policy: &BreakPolicy,
) -> Annotations {
    buckets
        .iter()
        .flat_map(|bucket| annotate_bucket(bucket, policy))
        .collect()
}
