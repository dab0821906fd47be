// lib/src/scheduling/time_window.rs

use chrono::{DateTime, Duration, Utc};

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, minutes: u32) -> Self {
        TimeWindow {
            start,
            end: start + Duration::minutes(i64::from(minutes)),
        }
    }

    /// Touching windows (one ends exactly when the other starts) do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}
