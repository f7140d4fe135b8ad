// ABOUTME: Advisory calendar conflict detection
// ABOUTME: Half-open interval overlap against free/busy windows; never blocks creation

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A busy window reported by the calendar collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Half-open overlap test: intervals [a, b) and [c, d) conflict iff
/// a < d and b > c. Adjacent intervals do not conflict.
pub fn overlaps(candidate_start: DateTime<Utc>, candidate_end: DateTime<Utc>, busy: &BusyInterval) -> bool {
    candidate_start < busy.end && candidate_end > busy.start
}

/// All busy windows a candidate slot collides with. The result is
/// advisory; the caller may schedule anyway.
pub fn find_conflicts(
    scheduled_at: DateTime<Utc>,
    duration_minutes: i64,
    busy_intervals: &[BusyInterval],
) -> Vec<BusyInterval> {
    let candidate_end = scheduled_at + Duration::minutes(duration_minutes);
    busy_intervals
        .iter()
        .filter(|busy| overlaps(scheduled_at, candidate_end, busy))
        .cloned()
        .collect()
}
