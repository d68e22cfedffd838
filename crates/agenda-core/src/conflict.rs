//! Same-day time conflict detection.
//!
//! Two events conflict when they are on the same day and their half-open time
//! ranges overlap. Events whose times cannot be parsed never conflict with
//! anything; the catalog reports them when it is loaded.

use crate::event::Event;
use crate::time::TimeRange;

/// Returns the events in `against` that conflict with `candidate`.
///
/// The candidate itself (matched by ID) is skipped, so passing a schedule
/// that already contains the candidate is fine. Output preserves the
/// iteration order of `against`.
pub fn find_conflicts<'a, I>(candidate: &Event, against: I) -> Vec<&'a Event>
where
    I: IntoIterator<Item = &'a Event>,
{
    let Ok(range) = candidate.time_range() else {
        tracing::debug!(event_id = %candidate.id, "skipping conflict check for malformed times");
        return Vec::new();
    };

    against
        .into_iter()
        .filter(|other| other.day == candidate.day && other.id != candidate.id)
        .filter(|other| {
            other
                .time_range()
                .is_ok_and(|other_range| other_range.overlaps(&range))
        })
        .collect()
}

/// Two events in a set that conflict with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictPair<'a> {
    /// The pair member that comes first in the input.
    pub first: &'a Event,
    pub second: &'a Event,
}

/// Every conflicting pair within `events`, each reported once.
///
/// Pairs are ordered by the position of their first member, then the second.
pub fn conflict_pairs<'a>(events: &[&'a Event]) -> Vec<ConflictPair<'a>> {
    let timed: Vec<(&'a Event, TimeRange)> = events
        .iter()
        .filter_map(|event| event.time_range().ok().map(|range| (*event, range)))
        .collect();

    let mut pairs = Vec::new();
    for (i, (first, first_range)) in timed.iter().enumerate() {
        for (second, second_range) in &timed[i + 1..] {
            if first.day == second.day && first.id != second.id && first_range.overlaps(second_range) {
                pairs.push(ConflictPair {
                    first: *first,
                    second: *second,
                });
            }
        }
    }
    pairs
}
