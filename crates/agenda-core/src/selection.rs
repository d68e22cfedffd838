//! The per-attendee selection set.
//!
//! The store is pure in-memory state: it never performs I/O. Every mutation
//! bumps a monotonic version so that persistence can tell newer snapshots
//! from stale ones, and marks the store dirty until a snapshot of that
//! version is reported as persisted.

use std::collections::{BTreeSet, HashSet};

use thiserror::Error;

use crate::types::{AttendeeId, EventId};

/// Errors from selection operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// A mutation was attempted with nobody signed in.
    #[error("no active attendee; sign in before changing the schedule")]
    NoActiveAttendee,

    /// The event is not in the catalog.
    #[error("unknown event: {0}")]
    UnknownEvent(EventId),
}

/// A snapshot of one attendee's selection, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub attendee: AttendeeId,
    pub event_ids: BTreeSet<EventId>,
    /// Store version this snapshot was taken at. Higher is newer.
    pub version: u64,
}

/// Mutable set of chosen event IDs, owned by one attendee at a time.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    attendee: Option<AttendeeId>,
    selected: HashSet<EventId>,
    version: u64,
    persisted_version: u64,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The attendee whose selection this is, if anyone is signed in.
    pub const fn attendee(&self) -> Option<&AttendeeId> {
        self.attendee.as_ref()
    }

    /// Hands the store to a different attendee (or to nobody).
    ///
    /// The previous selection is discarded before the new owner is attached,
    /// so nothing carries over between attendees.
    pub fn switch_attendee(&mut self, attendee: Option<AttendeeId>) {
        self.clear();
        self.attendee = attendee;
    }

    /// Flips membership of `event_id`, returning whether it is now selected.
    pub fn toggle(&mut self, event_id: &EventId) -> Result<bool, SelectionError> {
        if self.attendee.is_none() {
            return Err(SelectionError::NoActiveAttendee);
        }
        let now_selected = if self.selected.remove(event_id) {
            false
        } else {
            self.selected.insert(event_id.clone());
            true
        };
        self.bump();
        Ok(now_selected)
    }

    pub fn is_selected(&self, event_id: &EventId) -> bool {
        self.selected.contains(event_id)
    }

    /// Replaces the whole selection; nothing from the old set is merged.
    pub fn replace<I>(&mut self, event_ids: I)
    where
        I: IntoIterator<Item = EventId>,
    {
        self.selected = event_ids.into_iter().collect();
        self.bump();
    }

    /// Empties the selection without touching the attendee.
    pub fn clear(&mut self) {
        self.selected.clear();
        self.bump();
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected IDs in arbitrary order.
    pub fn ids(&self) -> impl Iterator<Item = &EventId> {
        self.selected.iter()
    }

    /// Current version; increases on every mutation.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// True when the current state has not been reported as persisted.
    pub const fn is_dirty(&self) -> bool {
        self.version != self.persisted_version
    }

    /// Snapshot of the current state for the active attendee.
    pub fn pending_write(&self) -> Option<PendingWrite> {
        let attendee = self.attendee.clone()?;
        Some(PendingWrite {
            attendee,
            event_ids: self.selected.iter().cloned().collect(),
            version: self.version,
        })
    }

    /// Records that the snapshot taken at `version` reached storage.
    ///
    /// Acknowledgements for versions older than one already recorded are
    /// ignored.
    pub fn mark_persisted(&mut self, version: u64) {
        if version > self.persisted_version && version <= self.version {
            self.persisted_version = version;
        }
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}
