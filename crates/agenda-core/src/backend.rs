//! Persistence seam for attendee selections.
//!
//! The planner never talks to storage directly; it is handed something that
//! implements [`SelectionBackend`]. Implementations live next to their storage
//! (the `SQLite` one is in `agenda-db`); [`MemoryBackend`] keeps everything in
//! process and doubles as the fallback when no storage is configured.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::selection::PendingWrite;
use crate::types::{AttendeeId, EventId};

/// Boxed error from a storage implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Saving or loading a selection failed. Never fatal to the caller.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The store cannot be reached at all.
    #[error("selection storage is unavailable")]
    Unavailable,

    /// The store rejected or failed an operation.
    #[error("failed to {operation} selection for {attendee}")]
    Storage {
        operation: &'static str,
        attendee: AttendeeId,
        #[source]
        source: BoxError,
    },
}

impl PersistenceError {
    /// Wraps a storage error for a load.
    pub fn load(attendee: &AttendeeId, source: impl Into<BoxError>) -> Self {
        Self::Storage {
            operation: "load",
            attendee: attendee.clone(),
            source: source.into(),
        }
    }

    /// Wraps a storage error for a save.
    pub fn save(attendee: &AttendeeId, source: impl Into<BoxError>) -> Self {
        Self::Storage {
            operation: "save",
            attendee: attendee.clone(),
            source: source.into(),
        }
    }
}

/// Durable storage for attendee selections.
pub trait SelectionBackend {
    /// Returns the saved selection, or `None` if the attendee has never saved.
    fn load(&self, attendee: &AttendeeId) -> Result<Option<BTreeSet<EventId>>, PersistenceError>;

    /// Stores `write.event_ids` as the attendee's complete selection.
    fn save(&self, write: &PendingWrite) -> Result<(), PersistenceError>;
}

impl<B: SelectionBackend + ?Sized> SelectionBackend for &B {
    fn load(&self, attendee: &AttendeeId) -> Result<Option<BTreeSet<EventId>>, PersistenceError> {
        (**self).load(attendee)
    }

    fn save(&self, write: &PendingWrite) -> Result<(), PersistenceError> {
        (**self).save(write)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    selections: HashMap<AttendeeId, BTreeSet<EventId>>,
    unavailable: bool,
    unreadable: bool,
    saves: usize,
}

/// In-process selection storage.
///
/// Clones share the same state, so a test can keep a handle while the planner
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the store going offline (or coming back).
    pub fn set_available(&self, available: bool) {
        self.lock().unavailable = !available;
    }

    /// Makes loads fail (or succeed again) while saves keep working, as with
    /// a busy database that rejects a read but accepts a later write.
    pub fn set_readable(&self, readable: bool) {
        self.lock().unreadable = !readable;
    }

    /// The stored selection for `attendee`, bypassing availability.
    pub fn stored(&self, attendee: &AttendeeId) -> Option<BTreeSet<EventId>> {
        self.lock().selections.get(attendee).cloned()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SelectionBackend for MemoryBackend {
    fn load(&self, attendee: &AttendeeId) -> Result<Option<BTreeSet<EventId>>, PersistenceError> {
        let state = self.lock();
        if state.unavailable {
            return Err(PersistenceError::Unavailable);
        }
        if state.unreadable {
            return Err(PersistenceError::load(attendee, "database is busy"));
        }
        Ok(state.selections.get(attendee).cloned())
    }

    fn save(&self, write: &PendingWrite) -> Result<(), PersistenceError> {
        let mut state = self.lock();
        if state.unavailable {
            return Err(PersistenceError::Unavailable);
        }
        state
            .selections
            .insert(write.attendee.clone(), write.event_ids.clone());
        state.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(attendee: &str, ids: &[&str], version: u64) -> PendingWrite {
        PendingWrite {
            attendee: AttendeeId::new(attendee).unwrap(),
            event_ids: ids.iter().map(|id| EventId::new(*id).unwrap()).collect(),
            version,
        }
    }

    #[test]
    fn memory_backend_roundtrips_per_attendee() {
        let backend = MemoryBackend::new();
        let anna = AttendeeId::new("anna").unwrap();
        let ben = AttendeeId::new("ben").unwrap();

        assert_eq!(backend.load(&anna).unwrap(), None);
        backend.save(&write("anna", &["th-01", "fr-02"], 1)).unwrap();

        assert_eq!(backend.load(&anna).unwrap().unwrap().len(), 2);
        assert_eq!(backend.load(&ben).unwrap(), None);
        assert_eq!(backend.save_count(), 1);
    }

    #[test]
    fn memory_backend_can_be_unavailable() {
        let backend = MemoryBackend::new();
        let anna = AttendeeId::new("anna").unwrap();
        backend.set_available(false);

        assert!(matches!(
            backend.load(&anna),
            Err(PersistenceError::Unavailable)
        ));
        assert!(backend.save(&write("anna", &["th-01"], 1)).is_err());
        assert_eq!(backend.stored(&anna), None);

        backend.set_available(true);
        backend.save(&write("anna", &["th-01"], 2)).unwrap();
        assert!(backend.stored(&anna).is_some());
    }

    #[test]
    fn unreadable_backend_still_accepts_saves() {
        let backend = MemoryBackend::new();
        let anna = AttendeeId::new("anna").unwrap();
        backend.set_readable(false);

        let err = backend.load(&anna).unwrap_err();
        assert_eq!(err.to_string(), "failed to load selection for anna");
        backend.save(&write("anna", &["th-01"], 1)).unwrap();
        assert_eq!(backend.stored(&anna).unwrap().len(), 1);
    }

    #[test]
    fn storage_error_names_operation_and_attendee() {
        let anna = AttendeeId::new("anna#30").unwrap();
        let err = PersistenceError::save(&anna, "disk full");
        assert_eq!(err.to_string(), "failed to save selection for anna#30");
        assert_eq!(
            std::error::Error::source(&err).unwrap().to_string(),
            "disk full"
        );
    }
}
