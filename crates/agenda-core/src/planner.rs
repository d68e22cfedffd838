//! Per-session schedule planner.
//!
//! A [`Planner`] ties together the shared [`Catalog`], one attendee's
//! [`SelectionStore`] and an injected [`SelectionBackend`]. Mutations update
//! memory first and then persist; a persistence failure is returned as a
//! warning and never undoes the in-memory change. All views are computed on
//! demand from the current selection.
//!
//! A saved selection that failed to load is never overwritten. Toggles made
//! meanwhile are remembered and replayed onto it once a load succeeds.

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{PersistenceError, SelectionBackend};
use crate::catalog::Catalog;
use crate::conflict::{ConflictPair, conflict_pairs, find_conflicts};
use crate::event::{Day, Event};
use crate::query::{EventFilter, filter_catalog};
use crate::selection::{SelectionError, SelectionStore};
use crate::speaker::Speaker;
use crate::types::{AttendeeId, EventId};

/// Result of signing an attendee in.
#[derive(Debug)]
pub struct SignIn {
    /// Number of event IDs restored from storage.
    pub restored: usize,
    /// Set when the saved selection could not be loaded.
    pub warning: Option<PersistenceError>,
}

/// Result of a toggle.
#[derive(Debug)]
pub struct Toggled {
    /// Whether the event is selected after the toggle.
    pub selected: bool,
    /// Set when the new selection could not be persisted.
    pub warning: Option<PersistenceError>,
}

/// One row of the browse view.
#[derive(Debug, Clone)]
pub struct BrowseEntry<'a> {
    pub event: &'a Event,
    pub selected: bool,
    /// Selected events that overlap this one.
    pub conflicts: Vec<&'a Event>,
    pub speakers: Vec<&'a Speaker>,
}

/// One attendee session's view of the catalog.
pub struct Planner<B> {
    catalog: Arc<Catalog>,
    store: SelectionStore,
    backend: B,
    /// Outcome of each toggle made while the saved selection is unknown
    /// (after a failed load). `None` once it has been restored.
    unrestored: Option<HashMap<EventId, bool>>,
}

impl<B: SelectionBackend> Planner<B> {
    /// Creates a planner with nobody signed in.
    pub fn new(catalog: Arc<Catalog>, backend: B) -> Self {
        Self {
            catalog,
            store: SelectionStore::new(),
            backend,
            unrestored: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Gives back the backend, e.g. to shut down a background writer.
    pub fn into_backend(self) -> B {
        self.backend
    }

    pub const fn attendee(&self) -> Option<&AttendeeId> {
        self.store.attendee()
    }

    /// Makes `attendee` the active attendee and restores their selection.
    ///
    /// Unsaved changes of the previous attendee get one last save attempt,
    /// then their selection is dropped from memory before anything is
    /// loaded. If storage is unavailable the attendee starts with an empty,
    /// in-memory selection that is not saved until the load succeeds.
    pub fn sign_in(&mut self, attendee: AttendeeId) -> SignIn {
        self.release_attendee();
        self.store.switch_attendee(Some(attendee.clone()));
        self.unrestored = Some(HashMap::new());

        match self.restore() {
            Ok(restored) => {
                tracing::debug!(attendee = %attendee, restored, "attendee signed in");
                SignIn {
                    restored,
                    warning: None,
                }
            }
            Err(error) => {
                tracing::warn!(
                    attendee = %attendee,
                    %error,
                    "could not load saved selection; continuing in memory"
                );
                SignIn {
                    restored: 0,
                    warning: Some(error),
                }
            }
        }
    }

    /// Forgets the active attendee and their in-memory selection.
    ///
    /// Unsaved changes get one last save attempt. Saved selections are left
    /// untouched.
    pub fn sign_out(&mut self) {
        self.release_attendee();
        self.store.switch_attendee(None);
        self.unrestored = None;
    }

    fn release_attendee(&mut self) {
        if self.store.attendee().is_none() || !self.store.is_dirty() {
            return;
        }
        if let Err(error) = self.persist() {
            tracing::warn!(
                attendee = ?self.store.attendee(),
                %error,
                "unsaved selection changes dropped on attendee switch"
            );
        }
    }

    /// Loads the active attendee's saved selection and replays any toggles
    /// made while it was unknown. Returns the number of saved IDs.
    fn restore(&mut self) -> Result<usize, PersistenceError> {
        let Some(attendee) = self.store.attendee().cloned() else {
            return Ok(0);
        };
        let saved = self.backend.load(&attendee)?.unwrap_or_default();
        let unknown = saved
            .iter()
            .filter(|id| !self.catalog.contains(id))
            .count();
        if unknown > 0 {
            tracing::warn!(
                attendee = %attendee,
                unknown,
                "saved selection references events missing from the catalog"
            );
        }
        let restored = saved.len();
        let toggled = self.unrestored.take().unwrap_or_default();

        let mut selection = saved.clone();
        for (event_id, selected) in toggled {
            if selected {
                selection.insert(event_id);
            } else {
                selection.remove(&event_id);
            }
        }
        let changed = selection != saved;
        self.store.replace(selection);
        if changed {
            tracing::info!(attendee = %attendee, "replayed toggles onto restored selection");
        } else {
            self.store.mark_persisted(self.store.version());
        }
        Ok(restored)
    }

    /// Adds or removes `event_id` from the active attendee's schedule.
    pub fn toggle(&mut self, event_id: &EventId) -> Result<Toggled, SelectionError> {
        if !self.catalog.contains(event_id) {
            return Err(SelectionError::UnknownEvent(event_id.clone()));
        }
        let selected = self.store.toggle(event_id)?;
        if let Some(toggled) = &mut self.unrestored {
            toggled.insert(event_id.clone(), selected);
        }
        tracing::debug!(event_id = %event_id, selected, "selection toggled");
        let warning = self.persist().err();
        Ok(Toggled { selected, warning })
    }

    /// Saves the current selection if it has unsaved changes.
    ///
    /// If the saved selection was never loaded, loading it is retried first
    /// and the save is refused while that keeps failing.
    pub fn persist(&mut self) -> Result<(), PersistenceError> {
        if !self.store.is_dirty() {
            return Ok(());
        }
        if self.unrestored.is_some() {
            self.restore()?;
            if !self.store.is_dirty() {
                return Ok(());
            }
        }
        let Some(write) = self.store.pending_write() else {
            return Ok(());
        };
        match self.backend.save(&write) {
            Ok(()) => {
                self.store.mark_persisted(write.version);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(
                    attendee = %write.attendee,
                    %error,
                    "selection not saved; keeping it in memory"
                );
                Err(error)
            }
        }
    }

    /// True when the in-memory selection has not been handed to storage.
    pub const fn has_unsaved_changes(&self) -> bool {
        self.store.is_dirty()
    }

    pub fn is_selected(&self, event_id: &EventId) -> bool {
        self.store.is_selected(event_id)
    }

    /// Number of selected IDs, including any no longer in the catalog.
    pub fn selected_count(&self) -> usize {
        self.store.len()
    }

    /// Selected catalog events, in catalog order.
    pub fn selected_events(&self) -> Vec<&Event> {
        self.catalog
            .iter()
            .filter(|event| self.store.is_selected(&event.id))
            .collect()
    }

    /// Selected events on `day`, earliest first.
    ///
    /// Events with equal start times keep catalog order. Events whose times
    /// cannot be parsed are left out.
    pub fn schedule_by_day(&self, day: Day) -> Vec<&Event> {
        let mut timed: Vec<(u16, &Event)> = self
            .selected_events()
            .into_iter()
            .filter(|event| event.day == day)
            .filter_map(|event| match event.time_range() {
                Ok(range) => Some((range.start().minutes(), event)),
                Err(error) => {
                    tracing::warn!(event_id = %event.id, %error, "leaving event out of the day schedule");
                    None
                }
            })
            .collect();
        timed.sort_by_key(|(start, _)| *start);
        timed.into_iter().map(|(_, event)| event).collect()
    }

    /// Selected event counts for every day, in day order.
    pub fn counts_by_day(&self) -> Vec<(Day, usize)> {
        let selected = self.selected_events();
        Day::ALL
            .iter()
            .map(|&day| (day, selected.iter().filter(|e| e.day == day).count()))
            .collect()
    }

    /// Selected events that overlap `event`.
    pub fn conflicts_for(&self, event: &Event) -> Vec<&Event> {
        find_conflicts(event, self.selected_events())
    }

    /// Every pair of selected events that overlap each other.
    pub fn schedule_conflicts(&self) -> Vec<ConflictPair<'_>> {
        conflict_pairs(&self.selected_events())
    }

    /// Filtered catalog rows annotated with selection and conflict state.
    pub fn browse(&self, filter: &EventFilter) -> Vec<BrowseEntry<'_>> {
        let selected = self.selected_events();
        filter_catalog(&self.catalog, filter)
            .into_iter()
            .map(|event| BrowseEntry {
                event,
                selected: self.store.is_selected(&event.id),
                conflicts: find_conflicts(event, selected.iter().copied()),
                speakers: self.catalog.speakers_for(&event.id),
            })
            .collect()
    }
}
