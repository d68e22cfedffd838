//! The immutable event catalog for one convention.
//!
//! A catalog is loaded once at startup and shared read-only (typically behind
//! an `Arc`) by every planner in the process.
//!
//! The JSON form is either a bare array of events or an object with
//! `events` and an optional `speakers` list.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::event::{Day, Event};
use crate::speaker::Speaker;
use crate::time::MalformedTimeError;
use crate::types::EventId;

/// Errors raised while building a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Two events share an ID.
    #[error("duplicate event ID in catalog: {0}")]
    DuplicateId(EventId),

    /// The catalog file could not be read.
    #[error("failed to read catalog {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog JSON is not a list of events.
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Events(Vec<Event>),
    Full {
        events: Vec<Event>,
        #[serde(default)]
        speakers: Vec<Speaker>,
    },
}

/// The full list of convention events, keyed by unique ID.
///
/// Insertion order is preserved and is the order of every catalog-derived
/// view unless that view re-sorts by time.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    events: Vec<Event>,
    index: HashMap<EventId, usize>,
    speakers: Vec<Speaker>,
    speakers_by_event: HashMap<EventId, Vec<usize>>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate IDs.
    ///
    /// Events with unparseable times are kept (they can still be browsed and
    /// selected) but are logged, since they drop out of time-based views.
    pub fn new(events: Vec<Event>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(events.len());
        for (position, event) in events.iter().enumerate() {
            if index.insert(event.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateId(event.id.clone()));
            }
        }
        let catalog = Self {
            events,
            index,
            speakers: Vec::new(),
            speakers_by_event: HashMap::new(),
        };

        for (id, error) in catalog.time_issues() {
            tracing::warn!(event_id = %id, %error, "catalog event has malformed times");
        }
        tracing::debug!(events = catalog.len(), "catalog loaded");

        Ok(catalog)
    }

    /// Attaches the speaker directory.
    ///
    /// Speaker references to events missing from the catalog are kept on
    /// the speaker but logged.
    #[must_use]
    pub fn with_speakers(mut self, speakers: Vec<Speaker>) -> Self {
        let mut by_event: HashMap<EventId, Vec<usize>> = HashMap::new();
        for (position, speaker) in speakers.iter().enumerate() {
            for event_id in &speaker.events {
                if !self.contains(event_id) {
                    tracing::warn!(
                        speaker = %speaker.name,
                        event_id = %event_id,
                        "speaker references an event missing from the catalog"
                    );
                    continue;
                }
                let positions = by_event.entry(event_id.clone()).or_default();
                if !positions.contains(&position) {
                    positions.push(position);
                }
            }
        }
        tracing::debug!(speakers = speakers.len(), "speaker directory loaded");
        self.speakers = speakers;
        self.speakers_by_event = by_event;
        self
    }

    /// Parses a catalog from JSON: an array of events, or an object with
    /// `events` and `speakers`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        match serde_json::from_str(json)? {
            CatalogFile::Events(events) => Self::new(events),
            CatalogFile::Full { events, speakers } => {
                Ok(Self::new(events)?.with_speakers(speakers))
            }
        }
    }

    /// Reads and parses a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn get(&self, id: &EventId) -> Option<&Event> {
        self.index.get(id).map(|&position| &self.events[position])
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.index.contains_key(id)
    }

    /// All events in catalog order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Every speaker, in catalog order.
    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    /// Speakers appearing in `event_id`, in catalog order.
    pub fn speakers_for(&self, event_id: &EventId) -> Vec<&Speaker> {
        self.speakers_by_event
            .get(event_id)
            .map(|positions| positions.iter().map(|&p| &self.speakers[p]).collect())
            .unwrap_or_default()
    }

    /// Speakers featured on `day`.
    pub fn speakers_on(&self, day: Day) -> Vec<&Speaker> {
        self.speakers.iter().filter(|s| s.day == day).collect()
    }

    /// First speaker whose name loosely matches `query`.
    pub fn find_speaker(&self, query: &str) -> Option<&Speaker> {
        self.speakers.iter().find(|s| s.matches_name(query))
    }

    /// Events whose start/end times cannot be used for ordering or conflicts.
    pub fn time_issues(&self) -> Vec<(&EventId, MalformedTimeError)> {
        self.events
            .iter()
            .filter_map(|event| event.time_range().err().map(|err| (&event.id, err)))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
