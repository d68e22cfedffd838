//! Core domain logic for the convention planner.
//!
//! This crate contains the fundamental types and logic for:
//! - Catalog: loading and indexing the immutable event list and its speakers
//! - Time: parsing `h:mm AM/PM` strings and detecting overlaps
//! - Selection: one attendee's chosen events, with versioned snapshots
//! - Persistence: the storage seam and a debounced background writer
//! - Planner: day schedules, conflicts and filtered browsing

pub mod backend;
pub mod catalog;
pub mod conflict;
pub mod event;
pub mod planner;
pub mod query;
pub mod selection;
pub mod speaker;
pub mod time;
pub mod types;
pub mod writer;

pub use backend::{MemoryBackend, PersistenceError, SelectionBackend};
pub use catalog::{Catalog, CatalogError};
pub use conflict::{ConflictPair, conflict_pairs, find_conflicts};
pub use event::{Category, Day, Event, FocusGroup};
pub use planner::{BrowseEntry, Planner, SignIn, Toggled};
pub use query::{EventFilter, filter_catalog};
pub use selection::{PendingWrite, SelectionError, SelectionStore};
pub use speaker::Speaker;
pub use time::{MalformedTimeError, TimeOfDay, TimeRange, intervals_overlap, parse_time_of_day};
pub use types::{Attendee, AttendeeId, EventId, ValidationError};
pub use writer::{DebouncedBackend, WriterStats};
