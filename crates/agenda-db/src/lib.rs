//! Storage layer for convention schedules.
//!
//! Provides persistence for attendees, their selected events and the
//! remembered sign-in using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` can be moved between threads but not shared without external
//! synchronization (e.g. a `Mutex<Database>`).
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in ISO 8601 format (e.g., `2024-01-15T10:30:00.000Z`),
//! so lexicographic ordering matches chronological ordering.
//!
//! ## Attendee Keys
//!
//! Attendees get a random UUID row ID. The `attendee_key` column holds the
//! stable [`AttendeeId`] the planner uses (`name#age_group`), and is unique.
//! Selections reference the row ID and are deleted with their attendee.

use std::collections::BTreeSet;
use std::path::Path;

use agenda_core::{
    Attendee, AttendeeId, EventId, PendingWrite, PersistenceError, SelectionBackend,
};
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use uuid::Uuid;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored row could not be turned back into a domain value.
    #[error("invalid stored data for {key}: {message}")]
    InvalidData { key: String, message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// How many attendees picked an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPopularity {
    pub event_id: String,
    pub attendees: usize,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS attendees (
                id TEXT PRIMARY KEY,
                attendee_key TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                age_group TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- One row per (attendee, event) pair the attendee has selected.
            -- event_id is the catalog ID and is not checked against any table.
            CREATE TABLE IF NOT EXISTS schedule_selections (
                id TEXT PRIMARY KEY,
                attendee_id TEXT NOT NULL,
                event_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (attendee_id, event_id),
                FOREIGN KEY (attendee_id) REFERENCES attendees(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_selections_event ON schedule_selections(event_id);

            -- The remembered sign-in. At most one row.
            CREATE TABLE IF NOT EXISTS active_session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                attendee_id TEXT NOT NULL,
                signed_in_at TEXT NOT NULL,
                FOREIGN KEY (attendee_id) REFERENCES attendees(id) ON DELETE CASCADE
            );
            ",
        )?;
        Ok(())
    }

    /// Stores an attendee, refreshing name and age group if the key exists.
    ///
    /// Returns the attendee's row ID.
    pub fn register_attendee(&self, attendee: &Attendee) -> Result<String, DbError> {
        let key = attendee.id();
        let now = format_timestamp_now();
        if let Some(row_id) = self.attendee_row_id(&key)? {
            self.conn.execute(
                "UPDATE attendees SET name = ?, age_group = ?, updated_at = ? WHERE id = ?",
                params![attendee.name(), attendee.age_group(), now, row_id],
            )?;
            return Ok(row_id);
        }
        let row_id = Uuid::new_v4().to_string();
        self.conn.execute(
            "
            INSERT INTO attendees (id, attendee_key, name, age_group, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![
                row_id,
                key.as_str(),
                attendee.name(),
                attendee.age_group(),
                now,
                now
            ],
        )?;
        tracing::debug!(attendee = %key, "registered attendee");
        Ok(row_id)
    }

    /// Loads an attendee's selected event IDs.
    ///
    /// Returns `None` if the attendee has never been stored.
    pub fn load_selection(&self, key: &AttendeeId) -> Result<Option<BTreeSet<EventId>>, DbError> {
        let Some(row_id) = self.attendee_row_id(key)? else {
            return Ok(None);
        };
        let mut stmt = self.conn.prepare(
            "
            SELECT event_id
            FROM schedule_selections
            WHERE attendee_id = ?
            ORDER BY event_id ASC
            ",
        )?;
        let rows = stmt.query_map([&row_id], |row| row.get::<_, String>(0))?;
        let mut selection = BTreeSet::new();
        for row in rows {
            let raw = row?;
            let event_id = EventId::new(raw).map_err(|err| DbError::InvalidData {
                key: key.to_string(),
                message: err.to_string(),
            })?;
            selection.insert(event_id);
        }
        Ok(Some(selection))
    }

    /// Makes `event_ids` the attendee's complete selection.
    ///
    /// Rows for events that stay selected keep their original `created_at`.
    /// Unknown keys are registered on the fly.
    pub fn save_selection(
        &self,
        key: &AttendeeId,
        event_ids: &BTreeSet<EventId>,
    ) -> Result<(), DbError> {
        let tx = self.conn.unchecked_transaction()?;
        let row_id = self.ensure_attendee(key)?;
        let existing = self.load_selection(key)?.unwrap_or_default();
        let now = format_timestamp_now();

        let mut removed = 0;
        {
            let mut stmt = tx.prepare(
                "DELETE FROM schedule_selections WHERE attendee_id = ? AND event_id = ?",
            )?;
            for event_id in existing.difference(event_ids) {
                removed += stmt.execute(params![row_id, event_id.as_str()])?;
            }
        }

        let mut added = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO schedule_selections (id, attendee_id, event_id, created_at)
                VALUES (?, ?, ?, ?)
                ",
            )?;
            for event_id in event_ids.difference(&existing) {
                added += stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    row_id,
                    event_id.as_str(),
                    now
                ])?;
            }
        }

        tx.execute(
            "UPDATE attendees SET updated_at = ? WHERE id = ?",
            params![now, row_id],
        )?;
        tx.commit()?;
        tracing::debug!(attendee = %key, added, removed, "saved selection");
        Ok(())
    }

    /// Remembers `attendee` as the signed-in attendee, replacing anyone else.
    pub fn set_active_attendee(&self, attendee: &Attendee) -> Result<(), DbError> {
        let row_id = self.register_attendee(attendee)?;
        self.conn.execute(
            "
            INSERT INTO active_session (id, attendee_id, signed_in_at)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                attendee_id = excluded.attendee_id,
                signed_in_at = excluded.signed_in_at
            ",
            params![row_id, format_timestamp_now()],
        )?;
        Ok(())
    }

    /// The remembered attendee, if anyone is signed in.
    pub fn active_attendee(&self) -> Result<Option<Attendee>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT a.attendee_key, a.name, a.age_group
                FROM active_session s
                JOIN attendees a ON a.id = s.attendee_id
                WHERE s.id = 1
                ",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((key, name, age_group)) = row else {
            return Ok(None);
        };
        let attendee = Attendee::new(&name, &age_group).map_err(|err| DbError::InvalidData {
            key,
            message: err.to_string(),
        })?;
        Ok(Some(attendee))
    }

    /// Forgets the remembered sign-in. Selections are kept.
    ///
    /// Returns whether anyone was signed in.
    pub fn clear_active_attendee(&self) -> Result<bool, DbError> {
        let deleted = self.conn.execute("DELETE FROM active_session", [])?;
        Ok(deleted > 0)
    }

    /// Events ranked by how many attendees selected them.
    ///
    /// Ties are broken by event ID. `limit` caps the number of rows.
    pub fn popular_events(&self, limit: usize) -> Result<Vec<EventPopularity>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "
            SELECT event_id, COUNT(*) AS attendees
            FROM schedule_selections
            GROUP BY event_id
            ORDER BY attendees DESC, event_id ASC
            LIMIT ?
            ",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(EventPopularity {
                event_id: row.get(0)?,
                attendees: row.get(1)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// Number of stored attendees.
    pub fn attendee_count(&self) -> Result<usize, DbError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM attendees", [], |row| row.get(0))?;
        Ok(count)
    }

    fn attendee_row_id(&self, key: &AttendeeId) -> Result<Option<String>, DbError> {
        let row_id = self
            .conn
            .query_row(
                "SELECT id FROM attendees WHERE attendee_key = ?",
                [key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row_id)
    }

    /// Row ID for `key`, inserting a bare attendee row if needed.
    fn ensure_attendee(&self, key: &AttendeeId) -> Result<String, DbError> {
        if let Some(row_id) = self.attendee_row_id(key)? {
            return Ok(row_id);
        }
        let (name, age_group) = key.as_str().split_once('#').unwrap_or((key.as_str(), ""));
        let row_id = Uuid::new_v4().to_string();
        let now = format_timestamp_now();
        self.conn.execute(
            "
            INSERT INTO attendees (id, attendee_key, name, age_group, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![row_id, key.as_str(), name, age_group, now, now],
        )?;
        Ok(row_id)
    }
}

impl SelectionBackend for Database {
    fn load(&self, attendee: &AttendeeId) -> Result<Option<BTreeSet<EventId>>, PersistenceError> {
        self.load_selection(attendee)
            .map_err(|err| PersistenceError::load(attendee, err))
    }

    fn save(&self, write: &PendingWrite) -> Result<(), PersistenceError> {
        self.save_selection(&write.attendee, &write.event_ids)
            .map_err(|err| PersistenceError::save(&write.attendee, err))
    }
}

fn format_timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
