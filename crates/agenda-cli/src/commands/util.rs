//! Shared utilities for CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use agenda_core::{Attendee, Catalog, Event, Planner};
use agenda_db::Database;

use crate::Config;

/// An opened planner plus the remembered attendee, if any.
pub struct Session {
    pub planner: Planner<Database>,
    pub attendee: Option<Attendee>,
}

impl Session {
    /// The signed-in attendee, or an error telling the user to log in.
    pub fn require_attendee(&self) -> Result<&Attendee> {
        self.attendee.as_ref().context(
            "nobody is signed in; run `agenda login --name <NAME> --age <AGE_GROUP>` first",
        )
    }
}

/// Opens the database, creating its parent directory if needed.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Loads the event catalog named in the configuration.
pub fn load_catalog(config: &Config) -> Result<Catalog> {
    Catalog::load(&config.catalog_path)
        .with_context(|| format!("failed to load catalog {}", config.catalog_path.display()))
}

/// Loads catalog and database and signs in the remembered attendee.
pub fn open_session(config: &Config) -> Result<Session> {
    let catalog = Arc::new(load_catalog(config)?);
    let db = open_database(config)?;
    let attendee = db
        .active_attendee()
        .context("failed to read the signed-in attendee")?;

    let mut planner = Planner::new(catalog, db);
    if let Some(attendee) = &attendee {
        let sign_in = planner.sign_in(attendee.id());
        if let Some(warning) = sign_in.warning {
            return Err(anyhow::Error::new(warning)
                .context(format!("failed to load the saved schedule for {attendee}")));
        }
        tracing::debug!(attendee = %attendee, restored = sign_in.restored, "session opened");
    }
    Ok(Session { planner, attendee })
}

/// `9:00 AM-10:00 AM`, as written in the catalog.
pub fn time_span(event: &Event) -> String {
    format!("{}-{}", event.start_time, event.end_time)
}
