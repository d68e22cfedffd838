//! Logout command.

use std::io::Write;

use anyhow::Result;

use super::util::open_database;
use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let signed_out = db.active_attendee()?;
    db.clear_active_attendee()?;

    match signed_out {
        Some(attendee) => writeln!(writer, "Signed out {attendee}")?,
        None => writeln!(writer, "Nobody is signed in.")?,
    }
    Ok(())
}
