//! Login command for choosing the active attendee.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use agenda_core::Attendee;

use super::util::open_database;
use crate::Config;

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Attendee name.
    #[arg(long)]
    pub name: String,
    /// Age group, e.g. `18-29`.
    #[arg(long)]
    pub age: String,
}

pub fn run<W: Write>(writer: &mut W, args: &LoginArgs, config: &Config) -> Result<()> {
    let attendee = Attendee::new(&args.name, &args.age)?;
    let db = open_database(config)?;
    db.set_active_attendee(&attendee)?;
    let saved = db
        .load_selection(&attendee.id())?
        .map_or(0, |selection| selection.len());

    writeln!(writer, "Signed in as {attendee}")?;
    writeln!(writer, "Saved events: {saved}")?;
    Ok(())
}
