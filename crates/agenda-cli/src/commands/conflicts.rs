//! Conflicts command for listing overlapping selections.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;

use agenda_core::ConflictPair;

use super::util::{open_session, time_span};
use crate::Config;

pub fn format_conflicts(pairs: &[ConflictPair<'_>]) -> String {
    let mut output = String::new();
    if pairs.is_empty() {
        writeln!(output, "No overlapping events in your schedule.").unwrap();
        return output;
    }
    for pair in pairs {
        writeln!(
            output,
            "{}: {} {} ({}) overlaps {} {} ({})",
            pair.first.day,
            pair.first.id,
            pair.first.title,
            time_span(pair.first),
            pair.second.id,
            pair.second.title,
            time_span(pair.second)
        )
        .unwrap();
    }
    output
}

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let session = open_session(config)?;
    session.require_attendee()?;
    let pairs = session.planner.schedule_conflicts();
    write!(writer, "{}", format_conflicts(&pairs))?;
    Ok(())
}
