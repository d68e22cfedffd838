//! Toggle command for adding or removing an event from the schedule.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;

use agenda_core::{Event, EventId, Planner, SelectionBackend, Speaker};

use super::util::{open_session, time_span};
use crate::Config;

#[derive(Debug, Args)]
pub struct ToggleArgs {
    /// Catalog ID of the event, e.g. `th-01`.
    pub event_id: String,
}

pub fn format_toggle(
    event: &Event,
    selected: bool,
    conflicts: &[&Event],
    speakers: &[&Speaker],
) -> String {
    let mut output = String::new();
    let verb = if selected { "Added" } else { "Removed" };
    writeln!(
        output,
        "{verb} {} {} ({} {})",
        event.id,
        event.title,
        event.day,
        time_span(event)
    )
    .unwrap();
    if selected && !speakers.is_empty() {
        let names: Vec<&str> = speakers.iter().map(|s| s.name.as_str()).collect();
        writeln!(output, "Speakers: {}", names.join(", ")).unwrap();
    }
    if selected && !conflicts.is_empty() {
        writeln!(output, "Overlaps with:").unwrap();
        for other in conflicts {
            writeln!(
                output,
                "  {} {} ({})",
                other.id,
                other.title,
                time_span(other)
            )
            .unwrap();
        }
    }
    output
}

/// Toggles `event_id` and describes the result.
///
/// A change that could not be saved is an error: it would not outlive this
/// process.
pub fn apply<B: SelectionBackend>(planner: &mut Planner<B>, event_id: &EventId) -> Result<String> {
    let toggled = planner.toggle(event_id)?;
    if let Some(warning) = toggled.warning {
        return Err(anyhow::Error::new(warning).context(format!(
            "could not save the change to {event_id}; your schedule is unchanged"
        )));
    }
    let event = planner
        .catalog()
        .get(event_id)
        .with_context(|| format!("event not found: {event_id}"))?;
    let conflicts = planner.conflicts_for(event);
    let speakers = planner.catalog().speakers_for(event_id);
    Ok(format_toggle(event, toggled.selected, &conflicts, &speakers))
}

pub fn run<W: Write>(writer: &mut W, args: &ToggleArgs, config: &Config) -> Result<()> {
    let event_id = EventId::new(args.event_id.trim())?;
    let mut session = open_session(config)?;
    session.require_attendee()?;

    write!(writer, "{}", apply(&mut session.planner, &event_id)?)?;
    Ok(())
}
