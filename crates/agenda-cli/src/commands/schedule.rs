//! Schedule command for showing the attendee's events day by day.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use agenda_core::{Day, Event};

use super::util::{open_session, time_span};
use crate::Config;

#[derive(Debug, Default, Args)]
pub struct ScheduleArgs {
    /// Only show this day.
    #[arg(long)]
    pub day: Option<Day>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// One day of the schedule, in start-time order.
#[derive(Debug, Serialize)]
pub struct ScheduleDay<'a> {
    pub day: Day,
    pub events: Vec<&'a Event>,
}

/// JSON output structure.
#[derive(Debug, Serialize)]
pub struct JsonSchedule<'a> {
    pub attendee: String,
    pub selected: usize,
    pub days: &'a [ScheduleDay<'a>],
}

pub fn format_schedule(attendee: &str, days: &[ScheduleDay<'_>]) -> String {
    let mut output = String::new();
    writeln!(output, "Schedule for {attendee}").unwrap();
    for schedule_day in days {
        writeln!(
            output,
            "{} ({})",
            schedule_day.day,
            schedule_day.events.len()
        )
        .unwrap();
        if schedule_day.events.is_empty() {
            writeln!(output, "  nothing selected").unwrap();
        }
        for event in &schedule_day.events {
            let venue = if event.venue.is_empty() {
                String::new()
            } else {
                format!(" @ {}", event.venue)
            };
            writeln!(
                output,
                "  {}  {}  {}{venue}",
                time_span(event),
                event.id,
                event.title
            )
            .unwrap();
        }
    }
    output
}

pub fn run<W: Write>(writer: &mut W, args: &ScheduleArgs, config: &Config) -> Result<()> {
    let session = open_session(config)?;
    let attendee = session.require_attendee()?.to_string();
    let planner = &session.planner;

    let days: Vec<Day> = args.day.map_or_else(|| Day::ALL.to_vec(), |day| vec![day]);
    let schedule: Vec<ScheduleDay<'_>> = days
        .into_iter()
        .map(|day| ScheduleDay {
            day,
            events: planner.schedule_by_day(day),
        })
        .collect();

    if args.json {
        let json = JsonSchedule {
            attendee,
            selected: planner.selected_count(),
            days: &schedule,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&json)?)?;
    } else {
        write!(writer, "{}", format_schedule(&attendee, &schedule))?;
    }
    Ok(())
}
