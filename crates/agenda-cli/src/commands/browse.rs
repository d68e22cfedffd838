//! Browse command for listing catalog events with selection state.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use agenda_core::{BrowseEntry, Category, Day, Event, EventFilter, EventId, FocusGroup};

use super::util::{open_session, time_span};
use crate::Config;

#[derive(Debug, Default, Args)]
pub struct BrowseArgs {
    /// Only events on this day.
    #[arg(long)]
    pub day: Option<Day>,
    /// Only events suited to this audience (`All` shows everything).
    #[arg(long)]
    pub audience: Option<FocusGroup>,
    /// Only events of this category.
    #[arg(long)]
    pub category: Option<Category>,
    /// Case-insensitive text to look for in titles and descriptions.
    #[arg(long)]
    pub search: Option<String>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

impl BrowseArgs {
    fn filter(&self) -> EventFilter {
        EventFilter {
            day: self.day,
            focus_group: self.audience,
            category: self.category,
            search: self.search.clone(),
        }
    }
}

/// JSON row: the catalog event plus its selection state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonBrowseEntry<'a> {
    #[serde(flatten)]
    pub event: &'a Event,
    pub selected: bool,
    pub conflicts: Vec<&'a EventId>,
    pub speakers: Vec<&'a str>,
}

pub fn format_browse(rows: &[BrowseEntry<'_>]) -> String {
    let mut output = String::new();
    if rows.is_empty() {
        writeln!(output, "No events match these filters.").unwrap();
        return output;
    }

    for row in rows {
        let event = row.event;
        let mark = if row.selected { "[x]" } else { "[ ]" };
        writeln!(
            output,
            "{mark} {}  {} {}  {} ({}, {})",
            event.id,
            event.day,
            time_span(event),
            event.title,
            event.category,
            event.focus_group
        )
        .unwrap();
        if !row.speakers.is_empty() {
            let names: Vec<&str> = row.speakers.iter().map(|s| s.name.as_str()).collect();
            writeln!(output, "    speakers: {}", names.join(", ")).unwrap();
        }
        if !row.conflicts.is_empty() {
            let titles: Vec<&str> = row.conflicts.iter().map(|e| e.title.as_str()).collect();
            let label = if row.selected { "overlaps" } else { "would overlap" };
            writeln!(output, "    {label}: {}", titles.join(", ")).unwrap();
        }
    }

    let selected = rows.iter().filter(|row| row.selected).count();
    writeln!(output, "{} events, {selected} selected", rows.len()).unwrap();
    output
}

pub fn format_browse_json(rows: &[BrowseEntry<'_>]) -> Result<String> {
    let entries: Vec<JsonBrowseEntry<'_>> = rows
        .iter()
        .map(|row| JsonBrowseEntry {
            event: row.event,
            selected: row.selected,
            conflicts: row.conflicts.iter().map(|e| &e.id).collect(),
            speakers: row.speakers.iter().map(|s| s.name.as_str()).collect(),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

pub fn run<W: Write>(writer: &mut W, args: &BrowseArgs, config: &Config) -> Result<()> {
    let session = open_session(config)?;
    let rows = session.planner.browse(&args.filter());

    if args.json {
        writeln!(writer, "{}", format_browse_json(&rows)?)?;
    } else {
        write!(writer, "{}", format_browse(&rows))?;
    }
    Ok(())
}
