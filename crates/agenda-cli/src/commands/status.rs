//! Status command for showing the signed-in attendee and per-day counts.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;

use agenda_core::{Attendee, Day};

use super::util::open_session;
use crate::Config;

/// Everything the status view shows.
#[derive(Debug)]
pub struct StatusReport {
    pub catalog_path: String,
    pub catalog_events: usize,
    pub unreadable_times: usize,
    pub database_path: String,
    pub attendee: Option<Attendee>,
    pub selected: usize,
    pub by_day: Vec<(Day, usize)>,
}

pub fn format_status(report: &StatusReport) -> String {
    let mut output = String::new();
    writeln!(output, "Convention agenda status").unwrap();
    writeln!(
        output,
        "Catalog: {} ({} events)",
        report.catalog_path, report.catalog_events
    )
    .unwrap();
    if report.unreadable_times > 0 {
        writeln!(
            output,
            "Events with unreadable times: {}",
            report.unreadable_times
        )
        .unwrap();
    }
    writeln!(output, "Database: {}", report.database_path).unwrap();

    let Some(attendee) = &report.attendee else {
        writeln!(output, "Not signed in.").unwrap();
        return output;
    };
    writeln!(output, "Attendee: {attendee}").unwrap();
    writeln!(output, "Selected events: {}", report.selected).unwrap();
    for (day, count) in &report.by_day {
        writeln!(output, "  {day}: {count}").unwrap();
    }
    output
}

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let session = open_session(config)?;
    let planner = &session.planner;
    let report = StatusReport {
        catalog_path: config.catalog_path.display().to_string(),
        catalog_events: planner.catalog().len(),
        unreadable_times: planner.catalog().time_issues().len(),
        database_path: config.database_path.display().to_string(),
        attendee: session.attendee.clone(),
        selected: planner.selected_count(),
        by_day: planner.counts_by_day(),
    };
    write!(writer, "{}", format_status(&report))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::commands::util::fixtures;

    #[test]
    fn status_shows_counts_per_day() {
        let temp = tempfile::tempdir().unwrap();
        let config = fixtures::config_in(temp.path());
        fixtures::login(&config, "Anna");
        fixtures::toggle(&config, &["th-01", "th-03", "sa-01"]);

        let mut output = Vec::new();
        run(&mut output, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output
            .replace(&config.catalog_path.display().to_string(), "[TEMP]/catalog.json")
            .replace(&config.database_path.display().to_string(), "[TEMP]/agenda.db");
        assert_snapshot!(output, @r"
Convention agenda status
Catalog: [TEMP]/catalog.json (6 events)
Database: [TEMP]/agenda.db
Attendee: Anna (30-39)
Selected events: 3
  Thursday: 2
  Friday: 0
  Saturday: 1
  Sunday: 0
");
    }

    #[test]
    fn status_without_attendee() {
        let report = StatusReport {
            catalog_path: "/srv/catalog.json".to_string(),
            catalog_events: 40,
            unreadable_times: 2,
            database_path: "/srv/agenda.db".to_string(),
            attendee: None,
            selected: 0,
            by_day: Vec::new(),
        };
        assert_snapshot!(format_status(&report), @r"
Convention agenda status
Catalog: /srv/catalog.json (40 events)
Events with unreadable times: 2
Database: /srv/agenda.db
Not signed in.
");
    }
}
