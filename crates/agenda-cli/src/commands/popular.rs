//! Popular command for ranking events by attendee interest.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use clap::Args;

use agenda_core::{Catalog, EventId};
use agenda_db::EventPopularity;

use super::util::{load_catalog, open_database};
use crate::Config;

#[derive(Debug, Args)]
pub struct PopularArgs {
    /// Maximum number of events to show.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

pub fn format_popular(attendees: usize, ranked: &[EventPopularity], catalog: &Catalog) -> String {
    let mut output = String::new();
    writeln!(output, "Attendees: {attendees}").unwrap();
    if ranked.is_empty() {
        writeln!(output, "No events selected yet.").unwrap();
        return output;
    }
    for row in ranked {
        let title = EventId::new(row.event_id.as_str())
            .ok()
            .and_then(|id| catalog.get(&id))
            .map_or("(not in catalog)", |event| event.title.as_str());
        writeln!(output, "{:>4}  {}  {title}", row.attendees, row.event_id).unwrap();
    }
    output
}

pub fn run<W: Write>(writer: &mut W, args: &PopularArgs, config: &Config) -> Result<()> {
    let catalog = load_catalog(config)?;
    let db = open_database(config)?;
    let ranked = db.popular_events(args.limit)?;
    let attendees = db.attendee_count()?;
    write!(writer, "{}", format_popular(attendees, &ranked, &catalog))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::commands::util::fixtures;

    #[test]
    fn popular_ranks_across_attendees() {
        let temp = tempfile::tempdir().unwrap();
        let config = fixtures::config_in(temp.path());
        fixtures::login(&config, "Anna");
        fixtures::toggle(&config, &["th-01", "fr-01"]);
        fixtures::login(&config, "Ben");
        fixtures::toggle(&config, &["fr-01", "sa-01"]);
        fixtures::login(&config, "Cleo");
        fixtures::toggle(&config, &["fr-01", "th-01"]);

        let mut output = Vec::new();
        run(&mut output, &PopularArgs { limit: 2 }, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
Attendees: 3
   3  fr-01  Parenting Workshop
   2  th-01  Opening Keynote
");
    }

    #[test]
    fn popular_handles_ids_missing_from_catalog() {
        let temp = tempfile::tempdir().unwrap();
        let config = fixtures::config_in(temp.path());
        let catalog = load_catalog(&config).unwrap();
        let ranked = vec![EventPopularity {
            event_id: "old-07".to_string(),
            attendees: 1,
        }];

        assert_snapshot!(format_popular(1, &ranked, &catalog), @r"
Attendees: 1
   1  old-07  (not in catalog)
");

        assert_snapshot!(format_popular(0, &[], &catalog), @r"
Attendees: 0
No events selected yet.
");
    }
}
