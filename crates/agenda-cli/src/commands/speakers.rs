//! Speakers command for the speaker directory.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Result, bail};
use clap::Args;

use agenda_core::{Catalog, Day, Speaker};

use super::util::{load_catalog, time_span};
use crate::Config;

#[derive(Debug, Default, Args)]
pub struct SpeakersArgs {
    /// Only speakers featured on this day.
    #[arg(long)]
    pub day: Option<Day>,
    /// Show the speaker whose name matches, with their bio.
    #[arg(long, conflicts_with = "day")]
    pub name: Option<String>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

fn write_speaker(output: &mut String, speaker: &Speaker, catalog: &Catalog) {
    if speaker.title.is_empty() {
        writeln!(output, "  {}", speaker.name).unwrap();
    } else {
        writeln!(output, "  {} - {}", speaker.name, speaker.title).unwrap();
    }
    for event_id in &speaker.events {
        if let Some(event) = catalog.get(event_id) {
            writeln!(
                output,
                "    {}  {} {}  {}",
                event.id,
                event.day,
                time_span(event),
                event.title
            )
            .unwrap();
        }
    }
}

/// Speakers grouped under their day, in day order.
pub fn format_directory(speakers: &[&Speaker], catalog: &Catalog) -> String {
    let mut output = String::new();
    if speakers.is_empty() {
        writeln!(output, "No speakers listed.").unwrap();
        return output;
    }
    for &day in Day::ALL {
        let on_day: Vec<&&Speaker> = speakers.iter().filter(|s| s.day == day).collect();
        if on_day.is_empty() {
            continue;
        }
        writeln!(output, "{day}").unwrap();
        for speaker in on_day {
            write_speaker(&mut output, speaker, catalog);
        }
    }
    output
}

/// One speaker with their bio.
pub fn format_profile(speaker: &Speaker, catalog: &Catalog) -> String {
    let mut output = String::new();
    writeln!(output, "{}", speaker.day).unwrap();
    write_speaker(&mut output, speaker, catalog);
    if !speaker.bio.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "{}", speaker.bio).unwrap();
    }
    output
}

pub fn run<W: Write>(writer: &mut W, args: &SpeakersArgs, config: &Config) -> Result<()> {
    let catalog = load_catalog(config)?;

    if let Some(query) = &args.name {
        let Some(speaker) = catalog.find_speaker(query) else {
            bail!("no speaker matches '{query}'");
        };
        if args.json {
            writeln!(writer, "{}", serde_json::to_string_pretty(speaker)?)?;
        } else {
            write!(writer, "{}", format_profile(speaker, &catalog))?;
        }
        return Ok(());
    }

    let speakers: Vec<&Speaker> = match args.day {
        Some(day) => catalog.speakers_on(day),
        None => catalog.speakers().iter().collect(),
    };
    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&speakers)?)?;
    } else {
        write!(writer, "{}", format_directory(&speakers, &catalog))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::commands::util::fixtures;

    fn speakers(config: &Config, args: &SpeakersArgs) -> Result<String> {
        let mut output = Vec::new();
        run(&mut output, args, config)?;
        Ok(String::from_utf8(output).unwrap())
    }

    #[test]
    fn directory_groups_speakers_by_day() {
        let temp = tempfile::tempdir().unwrap();
        let config = fixtures::config_in(temp.path());

        assert_snapshot!(speakers(&config, &SpeakersArgs::default()).unwrap(), @r"
Thursday
  Bishop Earl K. Fernandes - Bishop of the Diocese of Columbus
    th-01  Thursday 9:00 AM-10:00 AM  Opening Keynote
Friday
  Fr. Joseph Puthenpurackal - Priest of the Syro-Malabar Catholic Church
    fr-01  Friday 10:00 AM-11:00 AM  Parenting Workshop
    fr-02  Friday 10:30 AM-11:30 AM  Clergy Panel
Saturday
  Dr. Edward Sri - Catholic Theologian, Speaker & Author
");
    }

    #[test]
    fn day_filter_and_empty_day() {
        let temp = tempfile::tempdir().unwrap();
        let config = fixtures::config_in(temp.path());

        let args = SpeakersArgs {
            day: Some(Day::Saturday),
            ..SpeakersArgs::default()
        };
        assert_snapshot!(speakers(&config, &args).unwrap(), @r"
Saturday
  Dr. Edward Sri - Catholic Theologian, Speaker & Author
");

        let args = SpeakersArgs {
            day: Some(Day::Sunday),
            ..SpeakersArgs::default()
        };
        assert_snapshot!(speakers(&config, &args).unwrap(), @"No speakers listed.");
    }

    #[test]
    fn name_lookup_is_loose() {
        let temp = tempfile::tempdir().unwrap();
        let config = fixtures::config_in(temp.path());

        let args = SpeakersArgs {
            name: Some("fernandes".to_string()),
            json: true,
            ..SpeakersArgs::default()
        };
        let json: serde_json::Value =
            serde_json::from_str(&speakers(&config, &args).unwrap()).unwrap();
        assert_eq!(json["name"], "Bishop Earl K. Fernandes");
        assert_eq!(json["events"], serde_json::json!(["th-01"]));

        let args = SpeakersArgs {
            name: Some("Nobody".to_string()),
            ..SpeakersArgs::default()
        };
        let err = speakers(&config, &args).unwrap_err();
        assert_eq!(err.to_string(), "no speaker matches 'Nobody'");
    }
}
