//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::browse::BrowseArgs;
use crate::commands::login::LoginArgs;
use crate::commands::popular::PopularArgs;
use crate::commands::schedule::ScheduleArgs;
use crate::commands::speakers::SpeakersArgs;
use crate::commands::toggle::ToggleArgs;

/// Personal convention schedule planner.
///
/// Browse the event catalog, pick the sessions you want to attend and see
/// where your picks overlap.
#[derive(Debug, Parser)]
#[command(name = "agenda", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in; later commands act for this attendee.
    Login(LoginArgs),

    /// Sign out. Saved selections are kept.
    Logout,

    /// Show who is signed in and how many events are selected per day.
    Status,

    /// List catalog events, optionally filtered.
    Browse(BrowseArgs),

    /// Add an event to your schedule, or remove it if already there.
    Toggle(ToggleArgs),

    /// Show your schedule, day by day in time order.
    Schedule(ScheduleArgs),

    /// List overlapping events in your schedule.
    Conflicts,

    /// Rank events by how many attendees selected them.
    Popular(PopularArgs),

    /// List featured speakers and the events they appear in.
    Speakers(SpeakersArgs),
}
