//! CLI subcommand implementations.

pub mod browse;
pub mod conflicts;
pub mod login;
pub mod logout;
pub mod popular;
pub mod schedule;
pub mod speakers;
pub mod status;
pub mod toggle;
pub mod util;
