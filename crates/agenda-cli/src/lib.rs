//! Convention agenda CLI library.
//!
//! This crate provides the CLI interface for planning a personal convention
//! schedule.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
