use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use agenda_cli::commands::{
    browse, conflicts, login, logout, popular, schedule, speakers, status, toggle,
};
use agenda_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = std::io::stdout().lock();
    match command {
        Commands::Login(args) => login::run(&mut stdout, args, &config)?,
        Commands::Logout => logout::run(&mut stdout, &config)?,
        Commands::Status => status::run(&mut stdout, &config)?,
        Commands::Browse(args) => browse::run(&mut stdout, args, &config)?,
        Commands::Toggle(args) => toggle::run(&mut stdout, args, &config)?,
        Commands::Schedule(args) => schedule::run(&mut stdout, args, &config)?,
        Commands::Conflicts => conflicts::run(&mut stdout, &config)?,
        Commands::Popular(args) => popular::run(&mut stdout, args, &config)?,
        Commands::Speakers(args) => speakers::run(&mut stdout, args, &config)?,
    }
    stdout.flush()?;

    Ok(())
}
