mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{counties, days, indicators, levels, render, states};
use tracing_subscriber::EnvFilter;

/// Log to stderr at a level picked by `-v`, unless RUST_LOG says otherwise.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Days => days::run(&cli),
        Commands::Indicators(args) => indicators::run(&cli, args),
        Commands::Levels => levels::run(&cli),
        Commands::States => states::run(&cli),
        Commands::Counties(args) => counties::run(&cli, args),
        Commands::Render(args) => render::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
