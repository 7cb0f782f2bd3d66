//! teamscrape: collect team members from organization websites.
//!
//! Walks a provider directory, finds each organization's site, extracts
//! the people it lists, and writes one consolidated CSV.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
