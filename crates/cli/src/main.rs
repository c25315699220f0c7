//! `lootledger`: report hauls and advance rounds on the pirate loot ledger.

mod cli;
mod commands;
mod render;
mod shell;

use anyhow::Result;
use clap::Parser;
use lootledger_app::{App, AppBuilder};

use crate::cli::{Cli, Commands};

pub const SERVICE: &str = "lootledger";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Needs no settings or ledger.
        Commands::Keygen { path } => commands::keygen(path),
        command => {
            let mut builder = AppBuilder::new(SERVICE).verbose(cli.verbose);
            if let Some(path) = &cli.config {
                builder = builder.config_path(path);
            }
            let app = builder.build()?;
            run(&app, command).await
        }
    }
}

async fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Status => commands::status(app).await,
        Commands::Report {
            participant,
            amount,
        } => commands::report(app, participant, &amount).await,
        Commands::Advance => commands::advance(app).await,
        Commands::Chart { out } => commands::chart(app, out).await,
        Commands::Leaderboard { width } => commands::leaderboard(app, width).await,
        Commands::Shell => shell::run(app).await,
        Commands::Keygen { path } => commands::keygen(path),
    }
}
