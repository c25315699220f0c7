//! Line-driven session over a single reporting screen.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use lootledger_app::App;
use lootledger_core::Address;
use lootledger_round::{fetch_leaderboard, LedgerScreen};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::save_chart;
use crate::render::render_view;

const HELP: &str = "\
commands:
  refresh            reload round state from the ledger
  select ADDRESS     choose who is reporting
  report AMOUNT      report a haul for the selected pirate
  advance            start a new round
  chart [PATH]       save the round chart
  leaderboard        show loot totals
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Refresh,
    Select(Address),
    Report(String),
    Advance,
    Chart(Option<PathBuf>),
    Leaderboard,
    Help,
    Quit,
}

/// Parse one input line. Blank lines are `None`.
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if words.next().is_some() {
        return Err(format!("too many arguments for {command}"));
    }

    let parsed = match (command, arg) {
        ("refresh" | "status", None) => ShellCommand::Refresh,
        ("select", Some(address)) => {
            ShellCommand::Select(address.parse().map_err(|e| format!("{e}"))?)
        }
        ("report", Some(amount)) => ShellCommand::Report(amount.to_string()),
        ("advance", None) => ShellCommand::Advance,
        ("chart", out) => ShellCommand::Chart(out.map(PathBuf::from)),
        ("leaderboard", None) => ShellCommand::Leaderboard,
        ("help" | "?", None) => ShellCommand::Help,
        ("quit" | "exit", None) => ShellCommand::Quit,
        ("select" | "report", None) => return Err(format!("{command} needs an argument")),
        _ => return Err(format!("unknown command: {line}")),
    };
    Ok(Some(parsed))
}

/// Apply one command to the screen and print the outcome.
pub async fn execute(screen: &mut LedgerScreen, command: ShellCommand) {
    match command {
        ShellCommand::Refresh => screen.load().await,
        ShellCommand::Select(address) => {
            if !screen.select(address) {
                println!("error: {address} has nothing outstanding this round");
                return;
            }
        }
        ShellCommand::Report(amount) => {
            screen.set_amount(&amount);
            // The outcome lands in the notice shown below.
            let _ = screen.submit().await;
        }
        ShellCommand::Advance => {
            let _ = screen.advance().await;
        }
        ShellCommand::Chart(out) => {
            if let Err(e) = save_chart(screen, out.as_deref()) {
                println!("error: {e}");
            }
            return;
        }
        ShellCommand::Leaderboard => {
            let board = fetch_leaderboard(screen.gateway(), screen.config()).await;
            print!("{}", board.render_text(40));
            return;
        }
        ShellCommand::Help => {
            println!("{HELP}");
            return;
        }
        ShellCommand::Quit => return,
    }
    print!("{}", render_view(&screen.view()));
}

pub async fn run(app: &App) -> Result<()> {
    let mut screen = app.screen()?;
    screen.load().await;
    print!("{}", render_view(&screen.view()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("lootledger> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(ShellCommand::Quit)) => break,
            Ok(Some(command)) => execute(&mut screen, command).await,
            Err(message) => println!("error: {message}"),
        }
    }
    Ok(())
}
