use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lootledger_core::Address;

#[derive(Parser, Debug)]
#[command(name = "lootledger", version, about = "Report hauls to the pirate loot ledger")]
pub struct Cli {
    #[arg(long, global = true, help = "Settings file (defaults to the platform config dir)")]
    pub config: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Log at debug level")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Show the round and who has yet to report
    Status,
    /// Report a haul (defaults to the first pirate yet to report)
    Report {
        #[arg(long)]
        participant: Option<Address>,
        amount: String,
    },
    /// Start a new round once everyone has reported
    Advance,
    /// Save the on-ledger chart of a completed round
    Chart {
        #[arg(long, help = "Output file (default: chart-round-<round>.png)")]
        out: Option<PathBuf>,
    },
    /// Print cumulative loot per pirate
    Leaderboard {
        #[arg(long, default_value_t = 40)]
        width: usize,
    },
    /// Create a signing credential file
    Keygen {
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Interactive session
    Shell,
}
