//! Lootledger Round
//!
//! Keeps a client in step with the ledger: the synchronizer reads the round
//! and the outstanding crew, the orchestrator drives mutating transactions
//! through finality, and the decoder vets the chart the ledger renders once
//! everyone has reported.

pub mod artifact;
pub mod leaderboard;
pub mod orchestrator;
pub mod screen;
pub mod sync;

pub use artifact::{decode, ChartArtifact, ChartSlot, DecodeError, DisplayHandle, PNG_MAGIC};
pub use leaderboard::{fetch_leaderboard, project, Bar, Leaderboard};
pub use orchestrator::{ActionKind, SubmissionError, TransactionOrchestrator};
pub use screen::{ChartPanel, LedgerScreen, ScreenView};
pub use sync::{RoundSynchronizer, SyncError};
