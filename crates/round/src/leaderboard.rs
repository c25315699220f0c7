//! Leaderboard projection of cumulative loot totals.

use lootledger_core::{format_amount, to_display_units, Address, LootRecord};
use lootledger_gateway::LedgerGateway;
use lootledger_settings::LedgerConfig;
use tracing::warn;

pub const NO_LOOT: &str = "No loot to display yet!";
pub const FETCH_FAILED: &str = "Failed to fetch loot totals.";

/// Shortest bar drawn by [`Leaderboard::render_text`], in cells.
pub const MIN_BAR_CELLS: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub name: String,
    pub participant: Address,
    pub total: u128,
    /// `total` in whole units.
    pub display_value: f64,
    /// Share of the largest total, 0 to 100.
    pub height_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Leaderboard {
    Closed,
    Empty,
    Failed(String),
    Bars(Vec<Bar>),
}

/// Scale `records` against the largest total. A zero maximum counts as 1,
/// so an all-zero set gives zero-height bars.
pub fn project(records: &[LootRecord]) -> Leaderboard {
    if records.is_empty() {
        return Leaderboard::Empty;
    }
    let max = records.iter().map(|r| r.total).max().unwrap_or(0).max(1) as f64;
    Leaderboard::Bars(
        records
            .iter()
            .map(|r| Bar {
                name: r.name.clone(),
                participant: r.participant,
                total: r.total,
                display_value: to_display_units(r.total),
                height_percent: r.total as f64 / max * 100.0,
            })
            .collect(),
    )
}

/// Read the totals once. No retry: a failure is a single static error.
pub async fn fetch_leaderboard(gateway: &dyn LedgerGateway, config: &LedgerConfig) -> Leaderboard {
    if !config.open {
        return Leaderboard::Closed;
    }
    match gateway.get_loot_totals().await {
        Ok(records) => project(&records),
        Err(e) => {
            warn!(error = %e, "Loot totals fetch failed");
            Leaderboard::Failed(FETCH_FAILED.to_string())
        }
    }
}

impl Leaderboard {
    /// Horizontal text bars, `width` cells for the largest total.
    pub fn render_text(&self, width: usize) -> String {
        let bars = match self {
            Self::Closed => return crate::orchestrator::CLOSED.to_string(),
            Self::Empty => return NO_LOOT.to_string(),
            Self::Failed(message) => return message.clone(),
            Self::Bars(bars) => bars,
        };

        let name_width = bars.iter().map(|b| b.name.chars().count()).max().unwrap_or(0);
        let mut out = String::new();
        for bar in bars {
            let cells = ((bar.height_percent / 100.0) * width as f64).round() as usize;
            out.push_str(&format!(
                "{:<name_width$} {:<width$} {}\n",
                bar.name,
                "#".repeat(cells.max(MIN_BAR_CELLS)),
                format_amount(bar.total),
            ));
        }
        out
    }
}
