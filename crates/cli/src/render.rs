//! Plain-text rendering of the reporting screen.

use std::fmt::Write;

use lootledger_core::Notice;
use lootledger_round::{ChartPanel, ScreenView};

pub fn notice_line(notice: &Notice) -> String {
    match notice {
        Notice::Success(m) => format!("ok: {m}"),
        Notice::Error(m) => format!("error: {m}"),
    }
}

pub fn render_view(view: &ScreenView) -> String {
    let mut out = String::new();
    match view {
        ScreenView::Closed { message } => {
            let _ = writeln!(out, "{message}");
        }
        ScreenView::Reporting {
            round,
            outstanding,
            selected,
            amount,
            notice,
            pending,
            ..
        } => {
            let _ = writeln!(out, "Days at sea: {round}");
            let _ = writeln!(out, "Pirates yet to report:");
            for pirate in outstanding {
                let marker = if selected.as_ref() == Some(pirate) { '>' } else { ' ' };
                let _ = writeln!(out, " {marker} {pirate}");
            }
            if !amount.is_empty() {
                let _ = writeln!(out, "Loot: {amount}");
            }
            if *pending {
                let _ = writeln!(out, "Reporting...");
            }
            if let Some(notice) = notice {
                let _ = writeln!(out, "{}", notice_line(notice));
            }
        }
        ScreenView::RoundComplete { round, chart, notice, .. } => {
            let _ = writeln!(out, "Days at sea: {round}");
            let _ = writeln!(out, "All pirates have reported for this round!");
            let _ = match chart {
                ChartPanel::Chart(url) => writeln!(out, "Chart: {url}"),
                ChartPanel::Loading => writeln!(out, "Loading on-chain chart..."),
                ChartPanel::CharterLink(link) => writeln!(out, "Call the Charter: {link}"),
            };
            if let Some(notice) = notice {
                let _ = writeln!(out, "{}", notice_line(notice));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lootledger_core::{Address, Participant};

    #[test]
    fn test_reporting_marks_selection() {
        let anne = Participant::new(Address([0xa1; 20]), "Anne");
        let bart = Participant::new(Address([0xb2; 20]), "Bart");
        let view = ScreenView::Reporting {
            round: 3,
            outstanding: vec![anne.clone(), bart],
            selected: Some(anne),
            amount: String::new(),
            notice: Some(Notice::Success("Loot submitted!".into())),
            pending: false,
            can_submit: false,
        };
        assert_eq!(
            render_view(&view),
            "Days at sea: 3\n\
             Pirates yet to report:\n \
             > Anne (0xa1a1...a1a1)\n   \
             Bart (0xb2b2...b2b2)\n\
             ok: Loot submitted!\n"
        );
    }

    #[test]
    fn test_round_complete_panels() {
        let view = ScreenView::RoundComplete {
            round: 4,
            chart: ChartPanel::CharterLink("/charter".into()),
            notice: None,
            can_advance: true,
        };
        assert!(render_view(&view).contains("Call the Charter: /charter"));

        let view = ScreenView::RoundComplete {
            round: 4,
            chart: ChartPanel::Loading,
            notice: Some(Notice::Error("Failed to fetch round info.".into())),
            can_advance: false,
        };
        let text = render_view(&view);
        assert!(text.contains("Loading on-chain chart..."));
        assert!(text.ends_with("error: Failed to fetch round info.\n"));
    }

    #[test]
    fn test_closed() {
        let view = ScreenView::Closed {
            message: "The Charter is Closed!".into(),
        };
        assert_eq!(render_view(&view), "The Charter is Closed!\n");
    }
}
