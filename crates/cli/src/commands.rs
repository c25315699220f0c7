//! One function per subcommand.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use lootledger_app::App;
use lootledger_core::Address;
use lootledger_keystore::{default_key_path_for, generate_keypair};
use lootledger_round::{fetch_leaderboard, LedgerScreen};

use crate::render::render_view;
use crate::SERVICE;

pub async fn status(app: &App) -> Result<()> {
    let mut screen = app.screen()?;
    show_status(&mut screen).await
}

/// Load and print the screen. Fails when the ledger could not be read.
pub async fn show_status(screen: &mut LedgerScreen) -> Result<()> {
    screen.load().await;
    print!("{}", render_view(&screen.view()));
    if let Some(notice) = screen.orchestrator().notice().filter(|n| n.is_error()) {
        bail!("{}", notice.message());
    }
    Ok(())
}

pub async fn report(app: &App, participant: Option<Address>, amount: &str) -> Result<()> {
    let mut screen = app.screen()?;
    screen.load().await;
    screen.set_amount(amount);
    let result = match participant {
        Some(p) => screen.submit_for(p).await,
        None => screen.submit().await,
    };
    print!("{}", render_view(&screen.view()));
    result?;
    Ok(())
}

pub async fn advance(app: &App) -> Result<()> {
    let mut screen = app.screen()?;
    screen.load().await;
    let result = screen.advance().await;
    print!("{}", render_view(&screen.view()));
    result?;
    Ok(())
}

pub async fn chart(app: &App, out: Option<PathBuf>) -> Result<()> {
    let mut screen = app.screen()?;
    screen.load().await;
    save_chart(&screen, out.as_deref())
}

/// Write the shown chart to `out`, or report why there is none.
pub fn save_chart(screen: &LedgerScreen, out: Option<&Path>) -> Result<()> {
    let config = screen.config();
    let sync = screen.synchronizer();
    if !config.open {
        bail!(lootledger_round::orchestrator::CLOSED);
    }
    if !sync.is_round_complete() {
        bail!(
            "{} pirate(s) have yet to report this round",
            sync.outstanding().len()
        );
    }
    if !config.onchain_chart {
        println!("On-ledger chart disabled. Call the Charter: {}", config.charter_link);
        return Ok(());
    }
    let Some(artifact) = screen.chart().artifact() else {
        bail!("The ledger did not return a usable chart");
    };

    let path = match out {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(format!(
            "chart-round-{}.png",
            sync.round().unwrap_or_default()
        )),
    };
    std::fs::write(&path, artifact.bytes())
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Saved {} bytes to {}", artifact.len(), path.display());
    Ok(())
}

pub async fn leaderboard(app: &App, width: usize) -> Result<()> {
    let gateway = app.gateway()?;
    let board = fetch_leaderboard(gateway.as_ref(), &app.config).await;
    print!("{}", board.render_text(width));
    Ok(())
}

pub fn keygen(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| default_key_path_for(SERVICE));
    let keypair = generate_keypair(&path)?;
    println!("Address: {}", keypair.address());
    println!("Key file: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use lootledger_core::{Participant, UNIT};
    use lootledger_gateway::{MemoryLedger, RawArtifact};
    use lootledger_settings::LedgerConfig;

    fn completed_screen(onchain_chart: bool) -> LedgerScreen {
        let anne = Participant::new(Address([0xa1; 20]), "Anne");
        let ledger = MemoryLedger::new(6, vec![anne.clone()])
            .with_reported(anne.address, UNIT)
            .with_chart(RawArtifact::Text("0x89504e47".into()));
        let config = LedgerConfig {
            onchain_chart,
            ..Default::default()
        };
        LedgerScreen::new(config, Arc::new(ledger))
    }

    #[tokio::test]
    async fn test_save_chart_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("chart.png");
        let mut screen = completed_screen(true);
        screen.load().await;

        save_chart(&screen, Some(&out)).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), vec![0x89, 0x50, 0x4e, 0x47]);
    }

    #[tokio::test]
    async fn test_save_chart_requires_complete_round() {
        let ledger = MemoryLedger::new(1, vec![Participant::new(Address([1; 20]), "Anne")]);
        let mut screen = LedgerScreen::new(LedgerConfig::default(), Arc::new(ledger));
        screen.load().await;
        assert!(save_chart(&screen, None).is_err());
    }

    #[tokio::test]
    async fn test_save_chart_with_flag_off_is_ok() {
        let mut screen = completed_screen(false);
        screen.load().await;
        assert!(save_chart(&screen, None).is_ok());
        assert!(screen.chart().artifact().is_none());
    }

    #[tokio::test]
    async fn test_status_fails_when_ledger_unreadable() {
        let ledger = Arc::new(MemoryLedger::new(2, vec![]));
        ledger.fail_reads(Some("node down"));
        let mut screen = LedgerScreen::new(LedgerConfig::default(), ledger);

        let err = show_status(&mut screen).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch round info.");
    }

    #[tokio::test]
    async fn test_status_ok_when_loaded() {
        let mut screen = completed_screen(false);
        assert!(show_status(&mut screen).await.is_ok());
    }
}
