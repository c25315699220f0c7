//! Reporting screen: the synchronizer, orchestrator and chart slot behind
//! one view, configured once at construction.

use std::sync::Arc;

use lootledger_core::{Address, Notice, Participant, Round};
use lootledger_gateway::{LedgerGateway, TxReceipt};
use lootledger_settings::LedgerConfig;
use tracing::{debug, warn};

use crate::artifact::{self, ChartSlot};
use crate::orchestrator::{ActionKind, SubmissionError, TransactionOrchestrator, CLOSED};
use crate::sync::RoundSynchronizer;

/// What the round-complete view shows in place of the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartPanel {
    /// Display handle of the decoded on-ledger chart.
    Chart(String),
    /// On-ledger chart requested but not (yet) available.
    Loading,
    /// Static link to the leaderboard.
    CharterLink(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenView {
    Closed {
        message: String,
    },
    Reporting {
        round: Round,
        outstanding: Vec<Participant>,
        selected: Option<Participant>,
        amount: String,
        notice: Option<Notice>,
        pending: bool,
        can_submit: bool,
    },
    RoundComplete {
        round: Round,
        chart: ChartPanel,
        notice: Option<Notice>,
        can_advance: bool,
    },
}

pub struct LedgerScreen {
    config: LedgerConfig,
    gateway: Arc<dyn LedgerGateway>,
    sync: RoundSynchronizer,
    orchestrator: TransactionOrchestrator,
    amount: String,
    chart: ChartSlot,
}

impl LedgerScreen {
    pub fn new(config: LedgerConfig, gateway: Arc<dyn LedgerGateway>) -> Self {
        Self {
            sync: RoundSynchronizer::new(gateway.clone()),
            orchestrator: TransactionOrchestrator::new(gateway.clone()),
            config,
            gateway,
            amount: String::new(),
            chart: ChartSlot::default(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn gateway(&self) -> &dyn LedgerGateway {
        self.gateway.as_ref()
    }

    /// Rehydrate from the ledger. A closed screen makes no ledger calls.
    pub async fn load(&mut self) {
        if !self.config.open {
            return;
        }
        match self.sync.refresh().await {
            Ok(_) => self.orchestrator.clear_error(),
            Err(err) => self.orchestrator.notify(Notice::Error(err.to_string())),
        }
        self.update_chart().await;
    }

    pub fn select(&mut self, address: Address) -> bool {
        self.sync.select(address)
    }

    pub fn set_amount(&mut self, text: &str) {
        self.amount = text.to_string();
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn synchronizer(&self) -> &RoundSynchronizer {
        &self.sync
    }

    pub fn orchestrator(&self) -> &TransactionOrchestrator {
        &self.orchestrator
    }

    pub fn chart(&self) -> &ChartSlot {
        &self.chart
    }

    /// Report the entered amount for the selected participant.
    pub async fn submit(&mut self) -> Result<TxReceipt, SubmissionError> {
        if !self.config.open {
            return Err(self.orchestrator.reject(ActionKind::Haul, SubmissionError::Closed));
        }
        let Some(participant) = self.sync.selected().map(|p| p.address) else {
            return Err(self
                .orchestrator
                .reject(ActionKind::Haul, SubmissionError::NoneSelected));
        };
        self.submit_for(participant).await
    }

    /// Report the entered amount for `participant`, which must be outstanding.
    pub async fn submit_for(&mut self, participant: Address) -> Result<TxReceipt, SubmissionError> {
        if !self.config.open {
            return Err(self.orchestrator.reject(ActionKind::Haul, SubmissionError::Closed));
        }
        let receipt = self
            .orchestrator
            .submit_haul(&mut self.sync, participant, &self.amount)
            .await?;
        self.amount.clear();
        self.update_chart().await;
        Ok(receipt)
    }

    pub async fn advance(&mut self) -> Result<TxReceipt, SubmissionError> {
        if !self.config.open {
            return Err(self
                .orchestrator
                .reject(ActionKind::Advance, SubmissionError::Closed));
        }
        let receipt = self.orchestrator.advance_round(&mut self.sync).await?;
        self.update_chart().await;
        Ok(receipt)
    }

    pub fn can_submit(&self) -> bool {
        self.config.open
            && !self.orchestrator.is_pending()
            && !self.amount.trim().is_empty()
            && self.sync.selected().is_some()
            && !self.sync.outstanding().is_empty()
    }

    pub fn can_advance(&self) -> bool {
        self.config.open && !self.orchestrator.is_pending() && self.sync.is_round_complete()
    }

    /// Fetch and show the chart once the round is complete and the
    /// on-ledger chart is enabled; otherwise drop any shown chart.
    async fn update_chart(&mut self) {
        if !(self.config.onchain_chart && self.sync.is_round_complete()) {
            self.chart.clear();
            return;
        }
        if self.chart.is_shown() {
            return;
        }

        let raw = match self.gateway.generate_chart_artifact().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Chart generation failed");
                return;
            }
        };
        // Rejections are logged by the decoder; the panel stays on Loading.
        let Ok(chart) = artifact::decode(&raw) else {
            return;
        };
        match self.chart.show(chart) {
            Ok(handle) => debug!(url = handle.url(), "Chart ready"),
            Err(e) => warn!(error = %e, "Could not create chart handle"),
        }
    }

    pub fn view(&self) -> ScreenView {
        if !self.config.open {
            return ScreenView::Closed {
                message: CLOSED.to_string(),
            };
        }

        let round = self.sync.round().unwrap_or_default();
        let notice = self.orchestrator.notice().cloned();

        if self.sync.is_round_complete() {
            let chart = if !self.config.onchain_chart {
                ChartPanel::CharterLink(self.config.charter_link.clone())
            } else {
                match self.chart.handle() {
                    Some(handle) => ChartPanel::Chart(handle.url().to_string()),
                    None => ChartPanel::Loading,
                }
            };
            return ScreenView::RoundComplete {
                round,
                chart,
                notice,
                can_advance: self.can_advance(),
            };
        }

        ScreenView::Reporting {
            round,
            outstanding: self.sync.outstanding().iter().cloned().collect(),
            selected: self.sync.selected().cloned(),
            amount: self.amount.clone(),
            notice,
            pending: self.orchestrator.is_pending(),
            can_submit: self.can_submit(),
        }
    }
}
