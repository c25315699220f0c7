//! Transaction Orchestrator: sign, submit, await finality, then refresh.
//!
//! Preconditions are checked before any call reaches the gateway. The
//! outstanding set is never edited here; it changes only through the
//! refresh that follows a confirmed transaction.

use std::sync::Arc;

use lootledger_core::{format_amount, Address, AmountError, HaulSubmission, Notice, TransactionResult};
use lootledger_gateway::{GatewayError, LedgerGateway, TxReceipt};
use thiserror::Error;
use tracing::{info, warn};

use crate::sync::RoundSynchronizer;

pub const HAUL_RECORDED: &str = "Loot submitted!";
pub const ROUND_ADVANCED: &str = "A new round has begun!";
pub const CLOSED: &str = "The Charter is Closed!";

/// A mutating action failed. The outstanding set is unchanged.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Private key not set")]
    MissingCredential,
    #[error("Pirate not found: {0} has nothing outstanding this round")]
    NotEligible(Address),
    #[error("No pirate selected")]
    NoneSelected,
    #[error("Invalid loot amount: {0}")]
    InvalidAmount(#[from] AmountError),
    #[error("Not every pirate has reported yet")]
    RoundIncomplete,
    #[error("The Charter is Closed!")]
    Closed,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Haul,
    Advance,
}

impl ActionKind {
    fn success(&self) -> &'static str {
        match self {
            Self::Haul => HAUL_RECORDED,
            Self::Advance => ROUND_ADVANCED,
        }
    }

    fn failure(&self) -> &'static str {
        match self {
            Self::Haul => "Failed to report loot",
            Self::Advance => "Failed to start new round",
        }
    }
}

/// Runs mutating actions one at a time and owns the user-visible feedback:
/// a single notice slot, the pending flag and the last result per action.
pub struct TransactionOrchestrator {
    gateway: Arc<dyn LedgerGateway>,
    notice: Option<Notice>,
    pending: bool,
    haul: Option<TransactionResult>,
    advance: Option<TransactionResult>,
}

impl TransactionOrchestrator {
    pub fn new(gateway: Arc<dyn LedgerGateway>) -> Self {
        Self {
            gateway,
            notice: None,
            pending: false,
            haul: None,
            advance: None,
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Replace the current notice.
    pub fn notify(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn clear_error(&mut self) {
        if self.notice.as_ref().is_some_and(Notice::is_error) {
            self.notice = None;
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn result(&self, kind: ActionKind) -> Option<&TransactionResult> {
        match kind {
            ActionKind::Haul => self.haul.as_ref(),
            ActionKind::Advance => self.advance.as_ref(),
        }
    }

    fn result_mut(&mut self, kind: ActionKind) -> &mut Option<TransactionResult> {
        match kind {
            ActionKind::Haul => &mut self.haul,
            ActionKind::Advance => &mut self.advance,
        }
    }

    /// Record a haul for `participant`, then refresh `sync`.
    pub async fn submit_haul(
        &mut self,
        sync: &mut RoundSynchronizer,
        participant: Address,
        amount: &str,
    ) -> Result<TxReceipt, SubmissionError> {
        self.begin(ActionKind::Haul);
        let outcome = self.record(sync, participant, amount).await;
        self.finish(ActionKind::Haul, sync, outcome).await
    }

    /// Advance to the next round, then refresh `sync`.
    pub async fn advance_round(
        &mut self,
        sync: &mut RoundSynchronizer,
    ) -> Result<TxReceipt, SubmissionError> {
        self.begin(ActionKind::Advance);
        let outcome = self.hoist(sync).await;
        self.finish(ActionKind::Advance, sync, outcome).await
    }

    /// Fail an action that never started, e.g. on a closed screen.
    pub fn reject(&mut self, kind: ActionKind, err: SubmissionError) -> SubmissionError {
        self.begin(kind);
        self.fail(kind, &err);
        err
    }

    fn begin(&mut self, kind: ActionKind) {
        self.notice = None;
        self.pending = true;
        *self.result_mut(kind) = Some(TransactionResult::Pending);
    }

    fn require_credential(&self) -> Result<Address, SubmissionError> {
        self.gateway
            .signer()
            .ok_or(SubmissionError::MissingCredential)
    }

    async fn record(
        &self,
        sync: &RoundSynchronizer,
        participant: Address,
        amount: &str,
    ) -> Result<TxReceipt, SubmissionError> {
        let signer = self.require_credential()?;
        if !sync.outstanding().contains(&participant) {
            return Err(SubmissionError::NotEligible(participant));
        }
        let haul = HaulSubmission::parse(participant, amount)?;

        let tx = self
            .gateway
            .record_haul(haul.participant, haul.amount)
            .await?;
        info!(
            tx = %tx,
            participant = %participant,
            amount = %format_amount(haul.amount),
            signer = %signer,
            "Haul submitted, awaiting finality"
        );
        Ok(self.gateway.wait_for_finality(&tx).await?)
    }

    async fn hoist(&self, sync: &RoundSynchronizer) -> Result<TxReceipt, SubmissionError> {
        let signer = self.require_credential()?;
        if !sync.is_round_complete() {
            return Err(SubmissionError::RoundIncomplete);
        }

        let tx = self.gateway.advance_round().await?;
        info!(tx = %tx, signer = %signer, "Round advance submitted, awaiting finality");
        Ok(self.gateway.wait_for_finality(&tx).await?)
    }

    async fn finish(
        &mut self,
        kind: ActionKind,
        sync: &mut RoundSynchronizer,
        outcome: Result<TxReceipt, SubmissionError>,
    ) -> Result<TxReceipt, SubmissionError> {
        match outcome {
            Ok(receipt) => {
                info!(tx = %receipt.hash, action = ?kind, "Transaction final");
                *self.result_mut(kind) = Some(TransactionResult::Succeeded);
                self.notice = Some(Notice::Success(kind.success().to_string()));
                if let Err(err) = sync.refresh().await {
                    self.notice = Some(Notice::Error(err.to_string()));
                }
                self.pending = false;
                Ok(receipt)
            }
            Err(err) => {
                self.fail(kind, &err);
                Err(err)
            }
        }
    }

    fn fail(&mut self, kind: ActionKind, err: &SubmissionError) {
        warn!(action = ?kind, error = %err, "Transaction failed");
        *self.result_mut(kind) = Some(TransactionResult::Failed(err.to_string()));
        self.notice = Some(Notice::Error(format!("{}: {err}", kind.failure())));
        self.pending = false;
    }
}
