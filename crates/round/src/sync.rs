//! Round State Synchronizer: the only writer of the round and the
//! outstanding set.

use std::sync::Arc;

use lootledger_core::{Address, OutstandingSet, Participant, Round, RoundSnapshot};
use lootledger_gateway::{GatewayError, LedgerGateway};
use thiserror::Error;
use tracing::{debug, warn};

/// A read from the ledger failed. Prior state is kept.
#[derive(Error, Debug)]
#[error("Failed to fetch round info.")]
pub struct SyncError(#[from] pub GatewayError);

pub struct RoundSynchronizer {
    gateway: Arc<dyn LedgerGateway>,
    snapshot: RoundSnapshot,
    loaded: bool,
    selected: Option<Address>,
}

impl RoundSynchronizer {
    pub fn new(gateway: Arc<dyn LedgerGateway>) -> Self {
        Self {
            gateway,
            snapshot: RoundSnapshot::default(),
            loaded: false,
            selected: None,
        }
    }

    /// Read the round and the outstanding participants together and apply
    /// them as one pair. On failure nothing changes.
    pub async fn refresh(&mut self) -> Result<&RoundSnapshot, SyncError> {
        let gateway = &self.gateway;
        let (round, outstanding) = tokio::try_join!(
            gateway.get_round(),
            gateway.get_outstanding_participants()
        )
        .map_err(|e| {
            warn!(error = %e, "Round refresh failed");
            SyncError(e)
        })?;

        self.snapshot = RoundSnapshot {
            round,
            outstanding: OutstandingSet::new(outstanding),
        };
        self.loaded = true;
        self.selected = self.snapshot.outstanding.first().map(|p| p.address);

        debug!(
            round,
            outstanding = self.snapshot.outstanding.len(),
            "Round state refreshed"
        );
        Ok(&self.snapshot)
    }

    /// Last applied snapshot, `None` until a refresh has succeeded.
    pub fn snapshot(&self) -> Option<&RoundSnapshot> {
        self.loaded.then_some(&self.snapshot)
    }

    pub fn round(&self) -> Option<Round> {
        self.snapshot().map(|s| s.round)
    }

    /// Empty until loaded.
    pub fn outstanding(&self) -> &OutstandingSet {
        &self.snapshot.outstanding
    }

    /// Loaded and nobody left to report.
    pub fn is_round_complete(&self) -> bool {
        self.loaded && self.snapshot.is_complete()
    }

    pub fn selected(&self) -> Option<&Participant> {
        self.selected.and_then(|a| self.snapshot.outstanding.get(&a))
    }

    /// Select an outstanding participant. Returns false (and keeps the
    /// current selection) for anyone else.
    pub fn select(&mut self, address: Address) -> bool {
        if self.snapshot.outstanding.contains(&address) {
            self.selected = Some(address);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lootledger_gateway::MemoryLedger;

    fn crew() -> Vec<Participant> {
        vec![
            Participant::new(Address([0xa1; 20]), "Anne"),
            Participant::new(Address([0xb2; 20]), "Bart"),
        ]
    }

    #[tokio::test]
    async fn test_refresh_applies_pair_and_selects_first() {
        let ledger = Arc::new(MemoryLedger::new(3, crew()));
        let mut sync = RoundSynchronizer::new(ledger);
        assert!(sync.snapshot().is_none());
        assert!(!sync.is_round_complete());

        let snapshot = sync.refresh().await.unwrap();
        assert_eq!(snapshot.round, 3);
        assert_eq!(snapshot.outstanding.len(), 2);
        assert_eq!(sync.selected().unwrap().name, "Anne");
        assert_eq!(sync.round(), Some(3));
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let ledger = Arc::new(MemoryLedger::new(3, crew()));
        let mut sync = RoundSynchronizer::new(ledger);
        let first = sync.refresh().await.unwrap().clone();
        let second = sync.refresh().await.unwrap().clone();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failed_half_leaves_prior_state() {
        let ledger = Arc::new(MemoryLedger::new(3, crew()));
        let mut sync = RoundSynchronizer::new(ledger.clone());
        sync.refresh().await.unwrap();
        sync.select(Address([0xb2; 20]));

        ledger.fail_outstanding_reads(Some("timeout"));
        let err = sync.refresh().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch round info.");
        assert!(matches!(err.0, GatewayError::Unavailable(_)));

        assert_eq!(sync.round(), Some(3));
        assert_eq!(sync.outstanding().len(), 2);
        assert_eq!(sync.selected().unwrap().name, "Bart");
    }

    #[tokio::test]
    async fn test_select_only_outstanding() {
        let ledger = Arc::new(MemoryLedger::new(1, crew()));
        let mut sync = RoundSynchronizer::new(ledger);
        assert!(!sync.select(Address([0xa1; 20])));

        sync.refresh().await.unwrap();
        assert!(!sync.select(Address([0x99; 20])));
        assert!(sync.select(Address([0xb2; 20])));
        assert_eq!(sync.selected().unwrap().name, "Bart");
    }

    #[tokio::test]
    async fn test_empty_roster_is_complete_with_no_selection() {
        let ledger = Arc::new(MemoryLedger::new(7, vec![]));
        let mut sync = RoundSynchronizer::new(ledger);
        sync.refresh().await.unwrap();
        assert!(sync.is_round_complete());
        assert!(sync.selected().is_none());
    }
}
