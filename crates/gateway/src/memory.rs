//! In-process ledger with the contract's rules.
//!
//! Mutations are validated when submitted and applied at finality, so the
//! outstanding list only changes once a transaction is confirmed. Every call
//! that reaches a mutating endpoint is recorded.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lootledger_core::{Address, LootRecord, Participant, Round};
use tracing::info;

use crate::{GatewayError, LedgerGateway, RawArtifact, Result, TxHandle, TxReceipt};

/// The eight-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Record { participant: Address, amount: u128 },
    Advance,
}

#[derive(Debug)]
struct LedgerState {
    round: Round,
    roster: Vec<Participant>,
    reported: HashSet<Address>,
    totals: HashMap<Address, u128>,
    pending: HashMap<String, Mutation>,
    next_tx: u64,
    mutations: Vec<String>,
    reads: usize,
    signer: Option<Address>,
    chart: RawArtifact,
    read_failure: Option<String>,
    outstanding_failure: Option<String>,
    rejection: Option<String>,
    revert_at_finality: bool,
}

/// Ledger held in memory. Cheap to build per test.
#[derive(Debug)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    /// A ledger at `round` where nobody in `roster` has reported yet.
    pub fn new(round: Round, roster: Vec<Participant>) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                round,
                roster,
                reported: HashSet::new(),
                totals: HashMap::new(),
                pending: HashMap::new(),
                next_tx: 1,
                mutations: Vec::new(),
                reads: 0,
                signer: Some(Address([0xc0; 20])),
                chart: RawArtifact::Bytes(PNG_SIGNATURE.to_vec()),
                read_failure: None,
                outstanding_failure: None,
                rejection: None,
                revert_at_finality: false,
            }),
        }
    }

    pub fn with_signer(self, signer: Option<Address>) -> Self {
        self.lock().signer = signer;
        self
    }

    pub fn with_chart(self, chart: RawArtifact) -> Self {
        self.set_chart(chart);
        self
    }

    /// Mark `participant` as already reported with `total` base units.
    pub fn with_reported(self, participant: Address, total: u128) -> Self {
        {
            let mut state = self.lock();
            state.reported.insert(participant);
            state.totals.insert(participant, total);
        }
        self
    }

    pub fn set_chart(&self, chart: RawArtifact) {
        self.lock().chart = chart;
    }

    /// Fail every read with `reason` (`None` restores reads).
    pub fn fail_reads(&self, reason: Option<&str>) {
        self.lock().read_failure = reason.map(str::to_string);
    }

    /// Fail only the outstanding-participants read.
    pub fn fail_outstanding_reads(&self, reason: Option<&str>) {
        self.lock().outstanding_failure = reason.map(str::to_string);
    }

    /// Reject every mutation at submission with `reason`.
    pub fn reject_mutations(&self, reason: Option<&str>) {
        self.lock().rejection = reason.map(str::to_string);
    }

    /// Accept mutations but revert them at finality.
    pub fn revert_at_finality(&self, revert: bool) {
        self.lock().revert_at_finality = revert;
    }

    pub fn round(&self) -> Round {
        self.lock().round
    }

    /// Calls that reached a mutating endpoint, in order.
    pub fn mutations(&self) -> Vec<String> {
        self.lock().mutations.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().mutations.len()
    }

    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    pub fn total_of(&self, participant: &Address) -> u128 {
        self.lock().totals.get(participant).copied().unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> Result<MutexGuard<'_, LedgerState>> {
        let mut state = self.lock();
        state.reads += 1;
        if let Some(reason) = state.read_failure.clone() {
            return Err(GatewayError::Unavailable(reason));
        }
        Ok(state)
    }

    fn submit(&self, mutation: Mutation, description: String) -> Result<TxHandle> {
        let mut state = self.lock();
        state.mutations.push(description.clone());

        if state.signer.is_none() {
            return Err(GatewayError::MissingCredential);
        }
        if let Some(reason) = &state.rejection {
            return Err(GatewayError::Rejected(reason.clone()));
        }
        state.check(mutation)?;

        let hash = format!("0x{:064x}", state.next_tx);
        state.next_tx += 1;
        state.pending.insert(hash.clone(), mutation);
        info!(tx = %hash, "{description} submitted");
        Ok(TxHandle { hash })
    }
}

impl LedgerState {
    fn outstanding(&self) -> Vec<Participant> {
        self.roster
            .iter()
            .filter(|p| !self.reported.contains(&p.address))
            .cloned()
            .collect()
    }

    /// Contract preconditions, evaluated at submission and again at finality.
    fn check(&self, mutation: Mutation) -> Result<()> {
        match mutation {
            Mutation::Record { participant, .. } => {
                if !self.roster.iter().any(|p| p.address == participant) {
                    return Err(GatewayError::Rejected(format!("{participant} is not in the crew")));
                }
                if self.reported.contains(&participant) {
                    return Err(GatewayError::Rejected(format!(
                        "{participant} already reported this round"
                    )));
                }
            }
            Mutation::Advance => {
                if self.roster.iter().any(|p| !self.reported.contains(&p.address)) {
                    return Err(GatewayError::Rejected(
                        "not every pirate has reported".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::Record { participant, amount } => {
                self.reported.insert(participant);
                let total = self.totals.entry(participant).or_insert(0);
                *total = total.saturating_add(amount);
            }
            Mutation::Advance => {
                self.round += 1;
                self.reported.clear();
            }
        }
    }
}

#[async_trait::async_trait]
impl LedgerGateway for MemoryLedger {
    async fn get_round(&self) -> Result<Round> {
        Ok(self.read()?.round)
    }

    async fn get_outstanding_participants(&self) -> Result<Vec<Participant>> {
        let state = self.read()?;
        if let Some(reason) = &state.outstanding_failure {
            return Err(GatewayError::Unavailable(reason.clone()));
        }
        Ok(state.outstanding())
    }

    async fn record_haul(&self, participant: Address, amount: u128) -> Result<TxHandle> {
        self.submit(
            Mutation::Record { participant, amount },
            format!("recordHaul({participant}, {amount})"),
        )
    }

    async fn advance_round(&self) -> Result<TxHandle> {
        self.submit(Mutation::Advance, "hoistTheColors()".to_string())
    }

    async fn wait_for_finality(&self, tx: &TxHandle) -> Result<TxReceipt> {
        let mut state = self.lock();
        let mutation = state
            .pending
            .remove(&tx.hash)
            .ok_or_else(|| GatewayError::Rejected(format!("unknown transaction {tx}")))?;

        if state.revert_at_finality || state.check(mutation).is_err() {
            return Err(GatewayError::Reverted(tx.hash.clone()));
        }
        state.apply(mutation);
        info!(tx = %tx, round = state.round, "Transaction confirmed");
        Ok(TxReceipt {
            hash: tx.hash.clone(),
            block_number: None,
        })
    }

    async fn generate_chart_artifact(&self) -> Result<RawArtifact> {
        Ok(self.read()?.chart.clone())
    }

    async fn get_loot_totals(&self) -> Result<Vec<LootRecord>> {
        let state = self.read()?;
        Ok(state
            .roster
            .iter()
            .map(|p| LootRecord {
                name: p.name.clone(),
                participant: p.address,
                total: state.totals.get(&p.address).copied().unwrap_or(0),
            })
            .collect())
    }

    fn signer(&self) -> Option<Address> {
        self.lock().signer
    }
}
