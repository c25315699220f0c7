//! Lootledger Gateway
//!
//! The boundary to the ledger: the [`LedgerGateway`] trait, an
//! [`EvmGateway`] that talks JSON-RPC to the ledger contract, and a
//! [`MemoryLedger`] with the same contract rules for tests and offline use.

pub mod abi;
pub mod evm;
pub mod memory;
pub mod protocol;
pub mod rpc;

pub use abi::AbiError;
pub use evm::EvmGateway;
pub use memory::MemoryLedger;
pub use rpc::{RpcClient, RpcError};

use std::fmt;

use lootledger_core::{Address, LootRecord, Participant, Round};
use lootledger_crypto::CryptoError;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),
    #[error("Malformed ledger response: {0}")]
    Abi(#[from] AbiError),
    #[error("No signing credential configured")]
    MissingCredential,
    #[error("No ledger contract address configured")]
    MissingContract,
    #[error("Signing failed: {0}")]
    Signing(#[from] CryptoError),
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    #[error("Transaction {0} reverted")]
    Reverted(String),
    #[error("Timed out after {secs}s waiting for transaction {hash}")]
    Timeout { hash: String, secs: u64 },
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Identifies a submitted mutating transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxHandle {
    pub hash: String,
}

impl TxHandle {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

/// A transaction the ledger has irreversibly accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: String,
    pub block_number: Option<u64>,
}

/// Chart payload exactly as the ledger handed it over. The wire shape is not
/// stable, so nothing here assumes one is canonical.
#[derive(Debug, Clone, PartialEq)]
pub enum RawArtifact {
    /// Text, normally `0x`-prefixed hex.
    Text(String),
    Bytes(Vec<u8>),
    /// Generic array whose elements should be byte values.
    Array(Vec<Value>),
    /// Anything else.
    Other(Value),
}

impl RawArtifact {
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
            Self::Other(_) => "other",
        }
    }
}

impl From<Value> for RawArtifact {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::Array(items),
            other => Self::Other(other),
        }
    }
}

impl From<Vec<u8>> for RawArtifact {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Operations the ledger exposes.
///
/// Mutations return as soon as the ledger accepts the transaction for
/// inclusion; callers await finality separately with
/// [`wait_for_finality`](LedgerGateway::wait_for_finality).
#[async_trait::async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn get_round(&self) -> Result<Round>;

    /// Participants that have not reported this round, in ledger order.
    async fn get_outstanding_participants(&self) -> Result<Vec<Participant>>;

    async fn record_haul(&self, participant: Address, amount: u128) -> Result<TxHandle>;

    async fn advance_round(&self) -> Result<TxHandle>;

    /// Block until the transaction is final. The gateway owns the timeout.
    async fn wait_for_finality(&self, tx: &TxHandle) -> Result<TxReceipt>;

    async fn generate_chart_artifact(&self) -> Result<RawArtifact>;

    async fn get_loot_totals(&self) -> Result<Vec<LootRecord>>;

    /// Address that signs mutations, if a credential is configured.
    fn signer(&self) -> Option<Address>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_artifact_from_json() {
        assert_eq!(
            RawArtifact::from(json!("0x890102")),
            RawArtifact::Text("0x890102".into())
        );
        assert_eq!(
            RawArtifact::from(json!([137, 1, 2])),
            RawArtifact::Array(vec![json!(137), json!(1), json!(2)])
        );
        assert_eq!(RawArtifact::from(json!({"a": 1})).shape(), "other");
        assert_eq!(RawArtifact::from(vec![0x89u8]).shape(), "bytes");
    }

    #[test]
    fn test_error_messages() {
        let err = GatewayError::Timeout {
            hash: "0xabc".into(),
            secs: 120,
        };
        assert_eq!(err.to_string(), "Timed out after 120s waiting for transaction 0xabc");
        assert_eq!(
            GatewayError::MissingCredential.to_string(),
            "No signing credential configured"
        );
    }
}
