//! Lootledger Core
//!
//! Domain types shared by every Lootledger crate: participants, rounds,
//! the outstanding set, haul submissions and transaction feedback.

pub mod address;
pub mod amount;

pub use address::{Address, AddressError};
pub use amount::{format_amount, parse_amount, to_display_units, AmountError, UNIT};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reporting period index. Advanced only by an explicit operator action.
pub type Round = u64;

/// A crew member who reports hauls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub address: Address,
    pub name: String,
}

impl Participant {
    pub fn new(address: Address, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address.short())
    }
}

/// Participants that have not reported a haul in the current round,
/// in ledger order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingSet(Vec<Participant>);

impl OutstandingSet {
    pub fn new(participants: Vec<Participant>) -> Self {
        Self(participants)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.get(address).is_some()
    }

    pub fn get(&self, address: &Address) -> Option<&Participant> {
        self.0.iter().find(|p| &p.address == address)
    }

    pub fn first(&self) -> Option<&Participant> {
        self.0.first()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Participant> {
        self.0.iter()
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.0.iter().map(|p| p.address).collect()
    }
}

impl<'a> IntoIterator for &'a OutstandingSet {
    type Item = &'a Participant;
    type IntoIter = std::slice::Iter<'a, Participant>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Round number and outstanding set as read together from the ledger.
/// Always replaced as a pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round: Round,
    pub outstanding: OutstandingSet,
}

impl RoundSnapshot {
    /// Every participant has reported for this round.
    pub fn is_complete(&self) -> bool {
        self.outstanding.is_empty()
    }
}

/// A haul waiting to be recorded on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaulSubmission {
    pub participant: Address,
    /// Amount in base units (10^18 per whole unit).
    pub amount: u128,
}

impl HaulSubmission {
    /// Build a submission from user text, validating the amount.
    pub fn parse(participant: Address, amount: &str) -> Result<Self, AmountError> {
        Ok(Self {
            participant,
            amount: parse_amount(amount)?,
        })
    }
}

/// Cumulative loot for one participant, as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootRecord {
    pub name: String,
    pub participant: Address,
    /// Total in base units.
    pub total: u128,
}

/// Lifecycle of one mutating action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionResult {
    Pending,
    Succeeded,
    Failed(String),
}

impl TransactionResult {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// The single user-visible message slot. A new notice replaces the old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Self::Success(m) | Self::Error(m) => m,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}
