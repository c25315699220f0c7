//! Solidity bindings for the ledger contract.
//!
//! Calls are declared with `sol!`; return data is decoded by
//! `alloy-sol-types` with validation on, then mapped onto core types.

use alloy_primitives::{Address as SolAddress, U256};
use alloy_sol_types::{sol, SolCall};
use lootledger_core::{Address, LootRecord, Participant, Round};
use thiserror::Error;

sol! {
    struct LootEntry {
        string name;
        address pirate;
        uint256 total;
    }

    function round() external view returns (uint256);
    function piratesYetToReport() external view returns (address[] memory, string[] memory);
    function recordHaul(address pirate, uint256 amount) external;
    function hoistTheColors() external;
    function generateChart() external view returns (bytes memory);
    function getLootTotals() external view returns (LootEntry[] memory);
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("Cannot decode return data: {0}")]
    Decode(String),
    #[error("Value does not fit in {0} bits")]
    Overflow(u32),
    #[error("Mismatched array lengths: {addresses} addresses, {names} names")]
    LengthMismatch { addresses: usize, names: usize },
}

impl From<alloy_sol_types::Error> for AbiError {
    fn from(e: alloy_sol_types::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AbiError>;

fn to_sol(address: Address) -> SolAddress {
    SolAddress::new(address.0)
}

fn from_sol(address: SolAddress) -> Address {
    Address(address.0 .0)
}

fn to_u128(value: U256) -> Result<u128> {
    u128::try_from(value).map_err(|_| AbiError::Overflow(128))
}

pub fn round_call() -> Vec<u8> {
    roundCall {}.abi_encode()
}

pub fn pirates_yet_to_report_call() -> Vec<u8> {
    piratesYetToReportCall {}.abi_encode()
}

pub fn record_haul_call(participant: Address, amount: u128) -> Vec<u8> {
    recordHaulCall {
        pirate: to_sol(participant),
        amount: U256::from(amount),
    }
    .abi_encode()
}

pub fn hoist_the_colors_call() -> Vec<u8> {
    hoistTheColorsCall {}.abi_encode()
}

pub fn generate_chart_call() -> Vec<u8> {
    generateChartCall {}.abi_encode()
}

pub fn get_loot_totals_call() -> Vec<u8> {
    getLootTotalsCall {}.abi_encode()
}

pub fn decode_round(data: &[u8]) -> Result<Round> {
    let ret = roundCall::abi_decode_returns(data, true)?;
    u64::try_from(ret._0).map_err(|_| AbiError::Overflow(64))
}

/// Outstanding participants; the two arrays pair up by index.
pub fn decode_participants(data: &[u8]) -> Result<Vec<Participant>> {
    let ret = piratesYetToReportCall::abi_decode_returns(data, true)?;
    let (addresses, names) = (ret._0, ret._1);
    if addresses.len() != names.len() {
        return Err(AbiError::LengthMismatch {
            addresses: addresses.len(),
            names: names.len(),
        });
    }
    Ok(addresses
        .into_iter()
        .zip(names)
        .map(|(address, name)| Participant::new(from_sol(address), name))
        .collect())
}

pub fn decode_chart(data: &[u8]) -> Result<Vec<u8>> {
    let ret = generateChartCall::abi_decode_returns(data, true)?;
    Ok(ret._0.to_vec())
}

pub fn decode_loot_totals(data: &[u8]) -> Result<Vec<LootRecord>> {
    let ret = getLootTotalsCall::abi_decode_returns(data, true)?;
    ret._0
        .into_iter()
        .map(|entry| {
            Ok(LootRecord {
                name: entry.name,
                participant: from_sol(entry.pirate),
                total: to_u128(entry.total)?,
            })
        })
        .collect()
}
