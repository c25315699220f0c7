//! Lootledger Crypto
//!
//! secp256k1 signing credential, Keccak-256 and legacy (EIP-155)
//! transaction encoding for the ledger contract.

pub mod keys;
pub mod sign;
pub mod tx;

pub use keys::{address_from_public_key, SigningKeypair};
pub use sign::{recover_address, sign_digest, RecoverableSignature};
pub use tx::{LegacyTransaction, SignedTransaction};

use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid secret key")]
    InvalidKey,
    #[error("Invalid key encoding: {0}")]
    InvalidEncoding(String),
    #[error("Signing failed: {0}")]
    SigningFailed(String),
    #[error("Signature recovery failed")]
    RecoveryFailed,
}

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut out = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut out);
    out
}
