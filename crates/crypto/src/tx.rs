//! Legacy (EIP-155) contract-call transactions.

use lootledger_core::Address;
use rlp::RlpStream;

use crate::keys::SigningKeypair;
use crate::sign::sign_digest;
use crate::{keccak256, CryptoError};

/// An unsigned call to a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

/// RLP-encoded signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    pub hash: [u8; 32],
}

impl SignedTransaction {
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }

    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash))
    }
}

impl LegacyTransaction {
    fn append_common(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&minimal(&self.gas_price.to_be_bytes()));
        stream.append(&self.gas_limit);
        stream.append(&self.to.as_bytes().as_slice());
        stream.append(&minimal(&self.value.to_be_bytes()));
        stream.append(&self.data.as_slice());
    }

    /// Digest signed under EIP-155: fields plus `(chain_id, 0, 0)`.
    pub fn sighash(&self) -> [u8; 32] {
        let mut stream = RlpStream::new_list(9);
        self.append_common(&mut stream);
        stream.append(&self.chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        keccak256(&stream.out())
    }

    pub fn sign(&self, keypair: &SigningKeypair) -> Result<SignedTransaction, CryptoError> {
        let sig = sign_digest(keypair, &self.sighash())?;
        let v = self
            .chain_id
            .checked_mul(2)
            .and_then(|c| c.checked_add(35 + u64::from(sig.recovery_id)))
            .ok_or_else(|| CryptoError::SigningFailed(format!("chain id {} out of range", self.chain_id)))?;

        let mut stream = RlpStream::new_list(9);
        self.append_common(&mut stream);
        stream.append(&v);
        stream.append(&minimal(&sig.r));
        stream.append(&minimal(&sig.s));
        let raw = stream.out().to_vec();
        let hash = keccak256(&raw);
        Ok(SignedTransaction { raw, hash })
    }
}

/// Big-endian integer bytes without leading zeros, as RLP scalars require.
fn minimal(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}
