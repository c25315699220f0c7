use std::fmt;

use k256::ecdsa::{SigningKey, VerifyingKey};
use lootledger_core::Address;
use rand::rngs::OsRng;

use crate::{keccak256, CryptoError};

/// The operator's signing credential.
#[derive(Clone)]
pub struct SigningKeypair {
    pub(crate) signing_key: SigningKey,
    address: Address,
}

impl SigningKeypair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    pub fn from_secret_bytes(secret: &[u8; 32]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(secret).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Parse a 32-byte secret written as hex, with or without `0x`.
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        let text = text.trim();
        let digits = text.strip_prefix("0x").unwrap_or(text);
        let bytes = hex::decode(digits).map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        let secret: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidEncoding(format!("expected 32 bytes, got {}", bytes.len())))?;
        Self::from_secret_bytes(&secret)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_from_public_key(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }

    /// Uncompressed SEC1 public key (65 bytes, `0x04` prefix).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// Ledger account controlled by this keypair.
    pub fn address(&self) -> Address {
        self.address
    }
}

impl fmt::Debug for SigningKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeypair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Last 20 bytes of the Keccak-256 of the uncompressed public key.
pub fn address_from_public_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Address(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (first account of the default local node mnemonic).
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_known_address() {
        let kp = SigningKeypair::from_hex(DEV_KEY).unwrap();
        assert_eq!(
            kp.address().to_string(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_secret_roundtrip() {
        let kp = SigningKeypair::generate();
        let again = SigningKeypair::from_secret_bytes(&kp.secret_key_bytes()).unwrap();
        assert_eq!(kp.address(), again.address());
        assert_eq!(kp.public_key_bytes().len(), 65);
    }

    #[test]
    fn test_rejects_bad_hex() {
        assert!(matches!(
            SigningKeypair::from_hex("0x1234"),
            Err(CryptoError::InvalidEncoding(_))
        ));
        assert!(matches!(
            SigningKeypair::from_secret_bytes(&[0u8; 32]),
            Err(CryptoError::InvalidKey)
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let kp = SigningKeypair::from_hex(DEV_KEY).unwrap();
        let dbg = format!("{:?}", kp);
        assert!(!dbg.contains("ac0974"));
    }
}
