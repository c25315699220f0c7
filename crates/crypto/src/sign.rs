use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use lootledger_core::Address;

use crate::keys::{address_from_public_key, SigningKeypair};
use crate::CryptoError;

/// An ECDSA signature split into its transaction fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    /// Recovery id (0 or 1).
    pub recovery_id: u8,
}

/// Sign a 32-byte digest without re-hashing it.
pub fn sign_digest(keypair: &SigningKeypair, digest: &[u8; 32]) -> Result<RecoverableSignature, CryptoError> {
    let (signature, recovery_id) = keypair
        .signing_key
        .sign_prehash_recoverable(digest)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    let (r, s) = signature.split_bytes();
    Ok(RecoverableSignature {
        r: r.into(),
        s: s.into(),
        recovery_id: recovery_id.to_byte(),
    })
}

/// Recover the signer's address from a digest and signature.
pub fn recover_address(digest: &[u8; 32], sig: &RecoverableSignature) -> Result<Address, CryptoError> {
    let signature =
        Signature::from_scalars(sig.r, sig.s).map_err(|_| CryptoError::RecoveryFailed)?;
    let recovery_id = RecoveryId::from_byte(sig.recovery_id).ok_or(CryptoError::RecoveryFailed)?;
    let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    Ok(address_from_public_key(&key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keccak256;

    #[test]
    fn test_sign_and_recover() {
        let keypair = SigningKeypair::generate();
        let digest = keccak256(b"Hoist the colours");

        let sig = sign_digest(&keypair, &digest).unwrap();
        assert!(sig.recovery_id <= 1);
        assert_eq!(recover_address(&digest, &sig).unwrap(), keypair.address());
    }

    #[test]
    fn test_wrong_digest_recovers_other_address() {
        let keypair = SigningKeypair::generate();
        let sig = sign_digest(&keypair, &keccak256(b"one")).unwrap();

        let recovered = recover_address(&keccak256(b"two"), &sig);
        assert!(recovered.map(|a| a != keypair.address()).unwrap_or(true));
    }
}
