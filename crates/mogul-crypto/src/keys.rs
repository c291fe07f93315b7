//! Ed25519 keys held by the organisation admin and whitelister.

use crate::error::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use mogul_types::{Address, Ed25519PublicKey, Ed25519Signature};
use rand::rngs::OsRng;
use std::fmt;
use zeroize::Zeroizing;

/// Signing key plus the address it controls. ed25519-dalek wipes the
/// secret on drop.
pub struct Keypair(SigningKey);

impl Keypair {
    pub fn generate() -> Self {
        Self(SigningKey::generate(&mut OsRng))
    }

    /// Deterministic keypair, mostly for fixtures.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self(SigningKey::from_bytes(seed))
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey::from_bytes(self.0.verifying_key().to_bytes())
    }

    pub fn address(&self) -> Address {
        self.public_key().to_address()
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature::from_bytes(self.0.sign(message).to_bytes())
    }

    /// Secret seed, wiped when the returned buffer drops.
    pub fn seed(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.0.to_bytes())
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.seed())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Keypair").field(&self.address()).finish()
    }
}

/// Check `signature` over `message` against `public_key`.
pub fn verify(
    public_key: &Ed25519PublicKey,
    message: &[u8],
    signature: &Ed25519Signature,
) -> Result<(), CryptoError> {
    let key = VerifyingKey::from_bytes(public_key.as_bytes()).map_err(|_| CryptoError::InvalidPublicKey)?;
    let signature = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    key.verify(message, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_keys_are_stable() {
        let a = Keypair::from_seed(&[42u8; 32]);
        let b = Keypair::from_seed(&[42u8; 32]);
        assert_eq!(a.address(), b.address());
        assert_eq!(*a.seed(), [42u8; 32]);
        assert_ne!(a.address(), Keypair::from_seed(&[43u8; 32]).address());
    }

    #[test]
    fn test_generated_key_signs() {
        let key = Keypair::generate();
        let signature = key.sign(b"round 1");
        assert!(!signature.is_zero());
        assert_eq!(verify(&key.public_key(), b"round 1", &signature), Ok(()));
        assert_eq!(
            verify(&key.public_key(), b"round 2", &signature),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn test_signature_tied_to_key() {
        let admin = Keypair::from_seed(&[1u8; 32]);
        let other = Keypair::from_seed(&[2u8; 32]);
        let signature = admin.sign(b"payload");
        assert!(verify(&other.public_key(), b"payload", &signature).is_err());
    }

    #[test]
    fn test_clone_keeps_identity() {
        let key = Keypair::generate();
        let copy = key.clone();
        assert_eq!(copy.public_key(), key.public_key());
        assert_eq!(format!("{:?}", copy), format!("Keypair({:?})", key.address()));
    }
}
