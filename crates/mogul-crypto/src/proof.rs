//! One-shot whitelist proofs.
//!
//! An admin or whitelister signs the canonical hash of an investor address
//! off-ledger. The investor submits the proof with their first investment
//! and is whitelisted permanently once it verifies.

use crate::error::CryptoError;
use crate::keys::{verify, Keypair};
use mogul_types::{Address, Ed25519PublicKey, Ed25519Signature, Hash};

const WHITELIST_DOMAIN: &str = "mogul:whitelist:v1";

/// Signature over [`whitelist_message`] plus the key that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WhitelistProof {
    pub public_key: Ed25519PublicKey,
    pub signature: Ed25519Signature,
}

/// Canonical message a whitelist proof signs for `investor`.
pub fn whitelist_message(investor: &Address) -> Hash {
    Hash::compute_multi(&[WHITELIST_DOMAIN.as_bytes(), investor.as_bytes()])
}

/// Produce a proof that `signer` approves `investor`.
pub fn sign_whitelist(signer: &Keypair, investor: &Address) -> WhitelistProof {
    let message = whitelist_message(investor);
    WhitelistProof {
        public_key: signer.public_key(),
        signature: signer.sign(message.as_bytes()),
    }
}

/// Check that `proof` was produced by the key behind `signer` for `investor`.
pub fn verify_whitelist(
    signer: &Address,
    investor: &Address,
    proof: &WhitelistProof,
) -> Result<(), CryptoError> {
    let derived = proof.public_key.to_address();
    if &derived != signer {
        return Err(CryptoError::SignerMismatch {
            expected: *signer,
            actual: derived,
        });
    }
    let message = whitelist_message(investor);
    verify(&proof.public_key, message.as_bytes(), &proof.signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn investor() -> Address {
        Address::from_bytes([9u8; 20])
    }

    #[test]
    fn test_valid_proof_verifies() {
        let admin = Keypair::from_seed(&[1u8; 32]);
        let proof = sign_whitelist(&admin, &investor());
        assert!(verify_whitelist(&admin.address(), &investor(), &proof).is_ok());
    }

    #[test]
    fn test_proof_bound_to_investor() {
        let admin = Keypair::from_seed(&[1u8; 32]);
        let proof = sign_whitelist(&admin, &investor());
        let other = Address::from_bytes([8u8; 20]);
        assert_eq!(
            verify_whitelist(&admin.address(), &other, &proof),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn test_proof_from_wrong_signer_rejected() {
        let admin = Keypair::from_seed(&[1u8; 32]);
        let stranger = Keypair::from_seed(&[2u8; 32]);
        let proof = sign_whitelist(&stranger, &investor());
        assert!(matches!(
            verify_whitelist(&admin.address(), &investor(), &proof),
            Err(CryptoError::SignerMismatch { .. })
        ));
    }

    #[test]
    fn test_forged_key_substitution_rejected() {
        // Claims the admin's key but carries a stranger's signature.
        let admin = Keypair::from_seed(&[1u8; 32]);
        let stranger = Keypair::from_seed(&[2u8; 32]);
        let forged = WhitelistProof {
            public_key: admin.public_key(),
            signature: sign_whitelist(&stranger, &investor()).signature,
        };
        assert!(verify_whitelist(&admin.address(), &investor(), &forged).is_err());
    }

    #[test]
    fn test_message_is_domain_separated() {
        assert_ne!(whitelist_message(&investor()), Hash::compute(investor().as_bytes()));
    }

    proptest::proptest! {
        #[test]
        fn prop_proof_binds_exact_investor(
            seed in proptest::array::uniform32(1u8..),
            a in proptest::array::uniform20(0u8..),
            b in proptest::array::uniform20(0u8..),
        ) {
            let signer = Keypair::from_seed(&seed);
            let proof = sign_whitelist(&signer, &Address::from_bytes(a));
            proptest::prop_assert!(verify_whitelist(&signer.address(), &Address::from_bytes(a), &proof).is_ok());
            if a != b {
                proptest::prop_assert!(verify_whitelist(&signer.address(), &Address::from_bytes(b), &proof).is_err());
            }
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_proof_json_roundtrip() {
        let admin = Keypair::from_seed(&[3u8; 32]);
        let proof = sign_whitelist(&admin, &investor());
        let json = serde_json::to_string(&proof).unwrap();
        let back: WhitelistProof = serde_json::from_str(&json).unwrap();
        assert_eq!(back, proof);
    }
}
