//! Ed25519 key and signature wrappers carried inside whitelist proofs.
//!
//! These are plain byte containers; signing and verification live in
//! `mogul-crypto`.

use crate::Address;
use std::fmt;

fixed_bytes!(
    /// Ed25519 verifying key.
    Ed25519PublicKey,
    32
);
hex_text!(Ed25519PublicKey);

fixed_bytes!(
    /// Detached Ed25519 signature.
    Ed25519Signature,
    64
);
hex_text!(Ed25519Signature);

impl Ed25519PublicKey {
    /// Address this key controls.
    pub fn to_address(&self) -> Address {
        Address::from_public_key(&self.0)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519PublicKey({})", self.to_address())
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Signature(0x{}..)", hex::encode(&self.0[..6]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypesError;

    #[test]
    fn test_signature_length_checked() {
        assert!(Ed25519Signature::from_slice(&[1u8; 64]).is_ok());
        assert_eq!(
            Ed25519Signature::from_slice(&[1u8; 10]),
            Err(TypesError::InvalidLength {
                kind: "Ed25519Signature",
                expected: 64,
                actual: 10
            })
        );
    }

    #[test]
    fn test_key_derives_address() {
        let key = Ed25519PublicKey::from_bytes([7u8; 32]);
        assert_eq!(key.to_address(), Address::from_public_key(&[7u8; 32]));
        assert!(format!("{:?}", key).contains("mgl1"));
    }

    #[test]
    fn test_signature_text_roundtrip() {
        let sig = Ed25519Signature::from_bytes([0xcd; 64]);
        assert_eq!(sig.to_string().parse::<Ed25519Signature>().unwrap(), sig);
        assert!(Ed25519Signature::default().is_zero());
    }
}
