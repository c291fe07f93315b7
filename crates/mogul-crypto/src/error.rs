use mogul_types::Address;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CryptoError {
    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Proof key belongs to {actual}, expected {expected}")]
    SignerMismatch { expected: Address, actual: Address },
}
