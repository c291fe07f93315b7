//! Mogul Crypto - keys and whitelist proofs.
//!
//! Admins and whitelisters hold ed25519 [`Keypair`]s. A [`WhitelistProof`]
//! is their signature over a domain-separated blake3 hash of an investor
//! address, presented once with the investor's first investment.

pub mod error;
pub mod keys;
pub mod proof;

pub use error::CryptoError;
pub use keys::{verify, Keypair};
pub use proof::{sign_whitelist, verify_whitelist, whitelist_message, WhitelistProof};
