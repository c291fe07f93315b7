//! Mogul Types - values shared by the ledger and voting crates.
//!
//! - [`Address`]: 20-byte account id, bech32m `mgl1...` text form
//! - [`Hash`]: blake3 digest
//! - [`U256`]: 256-bit amount with 18-decimal fixed-point helpers
//! - [`Ed25519PublicKey`] / [`Ed25519Signature`]: byte wrappers for proofs
//!
//! With the default `serde` feature every type serializes as a string.

#[macro_use]
mod bytes;

pub mod address;
pub mod error;
pub mod hash;
pub mod keys;
pub mod u256;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use error::TypesError;
pub use hash::Hash;
pub use keys::{Ed25519PublicKey, Ed25519Signature};
pub use u256::U256;

/// Seconds since the unix epoch, as supplied by the host clock.
pub type Timestamp = u64;
