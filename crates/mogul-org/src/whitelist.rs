//! Whitelist authority.
//!
//! Membership gates investment and token transfers. An investor that is not
//! yet listed can present a [`WhitelistProof`] signed by the admin or the
//! whitelister; [`authorize`] folds both paths into one capability check.

use mogul_crypto::{verify_whitelist, WhitelistProof};
use mogul_types::Address;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Set of approved holders and investors.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Whitelist {
    entries: BTreeSet<Address>,
}

/// Shared read handle. Only the organisation writes through it.
pub type SharedWhitelist = Arc<RwLock<Whitelist>>;

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = Address>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn contains(&self, addr: &Address) -> bool {
        self.entries.contains(addr)
    }

    /// Returns whether the entry changed.
    pub fn set(&mut self, addr: Address, allowed: bool) -> bool {
        if allowed {
            self.entries.insert(addr)
        } else {
            self.entries.remove(&addr)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Address> {
        self.entries.iter()
    }
}

/// Outcome of the investor capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    /// Already on the whitelist.
    Whitelisted,
    /// Not listed, but carries a valid proof; becomes listed on success.
    ProofValid { signer: Address },
    Rejected,
}

impl Authorization {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Authorization::Rejected)
    }
}

/// Identity/signature verification collaborator.
pub trait ProofVerifier: Send + Sync {
    /// Whether `signer` produced `proof` over the canonical hash of `investor`.
    fn verify(&self, signer: &Address, investor: &Address, proof: &WhitelistProof) -> bool;
}

/// Ed25519 verification of [`WhitelistProof`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519ProofVerifier;

impl ProofVerifier for Ed25519ProofVerifier {
    fn verify(&self, signer: &Address, investor: &Address, proof: &WhitelistProof) -> bool {
        match verify_whitelist(signer, investor, proof) {
            Ok(()) => true,
            Err(e) => {
                debug!(signer = %signer, investor = %investor, error = %e, "Whitelist proof rejected");
                false
            }
        }
    }
}

/// Decide whether `investor` may invest.
///
/// `signers` are the identities allowed to issue proofs (admin and whitelister).
pub fn authorize(
    whitelist: &Whitelist,
    verifier: &dyn ProofVerifier,
    investor: &Address,
    proof: Option<&WhitelistProof>,
    signers: &[Address],
) -> Authorization {
    if whitelist.contains(investor) {
        return Authorization::Whitelisted;
    }
    let Some(proof) = proof else {
        return Authorization::Rejected;
    };
    signers
        .iter()
        .find(|signer| verifier.verify(signer, investor, proof))
        .map(|signer| Authorization::ProofValid { signer: *signer })
        .unwrap_or(Authorization::Rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mogul_crypto::{sign_whitelist, Keypair};

    fn investor() -> Address {
        Address::from_bytes([5u8; 20])
    }

    #[test]
    fn test_set_and_contains() {
        let mut list = Whitelist::new();
        assert!(list.set(investor(), true));
        assert!(!list.set(investor(), true));
        assert!(list.contains(&investor()));
        assert_eq!(list.len(), 1);
        assert!(list.set(investor(), false));
        assert!(list.is_empty());
    }

    #[test]
    fn test_listed_investor_needs_no_proof() {
        let list = Whitelist::from_entries([investor()]);
        let auth = authorize(&list, &Ed25519ProofVerifier, &investor(), None, &[]);
        assert_eq!(auth, Authorization::Whitelisted);
    }

    #[test]
    fn test_missing_proof_rejected() {
        let auth = authorize(&Whitelist::new(), &Ed25519ProofVerifier, &investor(), None, &[]);
        assert_eq!(auth, Authorization::Rejected);
        assert!(!auth.is_allowed());
    }

    #[test]
    fn test_proof_from_whitelister_accepted() {
        let admin = Keypair::from_seed(&[1u8; 32]);
        let whitelister = Keypair::from_seed(&[2u8; 32]);
        let proof = sign_whitelist(&whitelister, &investor());
        let auth = authorize(
            &Whitelist::new(),
            &Ed25519ProofVerifier,
            &investor(),
            Some(&proof),
            &[admin.address(), whitelister.address()],
        );
        assert_eq!(auth, Authorization::ProofValid { signer: whitelister.address() });
    }

    #[test]
    fn test_proof_from_outsider_rejected() {
        let admin = Keypair::from_seed(&[1u8; 32]);
        let outsider = Keypair::from_seed(&[3u8; 32]);
        let proof = sign_whitelist(&outsider, &investor());
        let auth = authorize(
            &Whitelist::new(),
            &Ed25519ProofVerifier,
            &investor(),
            Some(&proof),
            &[admin.address()],
        );
        assert_eq!(auth, Authorization::Rejected);
    }
}
