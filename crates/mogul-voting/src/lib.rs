//! Mogul Voting - funding rounds decided by governance-token holders.
//!
//! Each round escrows the largest requested amount from the admin, collects
//! votes weighted by `isqrt(balance * 10)`, and pays only the highest-rated
//! proposal. The manager registers itself as a movement notifier on the
//! token ledger so that a holder who moves tokens mid-round loses their vote.

pub mod error;
pub mod rounds;
pub mod voting;

pub use error::VotingError;
pub use rounds::{Proposal, ProposalSpec, Round, RoundInfo, RoundStatus, Vote};
pub use voting::{CancelReceipt, FinalizeReceipt, VoteReconciler, VotingManager, VotingSnapshot};

/// Stable-asset account holding round escrows.
pub fn voting_escrow_account() -> mogul_types::Address {
    mogul_types::Address::for_account("voting")
}
