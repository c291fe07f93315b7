use mogul_org::{AssetError, CurveError, OrgError};
use mogul_types::U256;
use thiserror::Error;

/// Errors that can occur in round and vote operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VotingError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance { required: U256, available: U256 },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("Already voted for proposal {proposal} in round {round}")]
    AlreadyVoted { round: u64, proposal: usize },

    #[error("Voting is closed for round {0}")]
    VotingClosed(u64),

    #[error("Voting period of round {0} has not ended")]
    VotingNotClosed(u64),

    #[error("Round {0} already finalized")]
    AlreadyFinalized(u64),

    #[error("Round not found: {0}")]
    RoundNotFound(u64),

    #[error("Proposal {index} not found in round {round}")]
    ProposalNotFound { round: u64, index: usize },

    #[error("Token ledger is locked by an in-flight movement")]
    Reentrancy,

    #[error("Curve error: {0}")]
    Curve(#[from] CurveError),

    #[error("Stable asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Organisation error: {0}")]
    Org(#[from] OrgError),

    #[error("Snapshot invalid: {0}")]
    Snapshot(String),
}
