use mogul_types::{Address, U256};
use thiserror::Error;

/// Curve math failures. Overflow is reported, never wrapped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CurveError {
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("Division by zero in {0}")]
    DivisionByZero(&'static str),

    #[error("Burn amount {burn} exceeds supply {supply}")]
    BurnExceedsSupply { burn: U256, supply: U256 },

    #[error("Ratio {0}% exceeds 100%")]
    InvalidRatio(u8),
}

/// Failures reported by a stable-asset collaborator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssetError {
    #[error("Insufficient balance for {owner}: required {required}, available {available}")]
    InsufficientBalance {
        owner: Address,
        required: U256,
        available: U256,
    },

    #[error("Insufficient allowance from {owner} to {spender}: required {required}, available {available}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        required: U256,
        available: U256,
    },

    #[error("Balance overflow for {0}")]
    Overflow(Address),
}

/// Errors raised by the reserve ledger, whitelist and governance token.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrgError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Address not whitelisted: {0}")]
    NotWhitelisted(Address),

    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance { required: U256, available: U256 },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Movement rejected by notifier {notifier}: {reason}")]
    NotifierRejected { notifier: Address, reason: String },

    #[error("Notifier already registered: {0}")]
    DuplicateNotifier(Address),

    #[error("Unknown notifier handle: {0}")]
    UnknownNotifier(u64),

    #[error("Curve error: {0}")]
    Curve(#[from] CurveError),

    #[error("Stable asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Snapshot invalid: {0}")]
    Snapshot(String),
}

pub type OrgResult<T> = Result<T, OrgError>;
