//! Mogul Org - the continuous organisation ledger.
//!
//! Investors exchange a stable asset for the governance token along a
//! bonding curve. The crate holds:
//! - Curve math for buys, sells, the close-out penalty and vote weights
//! - The reserve ledger state machine (unlock, invest, sell, dividends, close)
//! - The whitelist authority and its signed-proof path
//! - The governance token ledger with its movement-notifier registry
//! - The investor reward ledger
//! - Collaborator seams: stable asset, proof verifier, clock

pub mod asset;
pub mod clock;
pub mod config;
pub mod curve;
pub mod error;
pub mod organisation;
pub mod reward;
pub mod telemetry;
pub mod token;
pub mod whitelist;

pub use asset::{InMemoryStableAsset, SharedAsset, StableAsset};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::OrgConfig;
pub use curve::CurveVersion;
pub use error::{AssetError, CurveError, OrgError};
pub use organisation::{
    CloseReceipt, DividendReceipt, InvestReceipt, OrgState, Organisation, OrganisationSnapshot,
    SellReceipt, UnlockReceipt,
};
pub use reward::{RewardSnapshot, RewardToken, SharedReward};
pub use token::{
    GovernanceToken, Movement, MovementKind, MovementNotifier, NotifierHandle, SharedToken,
    TokenSnapshot,
};
pub use whitelist::{Authorization, Ed25519ProofVerifier, ProofVerifier, SharedWhitelist, Whitelist};

/// Stable-asset account holding the organisation reserve.
pub fn organisation_account() -> mogul_types::Address {
    mogul_types::Address::for_account("organisation")
}

/// Identifier of the governance token ledger carried by every [`Movement`].
pub fn token_ledger_account() -> mogul_types::Address {
    mogul_types::Address::for_account("token")
}
