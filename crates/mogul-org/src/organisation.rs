//! Reserve ledger.
//!
//! Lifecycle: `Uninitialized -> Unlocked -> Closed`, each transition exactly
//! once. Every operation validates all of its preconditions (state, role,
//! allowances, balances, curve math, notifier vetoes) before its first
//! mutation, so a rejected call leaves no trace.

use crate::asset::{SharedAsset, StableAsset};
use crate::config::OrgConfig;
use crate::curve;
use crate::error::{CurveError, OrgError, OrgResult};
use crate::reward::{RewardSnapshot, RewardToken, SharedReward};
use crate::token::{GovernanceToken, SharedToken, TokenSnapshot};
use crate::whitelist::{self, Authorization, Ed25519ProofVerifier, ProofVerifier, SharedWhitelist, Whitelist};
use crate::{organisation_account, token_ledger_account};
use mogul_crypto::WhitelistProof;
use mogul_types::{Address, U256};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Organisation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrgState {
    Uninitialized,
    Unlocked,
    Closed,
}

impl fmt::Display for OrgState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrgState::Uninitialized => "uninitialized",
            OrgState::Unlocked => "unlocked",
            OrgState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockReceipt {
    pub deposit: U256,
    pub reserve_share: U256,
    pub bank_share: U256,
    /// Initial supply minted to the admin
    pub minted: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestReceipt {
    pub investor: Address,
    pub amount: U256,
    pub minted: U256,
    /// Reward tokens minted alongside
    pub reward: U256,
    pub reserve_share: U256,
    pub bank_share: U256,
    pub authorization: Authorization,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellReceipt {
    pub seller: Address,
    pub burned: U256,
    pub payout: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DividendReceipt {
    pub payer: Address,
    pub amount: U256,
    pub reserve_share: U256,
    pub bank_share: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReceipt {
    pub penalty: U256,
    pub supply: U256,
    /// Reserve after the penalty was pulled in
    pub reserve: U256,
}

/// The continuous organisation: reserve accounting plus the context shared
/// with the token ledger and the whitelist.
pub struct Organisation {
    config: OrgConfig,
    /// Stable-asset account holding the reserve; also the token minter
    address: Address,
    state: OrgState,
    reserve: U256,
    /// Unlock deposit plus all investments and dividends
    total_invested: U256,
    initial_supply: U256,
    admin: Address,
    whitelister: Address,
    bank: Address,
    token: SharedToken,
    reward: SharedReward,
    whitelist: SharedWhitelist,
    asset: SharedAsset,
    verifier: Arc<dyn ProofVerifier>,
}

impl fmt::Debug for Organisation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Organisation")
            .field("address", &self.address)
            .field("state", &self.state)
            .field("reserve", &self.reserve)
            .field("total_invested", &self.total_invested)
            .field("initial_supply", &self.initial_supply)
            .field("admin", &self.admin)
            .field("whitelister", &self.whitelister)
            .field("bank", &self.bank)
            .finish_non_exhaustive()
    }
}

impl Organisation {
    /// Build an organisation and its token ledger. The admin starts out as
    /// whitelister too.
    pub fn new(config: OrgConfig, admin: Address, bank: Address, asset: SharedAsset) -> OrgResult<Self> {
        config
            .validate()
            .map_err(|e| OrgError::InvalidInput(e.to_string()))?;
        if admin.is_zero() || bank.is_zero() {
            return Err(OrgError::InvalidInput("admin and bank must be set".into()));
        }

        let address = organisation_account();
        let whitelist: SharedWhitelist = Arc::new(RwLock::new(Whitelist::new()));
        let token = GovernanceToken::new(
            &config,
            token_ledger_account(),
            address,
            admin,
            Arc::clone(&whitelist),
        );
        let reward = RewardToken::new(&config, address);

        info!(
            symbol = %config.symbol,
            curve = config.curve_version.name(),
            reserve_ratio = config.reserve_ratio_percent,
            admin = %admin,
            "Organisation created"
        );

        Ok(Self {
            config,
            address,
            state: OrgState::Uninitialized,
            reserve: U256::ZERO,
            total_invested: U256::ZERO,
            initial_supply: U256::ZERO,
            admin,
            whitelister: admin,
            bank,
            token: Arc::new(RwLock::new(token)),
            reward: Arc::new(RwLock::new(reward)),
            whitelist,
            asset,
            verifier: Arc::new(Ed25519ProofVerifier),
        })
    }

    /// Replace the whitelist-proof verifier.
    pub fn with_verifier(mut self, verifier: Arc<dyn ProofVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn config(&self) -> &OrgConfig {
        &self.config
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn state(&self) -> OrgState {
        self.state
    }

    pub fn reserve(&self) -> U256 {
        self.reserve
    }

    pub fn total_invested(&self) -> U256 {
        self.total_invested
    }

    pub fn initial_supply(&self) -> U256 {
        self.initial_supply
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn whitelister(&self) -> Address {
        self.whitelister
    }

    pub fn bank(&self) -> Address {
        self.bank
    }

    pub fn token(&self) -> SharedToken {
        Arc::clone(&self.token)
    }

    pub fn reward(&self) -> SharedReward {
        Arc::clone(&self.reward)
    }

    pub fn reward_balance_of(&self, holder: &Address) -> U256 {
        self.reward.read().balance_of(holder)
    }

    pub fn whitelist(&self) -> SharedWhitelist {
        Arc::clone(&self.whitelist)
    }

    pub fn asset(&self) -> SharedAsset {
        Arc::clone(&self.asset)
    }

    pub fn is_whitelisted(&self, addr: &Address) -> bool {
        self.whitelist.read().contains(addr)
    }

    /// Number of whitelisted accounts.
    pub fn whitelisted_count(&self) -> usize {
        self.whitelist.read().len()
    }

    pub fn balance_of(&self, holder: &Address) -> U256 {
        self.token.read().balance_of(holder)
    }

    pub fn total_supply(&self) -> U256 {
        self.token.read().total_supply()
    }

    fn require_state(&self, expected: OrgState, op: &str) -> OrgResult<()> {
        if self.state != expected {
            return Err(OrgError::InvalidState(format!(
                "{} requires a {} organisation, it is {}",
                op, expected, self.state
            )));
        }
        Ok(())
    }

    fn require_admin(&self, caller: &Address) -> OrgResult<()> {
        if caller != &self.admin {
            return Err(OrgError::Unauthorized(format!("{} is not the admin", caller)));
        }
        Ok(())
    }

    /// Check that `owner` has approved and holds `amount` for the organisation to pull.
    fn check_pull(&self, asset: &dyn StableAsset, owner: &Address, amount: &U256) -> OrgResult<()> {
        let allowed = asset.allowance(owner, &self.address);
        if &allowed < amount {
            return Err(OrgError::InsufficientAllowance {
                required: *amount,
                available: allowed,
            });
        }
        let balance = asset.balance_of(owner);
        if &balance < amount {
            return Err(OrgError::InsufficientBalance {
                required: *amount,
                available: balance,
            });
        }
        Ok(())
    }

    fn pull(&self, asset: &mut dyn StableAsset, from: Address, to: Address, amount: U256) -> OrgResult<()> {
        if !amount.is_zero() {
            asset.transfer_from(self.address, from, to, amount)?;
        }
        Ok(())
    }

    /// Pull `amount` from `payer`, split by `ratio_percent` between the
    /// reserve account and the bank.
    fn pull_split(&self, payer: Address, amount: U256, ratio_percent: u8) -> OrgResult<(U256, U256)> {
        let (reserve_share, bank_share) = curve::split(&amount, ratio_percent)?;
        let mut asset = self.asset.write();
        self.check_pull(&*asset, &payer, &amount)?;
        self.pull(&mut *asset, payer, self.address, reserve_share)?;
        self.pull(&mut *asset, payer, self.bank, bank_share)?;
        Ok((reserve_share, bank_share))
    }

    fn checked_add(a: &U256, b: &U256, op: &'static str) -> OrgResult<U256> {
        a.checked_add(b).ok_or(OrgError::Curve(CurveError::Overflow(op)))
    }

    /// Open the organisation: pull the first deposit and mint the initial supply to the admin.
    pub fn unlock(&mut self, caller: Address, deposit: U256, initial_supply: U256) -> OrgResult<UnlockReceipt> {
        self.require_admin(&caller)?;
        self.require_state(OrgState::Uninitialized, "unlock")?;
        if deposit.is_zero() || initial_supply.is_zero() {
            return Err(OrgError::InvalidInput(
                "unlock needs a non-zero deposit and initial supply".into(),
            ));
        }

        let token_handle = Arc::clone(&self.token);
        let mut token = token_handle.write();
        token.check_mint(self.address, self.admin, initial_supply)?;
        {
            let asset = self.asset.read();
            self.check_pull(&*asset, &caller, &deposit)?;
        }

        let (reserve_share, bank_share) =
            self.pull_split(caller, deposit, self.config.reserve_ratio_percent)?;
        token.mint(self.address, self.admin, initial_supply)?;
        drop(token);

        self.reserve = reserve_share;
        self.total_invested = deposit;
        self.initial_supply = initial_supply;
        self.state = OrgState::Unlocked;

        info!(
            deposit = %deposit,
            reserve = %reserve_share,
            bank = %bank_share,
            initial_supply = %initial_supply,
            "Organisation unlocked"
        );

        Ok(UnlockReceipt {
            deposit,
            reserve_share,
            bank_share,
            minted: initial_supply,
        })
    }

    /// Buy tokens along the curve. A non-whitelisted investor needs a proof
    /// signed by the admin or the whitelister and is whitelisted on success.
    pub fn invest(
        &mut self,
        investor: Address,
        amount: U256,
        proof: Option<&WhitelistProof>,
    ) -> OrgResult<InvestReceipt> {
        self.require_state(OrgState::Unlocked, "invest")?;
        if amount.is_zero() {
            return Err(OrgError::InvalidInput("investment amount is zero".into()));
        }

        let authorization = {
            let list = self.whitelist.read();
            whitelist::authorize(
                &list,
                self.verifier.as_ref(),
                &investor,
                proof,
                &[self.admin, self.whitelister],
            )
        };
        if !authorization.is_allowed() {
            warn!(investor = %investor, "Investment rejected: not whitelisted");
            return Err(OrgError::NotWhitelisted(investor));
        }

        let token_handle = Arc::clone(&self.token);
        let mut token = token_handle.write();
        let minted = curve::buy(
            self.config.curve_version,
            &token.total_supply(),
            &self.total_invested,
            &amount,
        )?;
        if minted.is_zero() {
            return Err(OrgError::InvalidInput("investment too small to mint any tokens".into()));
        }
        let (reserve_share, _) = curve::split(&amount, self.config.reserve_ratio_percent)?;
        let new_reserve = Self::checked_add(&self.reserve, &reserve_share, "invest")?;
        let new_invested = Self::checked_add(&self.total_invested, &amount, "invest")?;
        token.check_mint(self.address, investor, minted)?;
        let reward = curve::reward(&minted, self.config.reward_multiplier)?;
        let mut rewards = self.reward.write();
        rewards.check_mint(self.address, investor, reward)?;
        {
            let asset = self.asset.read();
            self.check_pull(&*asset, &investor, &amount)?;
        }

        let (reserve_share, bank_share) =
            self.pull_split(investor, amount, self.config.reserve_ratio_percent)?;
        if let Authorization::ProofValid { signer } = authorization {
            self.whitelist.write().set(investor, true);
            info!(investor = %investor, signer = %signer, "Investor whitelisted by proof");
        }
        token.mint(self.address, investor, minted)?;
        rewards.mint(self.address, investor, reward)?;
        drop(rewards);
        drop(token);

        self.reserve = new_reserve;
        self.total_invested = new_invested;

        info!(
            investor = %investor,
            amount = %amount,
            minted = %minted,
            reward = %reward,
            reserve = %self.reserve,
            "Investment accepted"
        );

        Ok(InvestReceipt {
            investor,
            amount,
            minted,
            reward,
            reserve_share,
            bank_share,
            authorization,
        })
    }

    /// Revoke an investment: burn `amount` tokens the seller approved to the
    /// organisation and pay out the curve value from the reserve.
    pub fn sell(&mut self, seller: Address, amount: U256) -> OrgResult<SellReceipt> {
        if self.state == OrgState::Uninitialized {
            return Err(OrgError::InvalidState("sell requires an unlocked or closed organisation".into()));
        }
        if amount.is_zero() {
            return Err(OrgError::InvalidInput("sell amount is zero".into()));
        }

        let token_handle = Arc::clone(&self.token);
        let mut token = token_handle.write();
        let supply = token.total_supply();
        if amount > supply {
            return Err(OrgError::InvalidInput(format!(
                "cannot burn {} of a {} supply",
                amount, supply
            )));
        }
        token.check_burn_from(self.address, seller, amount)?;
        let payout = curve::sell(&supply, &self.reserve, &amount)?;
        let new_reserve = self
            .reserve
            .checked_sub(&payout)
            .ok_or(OrgError::Curve(CurveError::Overflow("sell")))?;

        let held = self.asset.read().balance_of(&self.address);
        if held < payout {
            return Err(OrgError::InsufficientBalance {
                required: payout,
                available: held,
            });
        }

        // Notifiers run inside burn_from and may lock voting state, which
        // itself locks the asset. The asset lock must not be held here.
        token.burn_from(self.address, seller, amount)?;
        if !payout.is_zero() {
            self.asset.write().transfer(self.address, seller, payout)?;
        }
        drop(token);
        self.reserve = new_reserve;

        info!(seller = %seller, burned = %amount, payout = %payout, reserve = %self.reserve, "Tokens sold");

        Ok(SellReceipt {
            seller,
            burned: amount,
            payout,
        })
    }

    /// Pay dividends: `ratio_percent` of `amount` goes to the reserve, the
    /// rest to the bank. Raises both sell payouts and buy costs.
    pub fn pay_dividends(&mut self, payer: Address, amount: U256, ratio_percent: u8) -> OrgResult<DividendReceipt> {
        if ratio_percent > 100 {
            return Err(OrgError::InvalidInput(format!(
                "dividend ratio {}% exceeds 100%",
                ratio_percent
            )));
        }
        self.require_state(OrgState::Unlocked, "pay_dividends")?;
        if amount.is_zero() {
            return Err(OrgError::InvalidInput("dividend amount is zero".into()));
        }

        let (reserve_share, _) = curve::split(&amount, ratio_percent)?;
        let new_reserve = Self::checked_add(&self.reserve, &reserve_share, "pay_dividends")?;
        let new_invested = Self::checked_add(&self.total_invested, &amount, "pay_dividends")?;
        let (reserve_share, bank_share) = self.pull_split(payer, amount, ratio_percent)?;

        self.reserve = new_reserve;
        self.total_invested = new_invested;

        info!(payer = %payer, amount = %amount, ratio = ratio_percent, reserve = %self.reserve, "Dividends paid");

        Ok(DividendReceipt {
            payer,
            amount,
            reserve_share,
            bank_share,
        })
    }

    /// [`pay_dividends`](Self::pay_dividends) at the configured reserve ratio.
    pub fn pay_dividends_default(&mut self, payer: Address, amount: U256) -> OrgResult<DividendReceipt> {
        self.pay_dividends(payer, amount, self.config.reserve_ratio_percent)
    }

    /// Close the organisation. The admin tops up the reserve with the
    /// close-out penalty so every remaining holder can sell.
    pub fn close(&mut self, caller: Address) -> OrgResult<CloseReceipt> {
        self.require_admin(&caller)?;
        self.require_state(OrgState::Unlocked, "close")?;

        let supply = self.token.read().total_supply();
        let penalty = curve::close_penalty(&supply, &self.initial_supply, &self.reserve)?;
        let new_reserve = Self::checked_add(&self.reserve, &penalty, "close")?;

        if !penalty.is_zero() {
            let mut asset = self.asset.write();
            self.check_pull(&*asset, &caller, &penalty)?;
            self.pull(&mut *asset, caller, self.address, penalty)?;
        }

        self.reserve = new_reserve;
        self.state = OrgState::Closed;

        info!(penalty = %penalty, supply = %supply, reserve = %self.reserve, "Organisation closed");

        Ok(CloseReceipt {
            penalty,
            supply,
            reserve: self.reserve,
        })
    }

    /// Penalty [`close`](Self::close) would pull right now.
    pub fn close_penalty(&self) -> OrgResult<U256> {
        self.require_state(OrgState::Unlocked, "close_penalty")?;
        let supply = self.token.read().total_supply();
        Ok(curve::close_penalty(&supply, &self.initial_supply, &self.reserve)?)
    }

    /// Tokens `amount` of stable asset would mint right now.
    pub fn quote_buy(&self, amount: &U256) -> OrgResult<U256> {
        self.require_state(OrgState::Unlocked, "quote_buy")?;
        let supply = self.token.read().total_supply();
        Ok(curve::buy(self.config.curve_version, &supply, &self.total_invested, amount)?)
    }

    /// Stable asset paid out for selling `tokens` right now.
    pub fn quote_sell(&self, tokens: &U256) -> OrgResult<U256> {
        if self.state == OrgState::Uninitialized {
            return Err(OrgError::InvalidState("quote_sell before unlock".into()));
        }
        let supply = self.token.read().total_supply();
        if tokens > &supply {
            return Err(OrgError::InvalidInput(format!(
                "cannot burn {} of a {} supply",
                tokens, supply
            )));
        }
        Ok(curve::sell(&supply, &self.reserve, tokens)?)
    }

    pub fn set_whitelister(&mut self, caller: Address, whitelister: Address) -> OrgResult<()> {
        self.require_admin(&caller)?;
        if whitelister.is_zero() {
            return Err(OrgError::InvalidInput("whitelister cannot be the zero address".into()));
        }
        self.whitelister = whitelister;
        info!(whitelister = %whitelister, "Whitelister updated");
        Ok(())
    }

    /// Add or remove a whitelist entry. Returns whether anything changed.
    pub fn set_whitelisted(&mut self, caller: Address, addr: Address, allowed: bool) -> OrgResult<bool> {
        if caller != self.admin && caller != self.whitelister {
            return Err(OrgError::Unauthorized(format!(
                "{} is neither admin nor whitelister",
                caller
            )));
        }
        if addr.is_zero() {
            return Err(OrgError::InvalidInput("cannot whitelist the zero address".into()));
        }
        let changed = self.whitelist.write().set(addr, allowed);
        debug!(addr = %addr, allowed, changed, "Whitelist entry set");
        Ok(changed)
    }

    /// Hand over the admin role, including ownership of the token's notifier registry.
    pub fn set_admin(&mut self, caller: Address, admin: Address) -> OrgResult<()> {
        self.require_admin(&caller)?;
        if admin.is_zero() {
            return Err(OrgError::InvalidInput("admin cannot be the zero address".into()));
        }
        self.token.write().set_owner(self.address, admin)?;
        self.admin = admin;
        info!(admin = %admin, "Admin updated");
        Ok(())
    }

    pub fn set_bank(&mut self, caller: Address, bank: Address) -> OrgResult<()> {
        self.require_admin(&caller)?;
        if bank.is_zero() {
            return Err(OrgError::InvalidInput("bank cannot be the zero address".into()));
        }
        self.bank = bank;
        info!(bank = %bank, "Bank updated");
        Ok(())
    }

    pub fn snapshot(&self) -> OrganisationSnapshot {
        OrganisationSnapshot {
            config: self.config.clone(),
            address: self.address,
            state: self.state,
            reserve: self.reserve,
            total_invested: self.total_invested,
            initial_supply: self.initial_supply,
            admin: self.admin,
            whitelister: self.whitelister,
            bank: self.bank,
            whitelist: self.whitelist.read().entries().copied().collect(),
            token: self.token.read().snapshot(),
            reward: self.reward.read().snapshot(),
        }
    }

    /// Rebuild an organisation from a snapshot, checking its invariants
    /// against itself and against the stable-asset reserve account.
    pub fn restore(snapshot: OrganisationSnapshot, asset: SharedAsset) -> OrgResult<Self> {
        snapshot
            .config
            .validate()
            .map_err(|e| OrgError::Snapshot(e.to_string()))?;

        match snapshot.state {
            OrgState::Uninitialized => {
                if !snapshot.reserve.is_zero()
                    || !snapshot.total_invested.is_zero()
                    || !snapshot.token.total_supply.is_zero()
                {
                    return Err(OrgError::Snapshot(
                        "uninitialized organisation with funds or supply".into(),
                    ));
                }
            }
            OrgState::Unlocked | OrgState::Closed => {
                if snapshot.initial_supply.is_zero() || snapshot.total_invested.is_zero() {
                    return Err(OrgError::Snapshot(
                        "unlocked organisation without initial supply or investment".into(),
                    ));
                }
            }
        }
        if snapshot.token.minter != snapshot.address || snapshot.reward.minter != snapshot.address {
            return Err(OrgError::Snapshot("token minter is not the organisation".into()));
        }
        let held = asset.read().balance_of(&snapshot.address);
        if held < snapshot.reserve {
            return Err(OrgError::Snapshot(format!(
                "reserve account holds {} but the ledger records {}",
                held, snapshot.reserve
            )));
        }

        let whitelist: SharedWhitelist =
            Arc::new(RwLock::new(Whitelist::from_entries(snapshot.whitelist)));
        let token = GovernanceToken::restore(snapshot.token, Arc::clone(&whitelist))?;
        let reward = RewardToken::restore(snapshot.reward)?;

        info!(state = %snapshot.state, reserve = %snapshot.reserve, "Organisation restored");

        Ok(Self {
            config: snapshot.config,
            address: snapshot.address,
            state: snapshot.state,
            reserve: snapshot.reserve,
            total_invested: snapshot.total_invested,
            initial_supply: snapshot.initial_supply,
            admin: snapshot.admin,
            whitelister: snapshot.whitelister,
            bank: snapshot.bank,
            token: Arc::new(RwLock::new(token)),
            reward: Arc::new(RwLock::new(reward)),
            whitelist,
            asset,
            verifier: Arc::new(Ed25519ProofVerifier),
        })
    }
}

/// Persisted organisation state: ledger record, whitelist and token ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganisationSnapshot {
    pub config: OrgConfig,
    pub address: Address,
    pub state: OrgState,
    pub reserve: U256,
    pub total_invested: U256,
    pub initial_supply: U256,
    pub admin: Address,
    pub whitelister: Address,
    pub bank: Address,
    pub whitelist: Vec<Address>,
    pub token: TokenSnapshot,
    pub reward: RewardSnapshot,
}

impl OrganisationSnapshot {
    pub fn to_json(&self) -> OrgResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| OrgError::Snapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> OrgResult<Self> {
        serde_json::from_str(json).map_err(|e| OrgError::Snapshot(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::InMemoryStableAsset;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn setup() -> (Organisation, Arc<RwLock<InMemoryStableAsset>>) {
        let asset = InMemoryStableAsset::new().shared();
        asset.write().mint(addr(1), U256::from_whole(1_000)).unwrap();
        let org = Organisation::new(OrgConfig::default(), addr(1), addr(2), asset.clone()).unwrap();
        (org, asset)
    }

    #[test]
    fn test_new_rejects_zero_bank() {
        let asset = InMemoryStableAsset::new().shared();
        assert!(Organisation::new(OrgConfig::default(), addr(1), Address::ZERO, asset).is_err());
    }

    #[test]
    fn test_unlock_requires_admin() {
        let (mut org, _) = setup();
        assert!(matches!(
            org.unlock(addr(3), U256::ONE, U256::ONE),
            Err(OrgError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_unlock_requires_allowance() {
        let (mut org, asset) = setup();
        let err = org.unlock(addr(1), U256::from_whole(10), U256::from_whole(20)).unwrap_err();
        assert!(matches!(err, OrgError::InsufficientAllowance { .. }));
        assert_eq!(org.state(), OrgState::Uninitialized);
        assert_eq!(asset.read().balance_of(&addr(1)), U256::from_whole(1_000));
    }

    #[test]
    fn test_queries_before_unlock() {
        let (org, _) = setup();
        assert!(matches!(org.quote_buy(&U256::ONE), Err(OrgError::InvalidState(_))));
        assert!(matches!(org.quote_sell(&U256::ONE), Err(OrgError::InvalidState(_))));
        assert!(matches!(org.close_penalty(), Err(OrgError::InvalidState(_))));
    }

    #[test]
    fn test_whitelister_role() {
        let (mut org, _) = setup();
        assert!(org.set_whitelisted(addr(3), addr(4), true).is_err());
        org.set_whitelister(addr(1), addr(3)).unwrap();
        assert!(org.set_whitelisted(addr(3), addr(4), true).unwrap());
        assert!(org.is_whitelisted(&addr(4)));
        assert_eq!(org.whitelisted_count(), 1);
        assert!(org.set_whitelisted(addr(3), addr(4), false).unwrap());
        assert!(!org.is_whitelisted(&addr(4)));
    }

    #[test]
    fn test_set_admin_moves_registry_ownership() {
        let (mut org, _) = setup();
        org.set_admin(addr(1), addr(5)).unwrap();
        assert_eq!(org.admin(), addr(5));
        assert_eq!(org.token().read().owner(), addr(5));
        assert!(org.set_bank(addr(1), addr(6)).is_err());
        org.set_bank(addr(5), addr(6)).unwrap();
        assert_eq!(org.bank(), addr(6));
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let (mut org, asset) = setup();
        asset.write().approve(addr(1), org.address(), U256::from_whole(10)).unwrap();
        org.unlock(addr(1), U256::from_whole(10), U256::from_whole(20)).unwrap();
        org.set_whitelisted(addr(1), addr(7), true).unwrap();

        let json = org.snapshot().to_json().unwrap();
        let snapshot = OrganisationSnapshot::from_json(&json).unwrap();
        let restored = Organisation::restore(snapshot, asset).unwrap();

        assert_eq!(restored.state(), OrgState::Unlocked);
        assert_eq!(restored.reserve(), U256::from_whole(2));
        assert_eq!(restored.balance_of(&addr(1)), U256::from_whole(20));
        assert!(restored.is_whitelisted(&addr(7)));
    }

    #[test]
    fn test_restore_rejects_underfunded_reserve() {
        let (mut org, asset) = setup();
        asset.write().approve(addr(1), org.address(), U256::from_whole(10)).unwrap();
        org.unlock(addr(1), U256::from_whole(10), U256::from_whole(20)).unwrap();

        let mut snapshot = org.snapshot();
        snapshot.reserve = U256::from_whole(3);
        assert!(matches!(
            Organisation::restore(snapshot, asset),
            Err(OrgError::Snapshot(_))
        ));
    }
}
