//! Investor reward ledger.
//!
//! Every investment also mints reward tokens at a fixed multiple of the
//! governance tokens it bought. Rewards transfer freely; only the minter
//! (the organisation account) creates them.

use crate::config::OrgConfig;
use crate::error::{OrgError, OrgResult};
use mogul_types::{Address, U256};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

pub type SharedReward = Arc<RwLock<RewardToken>>;

#[derive(Debug)]
pub struct RewardToken {
    name: String,
    symbol: String,
    minter: Address,
    total_supply: U256,
    balances: HashMap<Address, U256>,
}

impl RewardToken {
    pub fn new(config: &OrgConfig, minter: Address) -> Self {
        Self {
            name: config.reward_name.clone(),
            symbol: config.reward_symbol.clone(),
            minter,
            total_supply: U256::ZERO,
            balances: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn minter(&self) -> Address {
        self.minter
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn balance_of(&self, holder: &Address) -> U256 {
        self.balances.get(holder).copied().unwrap_or(U256::ZERO)
    }

    /// Validate a mint without applying it.
    pub fn check_mint(&self, caller: Address, to: Address, amount: U256) -> OrgResult<()> {
        if caller != self.minter {
            return Err(OrgError::Unauthorized(format!("{} is not the reward minter", caller)));
        }
        if to.is_zero() {
            return Err(OrgError::InvalidInput("reward mint to the zero address".into()));
        }
        self.total_supply
            .checked_add(&amount)
            .ok_or_else(|| OrgError::InvalidInput("reward supply overflow".into()))?;
        Ok(())
    }

    pub fn mint(&mut self, caller: Address, to: Address, amount: U256) -> OrgResult<()> {
        self.check_mint(caller, to, amount)?;
        if amount.is_zero() {
            return Ok(());
        }
        self.total_supply = self.total_supply.saturating_add(&amount);
        let balance = self.balance_of(&to).saturating_add(&amount);
        self.balances.insert(to, balance);
        debug!(to = %to, amount = %amount, "Reward minted");
        Ok(())
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> OrgResult<()> {
        if to.is_zero() {
            return Err(OrgError::InvalidInput("transfer to the zero address".into()));
        }
        let available = self.balance_of(&from);
        let remaining = available
            .checked_sub(&amount)
            .ok_or(OrgError::InsufficientBalance {
                required: amount,
                available,
            })?;
        self.store(from, remaining);
        let credited = self.balance_of(&to).saturating_add(&amount);
        self.store(to, credited);
        debug!(from = %from, to = %to, amount = %amount, "Reward transfer");
        Ok(())
    }

    fn store(&mut self, holder: Address, balance: U256) {
        if balance.is_zero() {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, balance);
        }
    }

    pub fn snapshot(&self) -> RewardSnapshot {
        RewardSnapshot {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            minter: self.minter,
            total_supply: self.total_supply,
            balances: self.balances.iter().map(|(a, b)| (*a, *b)).collect(),
        }
    }

    pub fn restore(snapshot: RewardSnapshot) -> OrgResult<Self> {
        let sum = snapshot
            .balances
            .values()
            .try_fold(U256::ZERO, |acc, b| acc.checked_add(b))
            .ok_or_else(|| OrgError::Snapshot("reward balance sum overflows".into()))?;
        if sum != snapshot.total_supply {
            return Err(OrgError::Snapshot(format!(
                "reward balances sum to {} but supply is {}",
                sum, snapshot.total_supply
            )));
        }
        Ok(Self {
            name: snapshot.name,
            symbol: snapshot.symbol,
            minter: snapshot.minter,
            total_supply: snapshot.total_supply,
            balances: snapshot
                .balances
                .into_iter()
                .filter(|(holder, b)| !holder.is_zero() && !b.is_zero())
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSnapshot {
    pub name: String,
    pub symbol: String,
    pub minter: Address,
    pub total_supply: U256,
    pub balances: BTreeMap<Address, U256>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    #[test]
    fn test_mint_restricted_to_minter() {
        let mut reward = RewardToken::new(&OrgConfig::default(), addr(1));
        assert!(matches!(
            reward.mint(addr(2), addr(3), U256::from(5u64)),
            Err(OrgError::Unauthorized(_))
        ));
        reward.mint(addr(1), addr(3), U256::from(5u64)).unwrap();
        assert_eq!(reward.balance_of(&addr(3)), U256::from(5u64));
        assert_eq!(reward.total_supply(), U256::from(5u64));
        assert_eq!(reward.symbol(), "MOVIE");
    }

    #[test]
    fn test_transfer_needs_no_whitelist() {
        let mut reward = RewardToken::new(&OrgConfig::default(), addr(1));
        reward.mint(addr(1), addr(3), U256::from(5u64)).unwrap();
        reward.transfer(addr(3), addr(4), U256::from(2u64)).unwrap();
        assert_eq!(reward.balance_of(&addr(3)), U256::from(3u64));
        assert_eq!(reward.balance_of(&addr(4)), U256::from(2u64));
        assert!(matches!(
            reward.transfer(addr(4), addr(3), U256::from(3u64)),
            Err(OrgError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_restore_checks_supply() {
        let mut reward = RewardToken::new(&OrgConfig::default(), addr(1));
        reward.mint(addr(1), addr(3), U256::from(5u64)).unwrap();
        let mut snapshot = reward.snapshot();
        assert_eq!(RewardToken::restore(snapshot.clone()).unwrap().balance_of(&addr(3)), U256::from(5u64));
        snapshot.total_supply = U256::from(6u64);
        assert!(matches!(RewardToken::restore(snapshot), Err(OrgError::Snapshot(_))));
    }
}
