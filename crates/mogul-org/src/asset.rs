//! Stable-asset collaborator.
//!
//! The ledger only moves stable-asset funds it has been approved to pull.

use crate::error::AssetError;
use mogul_types::{Address, U256};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Allowance-based fungible asset the reserve is denominated in.
pub trait StableAsset {
    fn balance_of(&self, owner: &Address) -> U256;

    fn allowance(&self, owner: &Address, spender: &Address) -> U256;

    fn approve(&mut self, owner: Address, spender: Address, amount: U256) -> Result<(), AssetError>;

    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), AssetError>;

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), AssetError>;
}

/// Shared handle to the stable asset used by the ledger and the voting escrow.
pub type SharedAsset = Arc<RwLock<dyn StableAsset + Send + Sync>>;

/// In-memory stable asset.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStableAsset {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    total_supply: U256,
}

impl InMemoryStableAsset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap into a shared handle, keeping the concrete type.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    /// Credit `amount` to `to` out of thin air (funding accounts for tests and demos).
    pub fn mint(&mut self, to: Address, amount: U256) -> Result<(), AssetError> {
        let balance = self.balance_of(&to);
        let new_balance = balance.checked_add(&amount).ok_or(AssetError::Overflow(to))?;
        self.total_supply = self
            .total_supply
            .checked_add(&amount)
            .ok_or(AssetError::Overflow(to))?;
        self.balances.insert(to, new_balance);
        Ok(())
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: U256) -> Result<(), AssetError> {
        let from_balance = self.balance_of(&from);
        let remaining = from_balance
            .checked_sub(&amount)
            .ok_or(AssetError::InsufficientBalance {
                owner: from,
                required: amount,
                available: from_balance,
            })?;
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .balance_of(&to)
            .checked_add(&amount)
            .ok_or(AssetError::Overflow(to))?;
        self.balances.insert(from, remaining);
        self.balances.insert(to, to_balance);
        Ok(())
    }
}

impl StableAsset for InMemoryStableAsset {
    fn balance_of(&self, owner: &Address) -> U256 {
        self.balances.get(owner).copied().unwrap_or(U256::ZERO)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> U256 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn approve(&mut self, owner: Address, spender: Address, amount: U256) -> Result<(), AssetError> {
        self.allowances.insert((owner, spender), amount);
        Ok(())
    }

    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), AssetError> {
        self.move_balance(from, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), AssetError> {
        let allowed = self.allowance(&from, &spender);
        let remaining = allowed
            .checked_sub(&amount)
            .ok_or(AssetError::InsufficientAllowance {
                owner: from,
                spender,
                required: amount,
                available: allowed,
            })?;
        self.move_balance(from, to, amount)?;
        self.allowances.insert((from, spender), remaining);
        Ok(())
    }
}
