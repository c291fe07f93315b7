//! Governance token ledger.
//!
//! Fungible balances and allowances. Mint and burn are reserved to the
//! minter (the organisation account); transfers need both parties on the
//! whitelist. Every balance change is announced to the registered
//! movement notifiers in two phases:
//!
//! 1. `check_movement` on every notifier, any of which may veto;
//! 2. balances are applied, then `on_movement` runs on every notifier.
//!
//! A veto aborts the operation before any balance changes. Notifiers only
//! ever see the [`Movement`], and the caller holds the ledger's write lock
//! for the whole dispatch, so a notifier cannot re-enter the ledger.

use crate::config::OrgConfig;
use crate::error::{OrgError, OrgResult};
use crate::whitelist::SharedWhitelist;
use mogul_types::{Address, U256};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Shared handle to the token ledger.
pub type SharedToken = Arc<RwLock<GovernanceToken>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    Mint,
    Burn,
    Transfer,
}

/// A balance change on the token ledger.
///
/// `from` is the zero address for mints and `to` is the zero address for
/// burns. Only the ledger can construct one, so a notifier can trust that
/// a movement it receives really happened on `ledger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    kind: MovementKind,
    from: Address,
    to: Address,
    amount: U256,
    ledger: Address,
}

impl Movement {
    pub(crate) fn new(kind: MovementKind, from: Address, to: Address, amount: U256, ledger: Address) -> Self {
        Self {
            kind,
            from,
            to,
            amount,
            ledger,
        }
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn to(&self) -> Address {
        self.to
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    /// Ledger that produced this movement.
    pub fn ledger(&self) -> Address {
        self.ledger
    }
}

/// Observer of token movements.
pub trait MovementNotifier: Send + Sync {
    /// Identity used for duplicate detection and error reports.
    fn id(&self) -> Address;

    /// Veto phase. Must not mutate anything.
    fn check_movement(&self, movement: &Movement) -> Result<(), String>;

    /// Runs after balances are applied. May only touch the notifier's own state.
    fn on_movement(&self, movement: &Movement);
}

/// Stable registry handle. Removing one notifier never changes another's handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotifierHandle(u64);

impl NotifierHandle {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NotifierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notifier#{}", self.0)
    }
}

#[derive(Default)]
struct NotifierRegistry {
    next_handle: u64,
    entries: Vec<(NotifierHandle, Arc<dyn MovementNotifier>)>,
}

impl NotifierRegistry {
    fn add(&mut self, notifier: Arc<dyn MovementNotifier>) -> OrgResult<NotifierHandle> {
        let id = notifier.id();
        if self.entries.iter().any(|(_, n)| n.id() == id) {
            return Err(OrgError::DuplicateNotifier(id));
        }
        let handle = NotifierHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push((handle, notifier));
        Ok(handle)
    }

    fn remove(&mut self, handle: NotifierHandle) -> OrgResult<Arc<dyn MovementNotifier>> {
        let position = self
            .entries
            .iter()
            .position(|(h, _)| *h == handle)
            .ok_or(OrgError::UnknownNotifier(handle.0))?;
        Ok(self.entries.remove(position).1)
    }

    fn list(&self) -> Vec<(NotifierHandle, Address)> {
        self.entries.iter().map(|(h, n)| (*h, n.id())).collect()
    }

    fn snapshot(&self) -> Vec<Arc<dyn MovementNotifier>> {
        self.entries.iter().map(|(_, n)| Arc::clone(n)).collect()
    }
}

impl fmt::Debug for NotifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.list()).finish()
    }
}

/// Governance token ledger.
#[derive(Debug)]
pub struct GovernanceToken {
    name: String,
    symbol: String,
    decimals: u8,
    /// Ledger identity stamped on every movement
    ledger: Address,
    /// Only account allowed to mint and burn
    minter: Address,
    /// Manages the notifier registry
    owner: Address,
    total_supply: U256,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    whitelist: SharedWhitelist,
    notifiers: NotifierRegistry,
}

impl GovernanceToken {
    pub fn new(
        config: &OrgConfig,
        ledger: Address,
        minter: Address,
        owner: Address,
        whitelist: SharedWhitelist,
    ) -> Self {
        Self {
            name: config.name.clone(),
            symbol: config.symbol.clone(),
            decimals: config.decimals,
            ledger,
            minter,
            owner,
            total_supply: U256::ZERO,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            whitelist,
            notifiers: NotifierRegistry::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn ledger(&self) -> Address {
        self.ledger
    }

    pub fn minter(&self) -> Address {
        self.minter
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn balance_of(&self, holder: &Address) -> U256 {
        self.balances.get(holder).copied().unwrap_or(U256::ZERO)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> U256 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Number of accounts with a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: U256) -> OrgResult<()> {
        if spender.is_zero() {
            return Err(OrgError::InvalidInput("cannot approve the zero address".into()));
        }
        if amount.is_zero() {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
        debug!(owner = %owner, spender = %spender, amount = %amount, "Token allowance set");
        Ok(())
    }

    /// Hand registry management to a new owner. Callable by the owner or the minter.
    pub fn set_owner(&mut self, caller: Address, new_owner: Address) -> OrgResult<()> {
        if caller != self.owner && caller != self.minter {
            return Err(OrgError::Unauthorized(format!(
                "{} cannot change the token owner",
                caller
            )));
        }
        self.owner = new_owner;
        Ok(())
    }

    pub fn add_movement_notifier(
        &mut self,
        caller: Address,
        notifier: Arc<dyn MovementNotifier>,
    ) -> OrgResult<NotifierHandle> {
        self.require_owner(&caller)?;
        let id = notifier.id();
        let handle = self.notifiers.add(notifier)?;
        info!(notifier = %id, handle = %handle, "Movement notifier registered");
        Ok(handle)
    }

    pub fn remove_movement_notifier(&mut self, caller: Address, handle: NotifierHandle) -> OrgResult<()> {
        self.require_owner(&caller)?;
        let removed = self.notifiers.remove(handle)?;
        info!(notifier = %removed.id(), handle = %handle, "Movement notifier removed");
        Ok(())
    }

    /// Registered notifiers in call order.
    pub fn movement_notifiers(&self) -> Vec<(NotifierHandle, Address)> {
        self.notifiers.list()
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> OrgResult<Movement> {
        let movement = self.prepare_transfer(from, to, amount)?;
        Ok(self.commit(movement))
    }

    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> OrgResult<Movement> {
        let remaining = self.spend_allowance(&from, &spender, &amount)?;
        let movement = self.prepare_transfer(from, to, amount)?;
        self.set_allowance(from, spender, remaining);
        Ok(self.commit(movement))
    }

    /// Validate a mint, including the notifier veto phase, without applying it.
    pub fn check_mint(&self, caller: Address, to: Address, amount: U256) -> OrgResult<()> {
        self.prepare_mint(caller, to, amount).map(|_| ())
    }

    pub fn mint(&mut self, caller: Address, to: Address, amount: U256) -> OrgResult<Movement> {
        let movement = self.prepare_mint(caller, to, amount)?;
        Ok(self.commit(movement))
    }

    /// Burn tokens held by the minter itself.
    pub fn burn(&mut self, caller: Address, amount: U256) -> OrgResult<Movement> {
        let movement = self.prepare_burn(caller, caller, amount)?;
        Ok(self.commit(movement))
    }

    /// Validate a burn through the minter's allowance without applying it.
    pub fn check_burn_from(&self, caller: Address, holder: Address, amount: U256) -> OrgResult<()> {
        self.spend_allowance(&holder, &caller, &amount)?;
        self.prepare_burn(caller, holder, amount).map(|_| ())
    }

    /// Burn `amount` from `holder`, spending the allowance `holder` granted the minter.
    pub fn burn_from(&mut self, caller: Address, holder: Address, amount: U256) -> OrgResult<Movement> {
        let remaining = self.spend_allowance(&holder, &caller, &amount)?;
        let movement = self.prepare_burn(caller, holder, amount)?;
        self.set_allowance(holder, caller, remaining);
        Ok(self.commit(movement))
    }

    fn require_owner(&self, caller: &Address) -> OrgResult<()> {
        if caller != &self.owner {
            return Err(OrgError::Unauthorized(format!(
                "{} is not the token owner",
                caller
            )));
        }
        Ok(())
    }

    fn require_minter(&self, caller: &Address) -> OrgResult<()> {
        if caller != &self.minter {
            return Err(OrgError::Unauthorized(format!("{} is not the minter", caller)));
        }
        Ok(())
    }

    fn spend_allowance(&self, owner: &Address, spender: &Address, amount: &U256) -> OrgResult<U256> {
        let available = self.allowance(owner, spender);
        available
            .checked_sub(amount)
            .ok_or(OrgError::InsufficientAllowance {
                required: *amount,
                available,
            })
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, amount: U256) {
        if amount.is_zero() {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
    }

    fn require_balance(&self, holder: &Address, amount: &U256) -> OrgResult<()> {
        let available = self.balance_of(holder);
        if &available < amount {
            return Err(OrgError::InsufficientBalance {
                required: *amount,
                available,
            });
        }
        Ok(())
    }

    fn prepare_transfer(&self, from: Address, to: Address, amount: U256) -> OrgResult<Movement> {
        if to.is_zero() {
            return Err(OrgError::InvalidInput("transfer to the zero address".into()));
        }
        {
            let whitelist = self.whitelist.read();
            for party in [from, to] {
                if !whitelist.contains(&party) {
                    return Err(OrgError::NotWhitelisted(party));
                }
            }
        }
        self.require_balance(&from, &amount)?;
        let movement = Movement::new(MovementKind::Transfer, from, to, amount, self.ledger);
        self.check_notifiers(&movement)?;
        Ok(movement)
    }

    fn prepare_mint(&self, caller: Address, to: Address, amount: U256) -> OrgResult<Movement> {
        self.require_minter(&caller)?;
        if to.is_zero() {
            return Err(OrgError::InvalidInput("mint to the zero address".into()));
        }
        if amount.is_zero() {
            return Err(OrgError::InvalidInput("mint amount is zero".into()));
        }
        self.total_supply
            .checked_add(&amount)
            .ok_or_else(|| OrgError::InvalidInput("total supply overflow".into()))?;
        let movement = Movement::new(MovementKind::Mint, Address::ZERO, to, amount, self.ledger);
        self.check_notifiers(&movement)?;
        Ok(movement)
    }

    fn prepare_burn(&self, caller: Address, holder: Address, amount: U256) -> OrgResult<Movement> {
        self.require_minter(&caller)?;
        if amount.is_zero() {
            return Err(OrgError::InvalidInput("burn amount is zero".into()));
        }
        self.require_balance(&holder, &amount)?;
        let movement = Movement::new(MovementKind::Burn, holder, Address::ZERO, amount, self.ledger);
        self.check_notifiers(&movement)?;
        Ok(movement)
    }

    fn check_notifiers(&self, movement: &Movement) -> OrgResult<()> {
        for (_, notifier) in &self.notifiers.entries {
            notifier
                .check_movement(movement)
                .map_err(|reason| OrgError::NotifierRejected {
                    notifier: notifier.id(),
                    reason,
                })?;
        }
        Ok(())
    }

    /// Apply a validated movement and run the notification phase.
    fn commit(&mut self, movement: Movement) -> Movement {
        let amount = movement.amount();
        match movement.kind() {
            MovementKind::Mint => {
                self.total_supply = self.total_supply.saturating_add(&amount);
            }
            MovementKind::Burn => {
                self.total_supply = self.total_supply.saturating_sub(&amount);
            }
            MovementKind::Transfer => {}
        }
        if !movement.from().is_zero() {
            let balance = self.balance_of(&movement.from()).saturating_sub(&amount);
            self.store_balance(movement.from(), balance);
        }
        if !movement.to().is_zero() {
            let balance = self.balance_of(&movement.to()).saturating_add(&amount);
            self.store_balance(movement.to(), balance);
        }

        debug!(
            kind = ?movement.kind(),
            from = %movement.from(),
            to = %movement.to(),
            amount = %amount,
            "Token movement"
        );

        for notifier in self.notifiers.snapshot() {
            notifier.on_movement(&movement);
        }
        movement
    }

    fn store_balance(&mut self, holder: Address, balance: U256) {
        if balance.is_zero() {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, balance);
        }
    }

    pub fn snapshot(&self) -> TokenSnapshot {
        let mut allowances: BTreeMap<Address, BTreeMap<Address, U256>> = BTreeMap::new();
        for ((owner, spender), amount) in &self.allowances {
            allowances.entry(*owner).or_default().insert(*spender, *amount);
        }
        TokenSnapshot {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            ledger: self.ledger,
            minter: self.minter,
            owner: self.owner,
            total_supply: self.total_supply,
            balances: self.balances.iter().map(|(a, b)| (*a, *b)).collect(),
            allowances,
        }
    }

    /// Rebuild a ledger from a snapshot. Notifiers are not persisted and
    /// must be registered again.
    pub fn restore(snapshot: TokenSnapshot, whitelist: SharedWhitelist) -> OrgResult<Self> {
        let mut sum = U256::ZERO;
        for (holder, balance) in &snapshot.balances {
            if holder.is_zero() {
                return Err(OrgError::Snapshot("zero address holds a balance".into()));
            }
            sum = sum
                .checked_add(balance)
                .ok_or_else(|| OrgError::Snapshot("balance sum overflows".into()))?;
        }
        if sum != snapshot.total_supply {
            return Err(OrgError::Snapshot(format!(
                "balances sum to {} but total supply is {}",
                sum, snapshot.total_supply
            )));
        }

        let balances = snapshot
            .balances
            .into_iter()
            .filter(|(_, b)| !b.is_zero())
            .collect();
        let allowances = snapshot
            .allowances
            .into_iter()
            .flat_map(|(owner, spenders)| {
                spenders
                    .into_iter()
                    .map(move |(spender, amount)| ((owner, spender), amount))
            })
            .filter(|(_, amount)| !amount.is_zero())
            .collect();

        Ok(Self {
            name: snapshot.name,
            symbol: snapshot.symbol,
            decimals: snapshot.decimals,
            ledger: snapshot.ledger,
            minter: snapshot.minter,
            owner: snapshot.owner,
            total_supply: snapshot.total_supply,
            balances,
            allowances,
            whitelist,
            notifiers: NotifierRegistry::default(),
        })
    }
}

/// Persisted form of the token ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub ledger: Address,
    pub minter: Address,
    pub owner: Address,
    pub total_supply: U256,
    pub balances: BTreeMap<Address, U256>,
    pub allowances: BTreeMap<Address, BTreeMap<Address, U256>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::whitelist::Whitelist;
    use parking_lot::Mutex;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    const MINTER: u8 = 100;
    const OWNER: u8 = 101;

    fn token_with(whitelisted: &[u8]) -> GovernanceToken {
        let whitelist = Whitelist::from_entries(whitelisted.iter().map(|n| addr(*n)));
        GovernanceToken::new(
            &OrgConfig::default(),
            addr(99),
            addr(MINTER),
            addr(OWNER),
            Arc::new(RwLock::new(whitelist)),
        )
    }

    /// Records every movement it sees; optionally vetoes movements from one address.
    struct Recorder {
        id: Address,
        veto_from: Option<Address>,
        seen: Mutex<Vec<Movement>>,
    }

    impl Recorder {
        fn new(n: u8, veto_from: Option<Address>) -> Arc<Self> {
            Arc::new(Self {
                id: addr(n),
                veto_from,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl MovementNotifier for Recorder {
        fn id(&self) -> Address {
            self.id
        }

        fn check_movement(&self, movement: &Movement) -> Result<(), String> {
            match self.veto_from {
                Some(blocked) if blocked == movement.from() => Err("blocked".into()),
                _ => Ok(()),
            }
        }

        fn on_movement(&self, movement: &Movement) {
            self.seen.lock().push(*movement);
        }
    }

    #[test]
    fn test_mint_restricted_to_minter() {
        let mut token = token_with(&[]);
        assert!(matches!(
            token.mint(addr(1), addr(1), U256::ONE),
            Err(OrgError::Unauthorized(_))
        ));
        let movement = token.mint(addr(MINTER), addr(1), U256::from(10u64)).unwrap();
        assert_eq!(movement.kind(), MovementKind::Mint);
        assert!(movement.from().is_zero());
        assert_eq!(token.total_supply(), U256::from(10u64));
        assert_eq!(token.balance_of(&addr(1)), U256::from(10u64));
    }

    #[test]
    fn test_transfer_requires_both_whitelisted() {
        let mut token = token_with(&[1]);
        token.mint(addr(MINTER), addr(1), U256::from(10u64)).unwrap();
        assert_eq!(
            token.transfer(addr(1), addr(2), U256::ONE),
            Err(OrgError::NotWhitelisted(addr(2)))
        );
        token.whitelist.write().set(addr(2), true);
        token.transfer(addr(1), addr(2), U256::ONE).unwrap();
        assert_eq!(token.balance_of(&addr(2)), U256::ONE);
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let mut token = token_with(&[1, 2]);
        token.mint(addr(MINTER), addr(1), U256::from(10u64)).unwrap();
        token.approve(addr(1), addr(3), U256::from(4u64)).unwrap();

        token.transfer_from(addr(3), addr(1), addr(2), U256::from(3u64)).unwrap();
        assert_eq!(token.allowance(&addr(1), &addr(3)), U256::ONE);
        assert!(matches!(
            token.transfer_from(addr(3), addr(1), addr(2), U256::from(2u64)),
            Err(OrgError::InsufficientAllowance { .. })
        ));
    }

    #[test]
    fn test_burn_from_needs_allowance_to_minter() {
        let mut token = token_with(&[]);
        token.mint(addr(MINTER), addr(1), U256::from(10u64)).unwrap();
        assert!(matches!(
            token.burn_from(addr(MINTER), addr(1), U256::from(5u64)),
            Err(OrgError::InsufficientAllowance { .. })
        ));

        token.approve(addr(1), addr(MINTER), U256::from(5u64)).unwrap();
        assert!(token.check_burn_from(addr(MINTER), addr(1), U256::from(5u64)).is_ok());
        let movement = token.burn_from(addr(MINTER), addr(1), U256::from(5u64)).unwrap();
        assert!(movement.to().is_zero());
        assert_eq!(token.total_supply(), U256::from(5u64));
        assert_eq!(token.allowance(&addr(1), &addr(MINTER)), U256::ZERO);
    }

    #[test]
    fn test_burn_own_holdings_minter_only() {
        let mut token = token_with(&[]);
        token.mint(addr(MINTER), addr(MINTER), U256::from(6u64)).unwrap();
        assert!(matches!(token.burn(addr(1), U256::ONE), Err(OrgError::Unauthorized(_))));
        assert!(matches!(
            token.burn(addr(MINTER), U256::from(7u64)),
            Err(OrgError::InsufficientBalance { .. })
        ));
        token.burn(addr(MINTER), U256::from(6u64)).unwrap();
        assert_eq!(token.total_supply(), U256::ZERO);
        assert_eq!(token.holder_count(), 0);
    }

    #[test]
    fn test_notifiers_called_in_registration_order() {
        let mut token = token_with(&[]);
        let first = Recorder::new(10, None);
        let second = Recorder::new(11, None);
        let h1 = token.add_movement_notifier(addr(OWNER), first.clone()).unwrap();
        let h2 = token.add_movement_notifier(addr(OWNER), second.clone()).unwrap();
        assert_eq!(
            token.movement_notifiers(),
            vec![(h1, addr(10)), (h2, addr(11))]
        );

        token.mint(addr(MINTER), addr(1), U256::ONE).unwrap();
        assert_eq!(first.seen.lock().len(), 1);
        assert_eq!(second.seen.lock().len(), 1);
    }

    #[test]
    fn test_registry_rejects_duplicates_and_outsiders() {
        let mut token = token_with(&[]);
        let recorder = Recorder::new(10, None);
        assert!(matches!(
            token.add_movement_notifier(addr(1), recorder.clone()),
            Err(OrgError::Unauthorized(_))
        ));
        token.add_movement_notifier(addr(OWNER), recorder.clone()).unwrap();
        assert_eq!(
            token.add_movement_notifier(addr(OWNER), recorder).unwrap_err(),
            OrgError::DuplicateNotifier(addr(10))
        );
    }

    #[test]
    fn test_handles_stay_stable_after_removal() {
        let mut token = token_with(&[]);
        let h1 = token.add_movement_notifier(addr(OWNER), Recorder::new(10, None)).unwrap();
        let h2 = token.add_movement_notifier(addr(OWNER), Recorder::new(11, None)).unwrap();
        let h3 = token.add_movement_notifier(addr(OWNER), Recorder::new(12, None)).unwrap();

        token.remove_movement_notifier(addr(OWNER), h1).unwrap();
        assert_eq!(token.movement_notifiers(), vec![(h2, addr(11)), (h3, addr(12))]);
        token.remove_movement_notifier(addr(OWNER), h3).unwrap();
        assert_eq!(token.movement_notifiers(), vec![(h2, addr(11))]);
        assert_eq!(
            token.remove_movement_notifier(addr(OWNER), h1),
            Err(OrgError::UnknownNotifier(h1.value()))
        );
    }

    #[test]
    fn test_veto_leaves_ledger_untouched() {
        let mut token = token_with(&[1, 2]);
        token.mint(addr(MINTER), addr(1), U256::from(10u64)).unwrap();
        let observer = Recorder::new(10, None);
        let blocker = Recorder::new(11, Some(addr(1)));
        token.add_movement_notifier(addr(OWNER), observer.clone()).unwrap();
        token.add_movement_notifier(addr(OWNER), blocker).unwrap();

        let err = token.transfer(addr(1), addr(2), U256::from(3u64)).unwrap_err();
        assert_eq!(
            err,
            OrgError::NotifierRejected {
                notifier: addr(11),
                reason: "blocked".into()
            }
        );
        assert_eq!(token.balance_of(&addr(1)), U256::from(10u64));
        assert_eq!(token.balance_of(&addr(2)), U256::ZERO);
        assert!(observer.seen.lock().is_empty());
    }

    #[test]
    fn test_snapshot_restore() {
        let mut token = token_with(&[1, 2]);
        token.mint(addr(MINTER), addr(1), U256::from(10u64)).unwrap();
        token.transfer(addr(1), addr(2), U256::from(4u64)).unwrap();
        token.approve(addr(2), addr(MINTER), U256::from(2u64)).unwrap();

        let snapshot = token.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: TokenSnapshot = serde_json::from_str(&json).unwrap();
        let restored = GovernanceToken::restore(decoded, token.whitelist.clone()).unwrap();

        assert_eq!(restored.balance_of(&addr(1)), U256::from(6u64));
        assert_eq!(restored.allowance(&addr(2), &addr(MINTER)), U256::from(2u64));
        assert_eq!(restored.total_supply(), U256::from(10u64));
        assert!(restored.movement_notifiers().is_empty());
    }

    #[test]
    fn test_restore_rejects_supply_mismatch() {
        let mut token = token_with(&[]);
        token.mint(addr(MINTER), addr(1), U256::from(10u64)).unwrap();
        let mut snapshot = token.snapshot();
        snapshot.total_supply = U256::from(11u64);
        assert!(matches!(
            GovernanceToken::restore(snapshot, token.whitelist.clone()),
            Err(OrgError::Snapshot(_))
        ));
    }
}
