//! Round lifecycle and vote reconciliation.
//!
//! Lock order: token, then voting state, then asset. The token ledger
//! calls [`VoteReconciler`] while holding its own write lock, so the
//! manager never waits on the token; it uses `try_read` and reports
//! [`VotingError::Reentrancy`] instead. Callers must not hold the asset
//! lock across a token movement.

use crate::error::VotingError;
use crate::rounds::{Proposal, ProposalSpec, Round, RoundInfo, Vote};
use crate::voting_escrow_account;
use mogul_org::curve;
use mogul_org::{
    Clock, Movement, MovementKind, MovementNotifier, NotifierHandle, Organisation, SharedAsset,
    SharedToken, StableAsset,
};
use mogul_types::{Address, Timestamp, U256};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

type Result<T> = std::result::Result<T, VotingError>;

#[derive(Debug)]
struct VotingState {
    admin: Address,
    escrow: Address,
    ledger: Address,
    vote_weight_multiplier: u64,
    rounds: Vec<Round>,
    /// Index of the first round that is neither finalized nor cancelled.
    current_round: u64,
    /// End time of the most recently created round.
    last_voting_date: Timestamp,
}

impl VotingState {
    fn require_admin(&self, caller: &Address) -> Result<()> {
        if *caller != self.admin {
            return Err(VotingError::Unauthorized(format!("{} is not the voting admin", caller)));
        }
        Ok(())
    }

    fn current_mut(&mut self) -> Option<&mut Round> {
        self.rounds.get_mut(self.current_round as usize)
    }

    fn round(&self, id: u64) -> Result<&Round> {
        self.rounds.get(id as usize).ok_or(VotingError::RoundNotFound(id))
    }

    fn no_current_round(&self) -> VotingError {
        match self.rounds.last() {
            Some(last) if last.is_finalized() => VotingError::AlreadyFinalized(last.id()),
            _ => VotingError::InvalidState("no round awaiting settlement".into()),
        }
    }
}

/// Outcome of [`VotingManager::finalize_round`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeReceipt {
    pub round: u64,
    pub winner: usize,
    pub receiver: Address,
    pub paid: U256,
    pub refunded: U256,
}

/// Outcome of [`VotingManager::cancel_round`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReceipt {
    pub round: u64,
    pub refunded: U256,
}

/// Runs funding rounds against an organisation's token and stable asset.
pub struct VotingManager {
    state: Arc<RwLock<VotingState>>,
    token: SharedToken,
    asset: SharedAsset,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for VotingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("VotingManager")
            .field("admin", &state.admin)
            .field("escrow", &state.escrow)
            .field("rounds", &state.rounds.len())
            .field("current_round", &state.current_round)
            .finish()
    }
}

impl VotingManager {
    pub fn new(
        admin: Address,
        token: SharedToken,
        asset: SharedAsset,
        clock: Arc<dyn Clock>,
        vote_weight_multiplier: u64,
    ) -> Result<Self> {
        if vote_weight_multiplier == 0 {
            return Err(VotingError::InvalidInput("vote weight multiplier must be positive".into()));
        }
        let ledger = token.read().ledger();
        let state = VotingState {
            admin,
            escrow: voting_escrow_account(),
            ledger,
            vote_weight_multiplier,
            rounds: Vec::new(),
            current_round: 0,
            last_voting_date: 0,
        };
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            token,
            asset,
            clock,
        })
    }

    /// Manager sharing the organisation's token, asset and admin.
    pub fn for_organisation(org: &Organisation, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::new(
            org.admin(),
            org.token(),
            org.asset(),
            clock,
            org.config().vote_weight_multiplier,
        )
    }

    /// Notifier that keeps votes in step with token movements.
    pub fn reconciler(&self) -> Arc<VoteReconciler> {
        let (escrow, ledger) = {
            let state = self.state.read();
            (state.escrow, state.ledger)
        };
        Arc::new(VoteReconciler {
            escrow,
            ledger,
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        })
    }

    /// Register the reconciler on the token ledger. `caller` must own the token.
    pub fn register(&self, caller: Address) -> Result<NotifierHandle> {
        let notifier = self.reconciler();
        let handle = self.token.write().add_movement_notifier(caller, notifier)?;
        Ok(handle)
    }

    pub fn admin(&self) -> Address {
        self.state.read().admin
    }

    pub fn escrow(&self) -> Address {
        self.state.read().escrow
    }

    pub fn set_admin(&self, caller: Address, admin: Address) -> Result<()> {
        let mut state = self.state.write();
        state.require_admin(&caller)?;
        info!(old = %state.admin, new = %admin, "Voting admin changed");
        state.admin = admin;
        Ok(())
    }

    /// Schedule a round and escrow the largest requested amount from the admin.
    pub fn create_round(
        &self,
        caller: Address,
        proposals: Vec<ProposalSpec>,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Result<u64> {
        let mut state = self.state.write();
        state.require_admin(&caller)?;

        let now = self.clock.now();
        if start_time <= now {
            return Err(VotingError::InvalidInput(format!(
                "start time {} is not in the future (now {})",
                start_time, now
            )));
        }
        if start_time < state.last_voting_date {
            return Err(VotingError::InvalidInput(format!(
                "start time {} overlaps the previous round ending {}",
                start_time, state.last_voting_date
            )));
        }

        let id = state.rounds.len() as u64;
        let round = Round::new(id, proposals, start_time, end_time)?;
        let reserved = round.reserved_funds();

        {
            let mut asset = self.asset.write();
            let allowance = asset.allowance(&caller, &state.escrow);
            if allowance < reserved {
                return Err(VotingError::InsufficientAllowance {
                    required: reserved,
                    available: allowance,
                });
            }
            let balance = asset.balance_of(&caller);
            if balance < reserved {
                return Err(VotingError::InsufficientBalance {
                    required: reserved,
                    available: balance,
                });
            }
            if !reserved.is_zero() {
                asset.transfer_from(state.escrow, caller, state.escrow, reserved)?;
            }
        }

        info!(
            round = id,
            start = start_time,
            end = end_time,
            proposals = round.proposals().len(),
            reserved = %reserved,
            "Round created"
        );
        state.last_voting_date = end_time;
        state.rounds.push(round);
        Ok(id)
    }

    /// Column-wise variant of [`create_round`](Self::create_round).
    ///
    /// All four columns must have the same length.
    #[allow(clippy::too_many_arguments)]
    pub fn create_round_from_columns(
        &self,
        caller: Address,
        names: Vec<String>,
        descriptions: Vec<String>,
        receivers: Vec<Address>,
        amounts: Vec<U256>,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Result<u64> {
        let len = names.len();
        if descriptions.len() != len || receivers.len() != len || amounts.len() != len {
            return Err(VotingError::InvalidInput(format!(
                "proposal columns differ in length: {} names, {} descriptions, {} receivers, {} amounts",
                len,
                descriptions.len(),
                receivers.len(),
                amounts.len()
            )));
        }
        let proposals = names
            .into_iter()
            .zip(descriptions)
            .zip(receivers)
            .zip(amounts)
            .map(|(((name, description), receiver), requested_amount)| ProposalSpec {
                name,
                description,
                receiver,
                requested_amount,
            })
            .collect();
        self.create_round(caller, proposals, start_time, end_time)
    }

    /// Vote in the current round with weight `isqrt(balance * multiplier)`.
    pub fn vote(&self, voter: Address, proposal_index: usize) -> Result<Vote> {
        let mut state = self.state.write();
        let multiplier = state.vote_weight_multiplier;
        let now = self.clock.now();

        let round_id = state.current_round;
        let round = state
            .current_mut()
            .ok_or_else(|| VotingError::InvalidState("no round scheduled".into()))?;
        if !round.is_open(now) {
            return Err(VotingError::VotingClosed(round_id));
        }
        if round.proposal(proposal_index).is_none() {
            return Err(VotingError::ProposalNotFound {
                round: round_id,
                index: proposal_index,
            });
        }

        let balance = self
            .token
            .try_read()
            .ok_or(VotingError::Reentrancy)?
            .balance_of(&voter);
        let weight = curve::vote_weight(&balance, multiplier)?;
        if weight.is_zero() {
            return Err(VotingError::InsufficientBalance {
                required: U256::ONE,
                available: balance,
            });
        }

        let vote = round.cast_vote(voter, proposal_index, weight)?;
        info!(
            round = round_id,
            voter = %voter,
            proposal = proposal_index,
            weight = %weight,
            "Vote cast"
        );
        Ok(vote)
    }

    /// Pay the winning proposal and refund the rest of the escrow to the admin.
    pub fn finalize_round(&self, caller: Address) -> Result<FinalizeReceipt> {
        let mut state = self.state.write();
        state.require_admin(&caller)?;

        let now = self.clock.now();
        let escrow = state.escrow;
        let admin = state.admin;
        let round_id = state.current_round;
        let no_round = state.no_current_round();
        let round = state.current_mut().ok_or(no_round)?;
        if now < round.end_time() {
            return Err(VotingError::VotingNotClosed(round_id));
        }

        let winner = round.leading_proposal();
        let (receiver, paid) = match round.proposal(winner) {
            Some(proposal) => (proposal.receiver, proposal.requested_amount),
            None => return Err(VotingError::ProposalNotFound { round: round_id, index: winner }),
        };
        let reserved = round.reserved_funds();
        let refunded = reserved.saturating_sub(&paid);

        {
            let mut asset = self.asset.write();
            let held = asset.balance_of(&escrow);
            if held < reserved {
                return Err(VotingError::InsufficientBalance {
                    required: reserved,
                    available: held,
                });
            }
            if !paid.is_zero() {
                asset.transfer(escrow, receiver, paid)?;
            }
            if !refunded.is_zero() {
                asset.transfer(escrow, admin, refunded)?;
            }
        }

        round.mark_finalized(winner);
        state.current_round += 1;
        info!(
            round = round_id,
            winner,
            receiver = %receiver,
            paid = %paid,
            refunded = %refunded,
            "Round finalized"
        );
        Ok(FinalizeReceipt {
            round: round_id,
            winner,
            receiver,
            paid,
            refunded,
        })
    }

    /// Cancel the current round before voting starts and refund its escrow.
    pub fn cancel_round(&self, caller: Address) -> Result<CancelReceipt> {
        let mut state = self.state.write();
        state.require_admin(&caller)?;

        let now = self.clock.now();
        let escrow = state.escrow;
        let admin = state.admin;
        let round_id = state.current_round;
        let round = state
            .current_mut()
            .ok_or_else(|| VotingError::InvalidState("no round to cancel".into()))?;
        if now >= round.start_time() {
            return Err(VotingError::InvalidState(format!(
                "round {} already started at {}",
                round_id,
                round.start_time()
            )));
        }

        let refunded = round.reserved_funds();
        if !refunded.is_zero() {
            let mut asset = self.asset.write();
            let held = asset.balance_of(&escrow);
            if held < refunded {
                return Err(VotingError::InsufficientBalance {
                    required: refunded,
                    available: held,
                });
            }
            asset.transfer(escrow, admin, refunded)?;
        }

        round.mark_cancelled();
        state.current_round += 1;
        info!(round = round_id, refunded = %refunded, "Round cancelled");
        Ok(CancelReceipt {
            round: round_id,
            refunded,
        })
    }

    pub fn round_info(&self, round: u64) -> Result<RoundInfo> {
        Ok(self.state.read().round(round)?.info())
    }

    pub fn proposal_info(&self, round: u64, index: usize) -> Result<Proposal> {
        let state = self.state.read();
        state
            .round(round)?
            .proposal(index)
            .cloned()
            .ok_or(VotingError::ProposalNotFound { round, index })
    }

    /// Active vote of `voter` in `round`, if any.
    pub fn vote_info(&self, round: u64, voter: &Address) -> Result<Option<Vote>> {
        Ok(self.state.read().round(round)?.vote_of(voter).copied())
    }

    /// Index of the round awaiting settlement. Equals [`round_count`](Self::round_count)
    /// when every round is settled.
    pub fn current_round(&self) -> u64 {
        self.state.read().current_round
    }

    pub fn last_voting_date(&self) -> Timestamp {
        self.state.read().last_voting_date
    }

    pub fn round_count(&self) -> u64 {
        self.state.read().rounds.len() as u64
    }

    pub fn snapshot(&self) -> VotingSnapshot {
        let state = self.state.read();
        VotingSnapshot {
            admin: state.admin,
            escrow: state.escrow,
            ledger: state.ledger,
            vote_weight_multiplier: state.vote_weight_multiplier,
            rounds: state.rounds.clone(),
            current_round: state.current_round,
            last_voting_date: state.last_voting_date,
        }
    }

    /// Rebuild a manager from a snapshot.
    ///
    /// The reconciler is not re-registered; call [`register`](Self::register)
    /// on the restored token.
    pub fn restore(
        snapshot: VotingSnapshot,
        token: SharedToken,
        asset: SharedAsset,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        snapshot.validate()?;

        let ledger = token.read().ledger();
        if ledger != snapshot.ledger {
            return Err(VotingError::Snapshot(format!(
                "snapshot tracks ledger {} but token is {}",
                snapshot.ledger, ledger
            )));
        }

        let outstanding = snapshot
            .rounds
            .iter()
            .filter(|round| !round.is_settled())
            .try_fold(U256::ZERO, |acc, round| acc.checked_add(&round.reserved_funds()))
            .ok_or_else(|| VotingError::Snapshot("escrow total overflows".into()))?;
        let held = asset.read().balance_of(&snapshot.escrow);
        if held < outstanding {
            return Err(VotingError::Snapshot(format!(
                "escrow holds {} but open rounds reserve {}",
                held, outstanding
            )));
        }

        let state = VotingState {
            admin: snapshot.admin,
            escrow: snapshot.escrow,
            ledger: snapshot.ledger,
            vote_weight_multiplier: snapshot.vote_weight_multiplier,
            rounds: snapshot.rounds,
            current_round: snapshot.current_round,
            last_voting_date: snapshot.last_voting_date,
        };
        debug!(rounds = state.rounds.len(), current = state.current_round, "Voting state restored");
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            token,
            asset,
            clock,
        })
    }
}

/// Serializable voting state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingSnapshot {
    pub admin: Address,
    pub escrow: Address,
    pub ledger: Address,
    pub vote_weight_multiplier: u64,
    pub rounds: Vec<Round>,
    pub current_round: u64,
    pub last_voting_date: Timestamp,
}

impl VotingSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| VotingError::Snapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| VotingError::Snapshot(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.vote_weight_multiplier == 0 {
            return Err(VotingError::Snapshot("vote weight multiplier is zero".into()));
        }
        if self.current_round > self.rounds.len() as u64 {
            return Err(VotingError::Snapshot(format!(
                "current round {} beyond {} rounds",
                self.current_round,
                self.rounds.len()
            )));
        }

        let mut previous_end: Timestamp = 0;
        for (index, round) in self.rounds.iter().enumerate() {
            round.check_consistency().map_err(VotingError::Snapshot)?;
            if round.id() != index as u64 {
                return Err(VotingError::Snapshot(format!("round at {} has id {}", index, round.id())));
            }
            if round.start_time() < previous_end {
                return Err(VotingError::Snapshot(format!("round {} overlaps its predecessor", index)));
            }
            previous_end = round.end_time();

            let settled_expected = (index as u64) < self.current_round;
            if round.is_settled() != settled_expected {
                return Err(VotingError::Snapshot(format!(
                    "round {} settlement does not match current round {}",
                    index, self.current_round
                )));
            }
        }
        if self.last_voting_date != previous_end {
            return Err(VotingError::Snapshot(format!(
                "last voting date {} but last round ends {}",
                self.last_voting_date, previous_end
            )));
        }
        Ok(())
    }
}

/// Token-movement observer owned by a [`VotingManager`].
///
/// A holder whose tokens leave their account during an open round loses
/// their active vote in that round. Movements from any other ledger are
/// vetoed.
pub struct VoteReconciler {
    escrow: Address,
    ledger: Address,
    state: Arc<RwLock<VotingState>>,
    clock: Arc<dyn Clock>,
}

impl MovementNotifier for VoteReconciler {
    fn id(&self) -> Address {
        self.escrow
    }

    fn check_movement(&self, movement: &Movement) -> std::result::Result<(), String> {
        if movement.ledger() != self.ledger {
            warn!(ledger = %movement.ledger(), expected = %self.ledger, "Movement from foreign ledger");
            return Err(format!(
                "voting tracks ledger {}, not {}",
                self.ledger,
                movement.ledger()
            ));
        }
        Ok(())
    }

    fn on_movement(&self, movement: &Movement) {
        if movement.ledger() != self.ledger
            || movement.kind() == MovementKind::Mint
            || movement.amount().is_zero()
        {
            return;
        }

        let now = self.clock.now();
        let mut state = self.state.write();
        let round_id = state.current_round;
        let Some(round) = state.current_mut() else {
            return;
        };
        if !round.is_open(now) {
            return;
        }
        if let Some(vote) = round.revoke(&movement.from()) {
            info!(
                round = round_id,
                voter = %vote.voter,
                proposal = vote.proposal_index,
                weight = %vote.weight,
                "Vote revoked after token movement"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(rounds: Vec<Round>, current_round: u64, last_voting_date: Timestamp) -> VotingSnapshot {
        VotingSnapshot {
            admin: Address::from_bytes([1u8; 20]),
            escrow: voting_escrow_account(),
            ledger: Address::for_account("token"),
            vote_weight_multiplier: 10,
            rounds,
            current_round,
            last_voting_date,
        }
    }

    fn spec() -> ProposalSpec {
        ProposalSpec {
            name: "Short film".into(),
            description: "Festival cut".into(),
            receiver: Address::from_bytes([7u8; 20]),
            requested_amount: U256::from_whole(10),
        }
    }

    #[test]
    fn test_empty_snapshot_valid() {
        assert!(snapshot_with(vec![], 0, 0).validate().is_ok());
    }

    #[test]
    fn test_snapshot_current_round_bounds() {
        let round = Round::new(0, vec![spec()], 10, 20).unwrap();
        assert!(snapshot_with(vec![round.clone()], 0, 20).validate().is_ok());
        assert!(snapshot_with(vec![round.clone()], 2, 20).validate().is_err());
        // Unsettled round behind the cursor.
        assert!(snapshot_with(vec![round], 1, 20).validate().is_err());
    }

    #[test]
    fn test_snapshot_rejects_overlap() {
        let first = Round::new(0, vec![spec()], 10, 20).unwrap();
        let second = Round::new(1, vec![spec()], 15, 30).unwrap();
        assert!(snapshot_with(vec![first, second], 0, 30).validate().is_err());
    }

    #[test]
    fn test_snapshot_rejects_stale_last_voting_date() {
        let round = Round::new(0, vec![spec()], 10, 20).unwrap();
        assert!(snapshot_with(vec![round], 0, 5).validate().is_err());
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let round = Round::new(0, vec![spec()], 10, 20).unwrap();
        let snapshot = snapshot_with(vec![round], 0, 20);
        let json = snapshot.to_json().unwrap();
        assert_eq!(VotingSnapshot::from_json(&json).unwrap(), snapshot);
    }
}
