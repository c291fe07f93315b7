//! Rounds, proposals and votes.
//!
//! A round owns its proposals and the votes cast on them. Ratings are kept
//! equal to the sum of the weights of the votes currently pointing at each
//! proposal; every mutation goes through [`Round::cast_vote`] or
//! [`Round::revoke`] so that the two never drift apart.

use crate::error::VotingError;
use mogul_org::CurveError;
use mogul_types::{Address, Timestamp, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Input for a new proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSpec {
    pub name: String,
    pub description: String,
    pub receiver: Address,
    pub requested_amount: U256,
}

/// A funding request competing in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub name: String,
    pub description: String,
    pub receiver: Address,
    pub requested_amount: U256,
    /// Sum of the weights of the active votes for this proposal.
    pub rating: U256,
}

impl From<ProposalSpec> for Proposal {
    fn from(spec: ProposalSpec) -> Self {
        Self {
            name: spec.name,
            description: spec.description,
            receiver: spec.receiver,
            requested_amount: spec.requested_amount,
            rating: U256::ZERO,
        }
    }
}

/// An active vote. A voter has at most one per round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: Address,
    pub round: u64,
    pub proposal_index: usize,
    pub weight: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// Scheduled, voting has not started.
    Pending,
    /// Inside `[start_time, end_time)`.
    Open,
    /// Voting period over, waiting for finalization.
    Ended,
    Finalized,
    Cancelled,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundStatus::Pending => "pending",
            RoundStatus::Open => "open",
            RoundStatus::Ended => "ended",
            RoundStatus::Finalized => "finalized",
            RoundStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Summary returned by round queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfo {
    pub id: u64,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub proposal_count: usize,
    pub reserved_funds: U256,
    pub vote_count: usize,
    pub finalized: bool,
    pub cancelled: bool,
    pub winner: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    id: u64,
    start_time: Timestamp,
    end_time: Timestamp,
    proposals: Vec<Proposal>,
    reserved_funds: U256,
    votes: BTreeMap<Address, Vote>,
    finalized: bool,
    cancelled: bool,
    winner: Option<usize>,
}

impl Round {
    /// Build a round. `reserved_funds` is the largest requested amount.
    ///
    /// Only structural checks happen here; timing against the clock and the
    /// previous round is the manager's job.
    pub fn new(
        id: u64,
        specs: Vec<ProposalSpec>,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Result<Self, VotingError> {
        if specs.is_empty() {
            return Err(VotingError::InvalidInput("round needs at least one proposal".into()));
        }
        if start_time >= end_time {
            return Err(VotingError::InvalidInput(format!(
                "start time {} must be before end time {}",
                start_time, end_time
            )));
        }
        let reserved_funds = specs
            .iter()
            .map(|spec| spec.requested_amount)
            .max()
            .unwrap_or(U256::ZERO);

        Ok(Self {
            id,
            start_time,
            end_time,
            proposals: specs.into_iter().map(Proposal::from).collect(),
            reserved_funds,
            votes: BTreeMap::new(),
            finalized: false,
            cancelled: false,
            winner: None,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn end_time(&self) -> Timestamp {
        self.end_time
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn proposal(&self, index: usize) -> Option<&Proposal> {
        self.proposals.get(index)
    }

    pub fn reserved_funds(&self) -> U256 {
        self.reserved_funds
    }

    pub fn vote_of(&self, voter: &Address) -> Option<&Vote> {
        self.votes.get(voter)
    }

    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn is_settled(&self) -> bool {
        self.finalized || self.cancelled
    }

    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    pub fn status(&self, now: Timestamp) -> RoundStatus {
        if self.finalized {
            RoundStatus::Finalized
        } else if self.cancelled {
            RoundStatus::Cancelled
        } else if now < self.start_time {
            RoundStatus::Pending
        } else if now < self.end_time {
            RoundStatus::Open
        } else {
            RoundStatus::Ended
        }
    }

    pub fn is_open(&self, now: Timestamp) -> bool {
        self.status(now) == RoundStatus::Open
    }

    pub fn info(&self) -> RoundInfo {
        RoundInfo {
            id: self.id,
            start_time: self.start_time,
            end_time: self.end_time,
            proposal_count: self.proposals.len(),
            reserved_funds: self.reserved_funds,
            vote_count: self.votes.len(),
            finalized: self.finalized,
            cancelled: self.cancelled,
            winner: self.winner,
        }
    }

    /// Record or refresh `voter`'s vote.
    ///
    /// Voting again for the same proposal replaces the old weight with the
    /// new one. Pointing at a different proposal is refused.
    pub(crate) fn cast_vote(
        &mut self,
        voter: Address,
        proposal_index: usize,
        weight: U256,
    ) -> Result<Vote, VotingError> {
        if proposal_index >= self.proposals.len() {
            return Err(VotingError::ProposalNotFound {
                round: self.id,
                index: proposal_index,
            });
        }

        let previous = match self.votes.get(&voter) {
            Some(existing) if existing.proposal_index != proposal_index => {
                return Err(VotingError::AlreadyVoted {
                    round: self.id,
                    proposal: existing.proposal_index,
                });
            }
            Some(existing) => existing.weight,
            None => U256::ZERO,
        };

        let proposal = &mut self.proposals[proposal_index];
        proposal.rating = proposal
            .rating
            .saturating_sub(&previous)
            .checked_add(&weight)
            .ok_or(CurveError::Overflow("rating"))?;

        let vote = Vote {
            voter,
            round: self.id,
            proposal_index,
            weight,
        };
        self.votes.insert(voter, vote);
        Ok(vote)
    }

    /// Drop `voter`'s vote and take its weight off the rating.
    pub(crate) fn revoke(&mut self, voter: &Address) -> Option<Vote> {
        let vote = self.votes.remove(voter)?;
        if let Some(proposal) = self.proposals.get_mut(vote.proposal_index) {
            proposal.rating = proposal.rating.saturating_sub(&vote.weight);
        }
        Some(vote)
    }

    /// Index of the highest-rated proposal. Ties go to the lowest index.
    pub fn leading_proposal(&self) -> usize {
        let mut best = 0;
        for (index, proposal) in self.proposals.iter().enumerate().skip(1) {
            if proposal.rating > self.proposals[best].rating {
                best = index;
            }
        }
        best
    }

    pub(crate) fn mark_finalized(&mut self, winner: usize) {
        self.finalized = true;
        self.winner = Some(winner);
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Structural consistency, used when loading a snapshot.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.proposals.is_empty() {
            return Err(format!("round {} has no proposals", self.id));
        }
        if self.start_time >= self.end_time {
            return Err(format!("round {} starts after it ends", self.id));
        }
        if self.finalized && self.cancelled {
            return Err(format!("round {} is both finalized and cancelled", self.id));
        }
        if self.finalized != self.winner.is_some() {
            return Err(format!("round {} winner does not match its finalized flag", self.id));
        }
        if let Some(winner) = self.winner {
            if winner >= self.proposals.len() {
                return Err(format!("round {} winner {} out of range", self.id, winner));
            }
        }

        let max_requested = self
            .proposals
            .iter()
            .map(|p| p.requested_amount)
            .max()
            .unwrap_or(U256::ZERO);
        if self.reserved_funds != max_requested {
            return Err(format!(
                "round {} reserves {} but largest request is {}",
                self.id, self.reserved_funds, max_requested
            ));
        }

        let mut tallies = vec![U256::ZERO; self.proposals.len()];
        for (voter, vote) in &self.votes {
            if vote.voter != *voter || vote.round != self.id {
                return Err(format!("round {} holds a misfiled vote for {}", self.id, voter));
            }
            let tally = tallies
                .get_mut(vote.proposal_index)
                .ok_or_else(|| format!("round {} vote for unknown proposal {}", self.id, vote.proposal_index))?;
            *tally = tally
                .checked_add(&vote.weight)
                .ok_or_else(|| format!("round {} rating overflow", self.id))?;
        }
        for (index, (proposal, tally)) in self.proposals.iter().zip(tallies).enumerate() {
            if proposal.rating != tally {
                return Err(format!(
                    "round {} proposal {} rated {} but votes sum to {}",
                    self.id, index, proposal.rating, tally
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(n: u64) -> ProposalSpec {
        ProposalSpec {
            name: format!("Movie {}", n),
            description: format!("Production budget #{}", n),
            receiver: Address::from_bytes([n as u8; 20]),
            requested_amount: U256::from_whole(n * 1_000_000),
        }
    }

    fn round() -> Round {
        Round::new(0, (1..=5).map(spec).collect(), 100, 200).unwrap()
    }

    fn voter(n: u8) -> Address {
        Address::from_bytes([0x40 + n; 20])
    }

    #[test]
    fn test_reserves_largest_request() {
        let round = round();
        assert_eq!(round.reserved_funds(), U256::from_whole(5_000_000));
        assert_eq!(round.proposals().len(), 5);
        assert!(round.proposals().iter().all(|p| p.rating.is_zero()));
    }

    #[test]
    fn test_rejects_bad_shape() {
        assert!(matches!(Round::new(0, vec![], 1, 2), Err(VotingError::InvalidInput(_))));
        assert!(matches!(Round::new(0, vec![spec(1)], 2, 2), Err(VotingError::InvalidInput(_))));
    }

    #[test]
    fn test_status_window() {
        let round = round();
        assert_eq!(round.status(99), RoundStatus::Pending);
        assert_eq!(round.status(100), RoundStatus::Open);
        assert_eq!(round.status(199), RoundStatus::Open);
        assert_eq!(round.status(200), RoundStatus::Ended);
    }

    #[test]
    fn test_revote_replaces_weight() {
        let mut round = round();
        round.cast_vote(voter(1), 2, U256::from(10u64)).unwrap();
        round.cast_vote(voter(1), 2, U256::from(10u64)).unwrap();
        assert_eq!(round.proposals()[2].rating, U256::from(10u64));

        round.cast_vote(voter(1), 2, U256::from(7u64)).unwrap();
        assert_eq!(round.proposals()[2].rating, U256::from(7u64));
        assert!(round.check_consistency().is_ok());
    }

    #[test]
    fn test_switching_proposal_refused() {
        let mut round = round();
        round.cast_vote(voter(1), 0, U256::from(3u64)).unwrap();
        let err = round.cast_vote(voter(1), 1, U256::from(3u64)).unwrap_err();
        assert_eq!(err, VotingError::AlreadyVoted { round: 0, proposal: 0 });
    }

    #[test]
    fn test_unknown_proposal() {
        let mut round = round();
        let err = round.cast_vote(voter(1), 5, U256::ONE).unwrap_err();
        assert_eq!(err, VotingError::ProposalNotFound { round: 0, index: 5 });
    }

    #[test]
    fn test_revoke_removes_weight() {
        let mut round = round();
        round.cast_vote(voter(1), 3, U256::from(4u64)).unwrap();
        round.cast_vote(voter(2), 3, U256::from(6u64)).unwrap();

        let revoked = round.revoke(&voter(1)).unwrap();
        assert_eq!(revoked.weight, U256::from(4u64));
        assert_eq!(round.proposals()[3].rating, U256::from(6u64));
        assert!(round.revoke(&voter(1)).is_none());
        assert!(round.check_consistency().is_ok());
    }

    #[test]
    fn test_leading_proposal_ties_go_low() {
        let mut round = round();
        assert_eq!(round.leading_proposal(), 0);

        round.cast_vote(voter(1), 3, U256::from(5u64)).unwrap();
        round.cast_vote(voter(2), 1, U256::from(5u64)).unwrap();
        assert_eq!(round.leading_proposal(), 1);

        round.cast_vote(voter(3), 4, U256::from(6u64)).unwrap();
        assert_eq!(round.leading_proposal(), 4);
    }

    #[test]
    fn test_consistency_detects_rating_drift() {
        let mut round = round();
        round.cast_vote(voter(1), 0, U256::from(5u64)).unwrap();
        round.proposals[0].rating = U256::from(6u64);
        assert!(round.check_consistency().is_err());
    }

    #[test]
    fn test_status_after_settlement() {
        let mut round = round();
        round.mark_cancelled();
        assert_eq!(round.status(150), RoundStatus::Cancelled);
        assert!(!round.is_open(150));

        let mut other = Round::new(1, vec![spec(1)], 10, 20).unwrap();
        other.mark_finalized(0);
        assert_eq!(other.status(15), RoundStatus::Finalized);
        assert_eq!(other.info().winner, Some(0));
    }
}
